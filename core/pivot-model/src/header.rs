//! FILENAME: core/pivot-model/src/header.rs
//! Header slots and the header builder.
//!
//! A header slot is one row or one column of the pivoted view. It is either
//! `Complete` (every component known, so it addresses stored data) or
//! `Incomplete` (some component unknown or rejected). An incomplete slot
//! carries the raw cell values typed against it, keyed by the stable id of
//! the slot on the other axis, so deleting headers never requires
//! re-indexing anything.
//!
//! The header builder derives the ordered header lists for one axis from the
//! stored keys, the frozen filter and the catalog's placeholder values.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use smallvec::smallvec;

use crate::catalog::IndexCatalog;
use crate::projector::KeyProjector;
use crate::value::{compare_partial, complete_key, to_parts, CellValue, IndexValue, Key, PartialKey};

// ============================================================================
// SLOTS
// ============================================================================

/// Stable identity of a header slot for as long as it exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u64);

/// Hands out slot ids. Never reuses one within an engine.
#[derive(Debug, Clone, Default)]
pub struct SlotIds {
    next: u64,
}

impl SlotIds {
    pub fn allocate(&mut self) -> SlotId {
        let id = SlotId(self.next);
        self.next += 1;
        id
    }
}

/// State of a header that is not (yet) a complete key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingHeader {
    /// Components as entered; `None` is unknown. All-`Some` parts can still
    /// be incomplete when a component failed type validation or the key
    /// duplicates another header.
    pub parts: PartialKey,

    /// The complete key this slot had before a rejected rename. Stored
    /// values stay under it until the slot is completed again.
    pub origin: Option<Key>,

    /// Raw cell values typed against this slot, by the other axis' slot.
    pub cells: FxHashMap<SlotId, CellValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SlotState {
    Complete(Key),
    Incomplete(PendingHeader),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderSlot {
    id: SlotId,
    pub state: SlotState,
}

impl HeaderSlot {
    pub fn complete(id: SlotId, key: Key) -> Self {
        HeaderSlot {
            id,
            state: SlotState::Complete(key),
        }
    }

    pub fn incomplete(id: SlotId, parts: PartialKey) -> Self {
        HeaderSlot {
            id,
            state: SlotState::Incomplete(PendingHeader {
                parts,
                ..Default::default()
            }),
        }
    }

    /// Complete if no part is unknown.
    pub fn from_parts(id: SlotId, parts: PartialKey) -> Self {
        match complete_key(&parts) {
            Some(key) => HeaderSlot::complete(id, key),
            None => HeaderSlot::incomplete(id, parts),
        }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.state, SlotState::Complete(_))
    }

    pub fn key(&self) -> Option<&Key> {
        match &self.state {
            SlotState::Complete(key) => Some(key),
            SlotState::Incomplete(_) => None,
        }
    }

    /// Header components as displayed.
    pub fn parts(&self) -> PartialKey {
        match &self.state {
            SlotState::Complete(key) => to_parts(key),
            SlotState::Incomplete(pending) => pending.parts.clone(),
        }
    }

    pub fn pending(&self) -> Option<&PendingHeader> {
        match &self.state {
            SlotState::Incomplete(pending) => Some(pending),
            SlotState::Complete(_) => None,
        }
    }

    pub fn pending_mut(&mut self) -> Option<&mut PendingHeader> {
        match &mut self.state {
            SlotState::Incomplete(pending) => Some(pending),
            SlotState::Complete(_) => None,
        }
    }
}

// ============================================================================
// HEADER BUILDER
// ============================================================================

/// Computes the ordered header list of one axis.
///
/// Output order: complete headers sorted by value, then incomplete headers
/// sorted with unknown components last.
pub struct HeaderBuilder<'a> {
    catalog: &'a IndexCatalog,
    frozen: KeyProjector,
    frozen_value: &'a [IndexValue],
}

impl<'a> HeaderBuilder<'a> {
    pub fn new(catalog: &'a IndexCatalog, frozen: &[usize], frozen_value: &'a [IndexValue]) -> Self {
        HeaderBuilder {
            catalog,
            frozen: KeyProjector::new(frozen.iter().copied()),
            frozen_value,
        }
    }

    /// True when the stored `key` passes the frozen filter.
    pub fn accepts(&self, key: &[IndexValue]) -> bool {
        self.frozen.matches(key, self.frozen_value)
    }

    pub fn build<'k>(&self, dims: &[usize], keys: impl IntoIterator<Item = &'k Key>) -> Vec<PartialKey> {
        if dims.is_empty() {
            return vec![PartialKey::new()];
        }
        let axis = KeyProjector::new(dims.iter().copied());
        let mut complete: BTreeSet<Key> = keys
            .into_iter()
            .filter(|key| self.accepts(key))
            .map(|key| axis.project(key))
            .collect();

        let mut ghosts = self.ghosts(dims);
        ghosts.sort_by(|a, b| specified(b).cmp(&specified(a)).then_with(|| compare_partial(a, b)));
        ghosts.dedup();

        let mut incomplete: Vec<PartialKey> = Vec::new();
        for ghost in ghosts {
            if let Some(key) = complete_key(&ghost) {
                complete.insert(key);
                continue;
            }
            let covered = complete.iter().any(|key| covers_key(key, &ghost))
                || incomplete.iter().any(|parts| covers(parts, &ghost));
            if !covered {
                incomplete.push(ghost);
            }
        }
        incomplete.sort_by(|a, b| compare_partial(a, b));

        complete
            .iter()
            .map(|key| to_parts(key))
            .chain(incomplete)
            .collect()
    }

    /// Placeholder headers implied by the catalog.
    fn ghosts(&self, dims: &[usize]) -> Vec<PartialKey> {
        let frozen = self.frozen.positions();
        let mut ghosts = Vec::new();
        let mut governed: BTreeSet<usize> = BTreeSet::new();

        for tuple in self.catalog.tuples() {
            if !tuple.touches(dims) || !tuple.within(dims, frozen) {
                continue;
            }
            governed.extend(tuple.dimensions.iter().copied());
            'combinations: for combination in &tuple.combinations {
                let mut parts: PartialKey = smallvec![None; dims.len()];
                for (value, d) in combination.iter().zip(&tuple.dimensions) {
                    if let Some(i) = frozen.iter().position(|f| f == d) {
                        if self.frozen_value[i] != *value {
                            continue 'combinations;
                        }
                    } else if let Some(i) = dims.iter().position(|a| a == d) {
                        parts[i] = Some(value.clone());
                    }
                }
                ghosts.push(parts);
            }
        }

        for (i, &d) in dims.iter().enumerate() {
            if governed.contains(&d) {
                continue;
            }
            for value in self.catalog.values(d) {
                let mut parts: PartialKey = smallvec![None; dims.len()];
                parts[i] = Some(value.clone());
                ghosts.push(parts);
            }
        }
        ghosts
    }
}

fn specified(parts: &[Option<IndexValue>]) -> usize {
    parts.iter().filter(|p| p.is_some()).count()
}

fn covers_key(key: &[IndexValue], ghost: &[Option<IndexValue>]) -> bool {
    key.iter()
        .zip(ghost)
        .all(|(k, g)| g.as_ref().map_or(true, |g| g == k))
}

/// True when `header` agrees with every specified component of `ghost`.
fn covers(header: &[Option<IndexValue>], ghost: &[Option<IndexValue>]) -> bool {
    header
        .iter()
        .zip(ghost)
        .all(|(h, g)| g.is_none() || h == g)
}
