//! FILENAME: core/pivot-model/src/index_ops.rs
//! Header mutations: renaming/growing headers, deleting rows and columns,
//! and cascading deletes of index values.
//!
//! A header only addresses stored data once it is complete. Until then the
//! values typed against it are stashed in the slot and moved into the store
//! the moment it completes. Renaming a complete header moves its stored
//! values to the new composite keys.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info};
use rustc_hash::FxHashMap;
use smallvec::smallvec;

use crate::definition::Axis;
use crate::engine::{dimension_index, PivotEngine, LOG_TARGET};
use crate::error::PivotError;
use crate::header::{HeaderSlot, PendingHeader, SlotId, SlotState};
use crate::projector::KeyProjector;
use crate::value::{CellValue, IndexValue, Key, PartialKey};

/// Why a header edit did not produce a complete header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Some component is unknown.
    Incomplete,
    /// A component does not fit its dimension's type.
    TypeMismatch { dimension: String },
    /// Another header on the same axis already has this key.
    Duplicate,
}

/// Outcome of `edit_index`, per position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexEditReport {
    pub accepted: Vec<usize>,
    pub unchanged: Vec<usize>,
    pub rejected: Vec<(usize, Rejection)>,
}

impl PivotEngine {
    // ========================================================================
    // EDIT INDEX
    // ========================================================================

    /// Sets the header at each position to the matching key. Positions past
    /// the end grow the axis with new incomplete headers first. A position
    /// must be below the current length plus the number of keys.
    ///
    /// A key that is incomplete, mistyped or duplicates another complete
    /// header leaves the slot incomplete with the entered parts; this is not
    /// an error.
    pub fn edit_index(
        &mut self,
        new_keys: Vec<PartialKey>,
        positions: &[usize],
        axis: Axis,
    ) -> Result<IndexEditReport, PivotError> {
        if new_keys.len() != positions.len() {
            return Err(PivotError::EditLengthMismatch {
                keys: new_keys.len(),
                positions: positions.len(),
            });
        }
        let dims = self.layout.axis(axis).to_vec();
        if let Some(key) = new_keys.iter().find(|k| k.len() != dims.len()) {
            return Err(PivotError::HeaderKeyLength {
                expected: dims.len(),
                actual: key.len(),
            });
        }
        // The axis grows by at most one slot per key.
        let len = self.slots(axis).len();
        let limit = len.saturating_add(new_keys.len());
        if let Some(&position) = positions.iter().find(|&&p| p >= limit) {
            return Err(PivotError::OutOfRange { axis, position, len });
        }

        let mut report = IndexEditReport::default();
        for (parts, &position) in new_keys.into_iter().zip(positions) {
            self.grow_axis(axis, position + 1);
            if self.slots(axis)[position].parts() == parts {
                report.unchanged.push(position);
                continue;
            }
            match self.validate_header(axis, position, &dims, &parts) {
                Ok(key) => {
                    if self.slots(axis)[position].key() == Some(&key) {
                        report.unchanged.push(position);
                        continue;
                    }
                    self.complete_slot(axis, position, key.clone());
                    self.register_header(&dims, &key);
                    report.accepted.push(position);
                }
                Err(rejection) => {
                    debug!(
                        target: LOG_TARGET,
                        "edit_index: {} {} rejected: {:?}", axis, position, rejection
                    );
                    self.park_slot(axis, position, parts);
                    report.rejected.push((position, rejection));
                }
            }
        }
        Ok(report)
    }

    fn grow_axis(&mut self, axis: Axis, len: usize) {
        let width = self.layout.axis(axis).len();
        while self.slots(axis).len() < len {
            let id = self.slot_ids.allocate();
            self.slots_mut(axis)
                .push(HeaderSlot::from_parts(id, smallvec![None; width]));
        }
    }

    fn validate_header(
        &self,
        axis: Axis,
        position: usize,
        dims: &[usize],
        parts: &[Option<IndexValue>],
    ) -> Result<Key, Rejection> {
        let mut key = Key::new();
        for (part, &d) in parts.iter().zip(dims) {
            let value = part.as_ref().ok_or(Rejection::Incomplete)?;
            let dimension = &self.dimensions[d];
            let value = dimension.kind.coerce(value).ok_or_else(|| Rejection::TypeMismatch {
                dimension: dimension.name.clone(),
            })?;
            key.push(value);
        }
        let duplicate = self.slots(axis).iter().enumerate().any(|(i, slot)| {
            i != position
                && match &slot.state {
                    SlotState::Complete(other) => *other == key,
                    SlotState::Incomplete(pending) => pending.origin.as_ref() == Some(&key),
                }
        });
        if duplicate {
            return Err(Rejection::Duplicate);
        }
        Ok(key)
    }

    /// Coerces all-known parts into a key, if every part fits its type.
    fn coerce_parts(&self, dims: &[usize], parts: &[Option<IndexValue>]) -> Option<Key> {
        parts
            .iter()
            .zip(dims)
            .map(|(part, &d)| part.as_ref().and_then(|v| self.dimensions[d].kind.coerce(v)))
            .collect()
    }

    /// Makes the slot complete under `key`, moving its stored values and
    /// stashed cells along.
    fn complete_slot(&mut self, axis: Axis, position: usize, key: Key) {
        let slot = &mut self.slots_mut(axis)[position];
        match std::mem::replace(&mut slot.state, SlotState::Complete(key.clone())) {
            SlotState::Complete(old) => self.migrate_line(axis, &old, &key),
            SlotState::Incomplete(pending) => {
                if let Some(origin) = &pending.origin {
                    self.migrate_line(axis, origin, &key);
                }
                self.release_pending(axis, position, pending.cells);
            }
        }
    }

    /// Turns the slot incomplete with the entered parts. A complete slot
    /// remembers its key so its stored values can follow a later rename.
    fn park_slot(&mut self, axis: Axis, position: usize, parts: PartialKey) {
        let slot = &mut self.slots_mut(axis)[position];
        let placeholder = SlotState::Incomplete(PendingHeader::default());
        let (pending, was_complete) = match std::mem::replace(&mut slot.state, placeholder) {
            SlotState::Complete(key) => (
                PendingHeader {
                    parts,
                    origin: Some(key),
                    cells: FxHashMap::default(),
                },
                true,
            ),
            SlotState::Incomplete(pending) => (PendingHeader { parts, ..pending }, false),
        };
        slot.state = SlotState::Incomplete(pending);
        if was_complete && axis == Axis::Row {
            self.adopt_pending(position);
        }
    }

    /// A row that turned incomplete takes over the cells it had stashed in
    /// incomplete columns.
    fn adopt_pending(&mut self, row: usize) {
        let row_id = self.rows[row].id();
        let mut adopted: Vec<(SlotId, CellValue)> = Vec::new();
        for column in self.columns.iter_mut() {
            let column_id = column.id();
            if let Some(value) = column.pending_mut().and_then(|p| p.cells.remove(&row_id)) {
                adopted.push((column_id, value));
            }
        }
        if let Some(pending) = self.rows[row].pending_mut() {
            pending.cells.extend(adopted);
        }
    }

    /// Moves cells stashed in a slot that just completed: into the store
    /// where the other header is complete, otherwise to the other slot.
    fn release_pending(&mut self, axis: Axis, position: usize, cells: FxHashMap<SlotId, CellValue>) {
        let this = &self.slots(axis)[position];
        let this_id = this.id();
        let Some(this_key) = this.key().cloned() else {
            return;
        };
        let other_axis = axis.other();
        for (other_id, value) in cells {
            let Some(index) = self.slot_index(other_axis, other_id) else {
                continue;
            };
            match self.slots(other_axis)[index].key().cloned() {
                Some(other_key) => {
                    let key = self.cell_key(axis, &this_key, &other_key);
                    self.store_cell(key, value);
                }
                None => {
                    if let Some(pending) = self.slots_mut(other_axis)[index].pending_mut() {
                        pending.cells.insert(this_id, value);
                    }
                }
            }
        }
    }

    /// Keys that address stored values along `axis`: complete headers and
    /// the origins of parked ones.
    fn stored_keys(&self, axis: Axis) -> BTreeSet<Key> {
        self.slots(axis)
            .iter()
            .filter_map(|slot| match &slot.state {
                SlotState::Complete(key) => Some(key.clone()),
                SlotState::Incomplete(pending) => pending.origin.clone(),
            })
            .collect()
    }

    /// Moves stored values from header `old` to header `new` across every
    /// header of the other axis that addresses stored values.
    fn migrate_line(&mut self, axis: Axis, old: &Key, new: &Key) {
        if old == new {
            return;
        }
        for other in self.stored_keys(axis.other()) {
            let from = self.cell_key(axis, old, &other);
            if let Some(value) = self.data.get(&from).cloned() {
                let to = self.cell_key(axis, new, &other);
                self.delete_value(&from);
                self.write_value(to, value);
            }
        }
    }

    /// Deletes stored values of header `key` across the other axis.
    fn clear_line(&mut self, axis: Axis, key: &Key) {
        for other in self.stored_keys(axis.other()) {
            let cell = self.cell_key(axis, key, &other);
            if self.data.contains_key(&cell) {
                self.delete_value(&cell);
            }
        }
    }

    /// Adds the components of a new complete header to the catalog,
    /// including tracked tuples that lie within this axis plus the frozen
    /// dimensions.
    fn register_header(&mut self, dims: &[usize], key: &Key) {
        for (&d, value) in dims.iter().zip(key) {
            self.catalog.insert_value(d, value);
        }
        let frozen = &self.layout.frozen;
        let frozen_value = &self.layout.frozen_value;
        let combinations: Vec<(usize, Key)> = self
            .catalog
            .tuples()
            .iter()
            .enumerate()
            .filter(|(_, tuple)| tuple.touches(dims) && tuple.within(dims, frozen))
            .map(|(index, tuple)| {
                let combination = tuple
                    .dimensions
                    .iter()
                    .map(|d| match dims.iter().position(|a| a == d) {
                        Some(i) => key[i].clone(),
                        None => {
                            let i = frozen.iter().position(|f| f == d).unwrap_or_default();
                            frozen_value[i].clone()
                        }
                    })
                    .collect();
                (index, combination)
            })
            .collect();
        for (index, combination) in combinations {
            self.catalog.insert_combination(index, combination);
        }
    }

    // ========================================================================
    // DELETE ROWS / COLUMNS
    // ========================================================================

    /// Removes headers at the given positions along one axis.
    ///
    /// The stored values of a removed complete header (or of the origin of
    /// a parked one) are deleted, unless another incomplete header on the
    /// same axis carries the same key. That header then completes: a fresh
    /// one keeps the removed header's values, a parked one moves its own
    /// values in and the removed header's values are deleted.
    pub fn delete_row_col(&mut self, positions: &[usize], axis: Axis) -> Result<(), PivotError> {
        for &position in positions {
            self.check_position(axis, position)?;
        }
        let mut positions = positions.to_vec();
        positions.sort_unstable();
        positions.dedup();

        let dims = self.layout.axis(axis).to_vec();
        for &position in positions.iter().rev() {
            let slot = self.slots_mut(axis).remove(position);
            self.forget_slot(axis.other(), slot.id());
            // A parked slot still owns the values under its origin.
            let key = match slot.state {
                SlotState::Complete(key) => key,
                SlotState::Incomplete(PendingHeader { origin: Some(key), .. }) => key,
                SlotState::Incomplete(_) => continue,
            };
            let heir = self.slots(axis).iter().position(|other| {
                other
                    .pending()
                    .and_then(|p| self.coerce_parts(&dims, &p.parts))
                    .as_ref()
                    == Some(&key)
            });
            match heir {
                // A parked heir brings its own values along; the removed
                // header's values go.
                Some(heir) if self.slots(axis)[heir].pending().is_some_and(|p| p.origin.is_some()) => {
                    self.clear_line(axis, &key);
                    self.complete_slot(axis, heir, key);
                }
                Some(heir) => self.complete_slot(axis, heir, key),
                None => self.clear_line(axis, &key),
            }
        }
        info!(target: LOG_TARGET, "deleted {} {} headers", positions.len(), axis);
        Ok(())
    }

    /// Drops cells stashed against a slot that no longer exists.
    fn forget_slot(&mut self, axis: Axis, id: SlotId) {
        for slot in self.slots_mut(axis).iter_mut() {
            if let Some(pending) = slot.pending_mut() {
                pending.cells.remove(&id);
            }
        }
    }

    fn remove_slots_where(&mut self, axis: Axis, remove: impl Fn(&HeaderSlot) -> bool) -> usize {
        let doomed: Vec<SlotId> = self
            .slots(axis)
            .iter()
            .filter(|slot| remove(slot))
            .map(HeaderSlot::id)
            .collect();
        self.slots_mut(axis).retain(|slot| !doomed.contains(&slot.id()));
        for &id in &doomed {
            self.forget_slot(axis.other(), id);
        }
        doomed.len()
    }

    // ========================================================================
    // DELETE INDEX VALUES
    // ========================================================================

    /// Removes values from dimensions, cascading to the catalog (single and
    /// joint), the store and the headers of both axes.
    ///
    /// Stored values go without journal entries: the backing store removes
    /// them along with the index values.
    pub fn delete_index_values(
        &mut self,
        values: &BTreeMap<String, BTreeSet<IndexValue>>,
    ) -> Result<(), PivotError> {
        let mut doomed: Vec<(usize, BTreeSet<IndexValue>)> = Vec::with_capacity(values.len());
        for (name, set) in values {
            let d = dimension_index(&self.dimensions, name)?;
            let kind = self.dimensions[d].kind;
            doomed.push((d, set.iter().filter_map(|v| kind.coerce(v)).collect()));
        }

        let mut removed_values = 0;
        for (d, set) in &doomed {
            removed_values += self.catalog.remove_values(*d, set).len();
        }
        let hit = |key: &[IndexValue]| doomed.iter().any(|(d, set)| set.contains(&key[*d]));
        let before = self.data.len();
        self.data.retain(|key, _| !hit(key));
        self.journal.retain(|key| !hit(key));
        let removed_data = before - self.data.len();

        let mut removed_headers = 0;
        for axis in [Axis::Row, Axis::Column] {
            let dims = self.layout.axis(axis).to_vec();
            removed_headers += self.remove_slots_where(axis, |slot| {
                slot.parts().iter().zip(&dims).any(|(part, d)| {
                    part.as_ref()
                        .map_or(false, |v| doomed.iter().any(|(dd, set)| dd == d && set.contains(v)))
                })
            });
        }

        info!(
            target: LOG_TARGET,
            "delete_index_values: {} catalog values, {} stored values, {} headers removed",
            removed_values,
            removed_data,
            removed_headers
        );
        Ok(())
    }

    /// Removes joint combinations for tuples of dimensions, cascading to the
    /// tuple catalog, the store and the headers that spell out a removed
    /// combination (with frozen dimensions filled from the frozen value).
    pub fn delete_tuple_index_values(
        &mut self,
        values: &BTreeMap<Vec<String>, BTreeSet<Vec<IndexValue>>>,
    ) -> Result<(), PivotError> {
        let mut doomed: Vec<(Vec<usize>, BTreeSet<Key>)> = Vec::with_capacity(values.len());
        for (names, combinations) in values {
            let dims = names
                .iter()
                .map(|name| dimension_index(&self.dimensions, name))
                .collect::<Result<Vec<usize>, _>>()?;
            let mut set = BTreeSet::new();
            for combination in combinations {
                if combination.len() != dims.len() {
                    return Err(PivotError::KeyLength {
                        expected: dims.len(),
                        actual: combination.len(),
                    });
                }
                let key: Option<Key> = combination
                    .iter()
                    .zip(&dims)
                    .map(|(v, &d)| self.dimensions[d].kind.coerce(v))
                    .collect();
                set.extend(key);
            }
            doomed.push((dims, set));
        }

        let mut removed_headers = 0;
        for (dims, combinations) in &doomed {
            self.catalog.remove_combinations(dims, combinations);

            let projector = KeyProjector::new(dims.iter().copied());
            let hit = |key: &[IndexValue]| combinations.contains(&projector.project(key));
            self.data.retain(|key, _| !hit(key));
            self.journal.retain(|key| !hit(key));

            for axis in [Axis::Row, Axis::Column] {
                let axis_dims = self.layout.axis(axis).to_vec();
                let frozen = self.layout.frozen.clone();
                let frozen_value = self.layout.frozen_value.clone();
                if !dims.iter().any(|d| axis_dims.contains(d))
                    || !dims.iter().all(|d| axis_dims.contains(d) || frozen.contains(d))
                {
                    continue;
                }
                removed_headers += self.remove_slots_where(axis, |slot| {
                    let parts = slot.parts();
                    let combination: Option<Key> = dims
                        .iter()
                        .map(|d| match axis_dims.iter().position(|a| a == d) {
                            Some(i) => parts[i].clone(),
                            None => frozen
                                .iter()
                                .position(|f| f == d)
                                .map(|i| frozen_value[i].clone()),
                        })
                        .collect();
                    combination.map_or(false, |c| combinations.contains(&c))
                });
            }
        }

        info!(
            target: LOG_TARGET,
            "delete_tuple_index_values: {} tuples, {} headers removed",
            doomed.len(),
            removed_headers
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{Dimension, JointValueSet, PivotAssignment, ResetInput};
    use crate::value::DimensionType;

    fn text(s: &str) -> CellValue {
        CellValue::text(s)
    }

    fn t(s: &str) -> IndexValue {
        IndexValue::from(s)
    }

    fn parts(values: &[Option<&str>]) -> PartialKey {
        values.iter().map(|v| v.map(t)).collect()
    }

    fn key(values: &[&str]) -> Key {
        values.iter().map(|s| t(s)).collect()
    }

    fn create_test_engine() -> PivotEngine {
        let dims = vec![
            Dimension::new("class", DimensionType::Text),
            Dimension::new("object", DimensionType::Text),
            Dimension::new("parameter", DimensionType::Text),
        ];
        let data = vec![
            vec![text("a"), text("a1"), text("p1"), CellValue::Integer(10)],
            vec![text("a"), text("a1"), text("p2"), CellValue::Integer(11)],
        ];
        let mut engine = PivotEngine::new();
        engine
            .reset(
                ResetInput::new(&dims, data)
                    .with_assignment(PivotAssignment::new(["class", "object"], ["parameter"])),
            )
            .unwrap();
        engine
    }

    fn cell(engine: &PivotEngine, row: usize, column: usize) -> CellValue {
        engine.get_pivoted_data(&[row], &[column]).unwrap().remove(0).remove(0)
    }

    #[test]
    fn test_new_row_beyond_end() {
        let mut engine = create_test_engine();
        let report = engine
            .edit_index(vec![parts(&[Some("b"), Some("b1")])], &[1], Axis::Row)
            .unwrap();
        assert_eq!(report.accepted, vec![1]);
        assert_eq!(engine.row_count(), 2);
        assert!(engine.is_valid(Axis::Row, 1).unwrap());
        assert_eq!(cell(&engine, 1, 0), CellValue::Empty);
        assert!(engine.catalog().added_values()[0].contains(&t("b")));
    }

    #[test]
    fn test_gap_rows_stay_incomplete() {
        let mut engine = create_test_engine();
        engine
            .edit_index(
                vec![parts(&[Some("a"), Some("a1")]), parts(&[Some("b"), Some("b1")])],
                &[0, 2],
                Axis::Row,
            )
            .unwrap();
        assert_eq!(engine.row_count(), 3);
        assert!(!engine.is_valid(Axis::Row, 1).unwrap());
        assert!(engine.is_valid(Axis::Row, 2).unwrap());
    }

    #[test]
    fn test_growth_is_bounded_by_key_count() {
        let mut engine = create_test_engine();
        assert_eq!(
            engine.edit_index(vec![parts(&[Some("b"), Some("b1")])], &[usize::MAX], Axis::Row),
            Err(PivotError::OutOfRange { axis: Axis::Row, position: usize::MAX, len: 1 })
        );
        assert_eq!(
            engine.edit_index(vec![parts(&[Some("b"), Some("b1")])], &[2], Axis::Row),
            Err(PivotError::OutOfRange { axis: Axis::Row, position: 2, len: 1 })
        );
        assert_eq!(engine.row_count(), 1);
    }

    #[test]
    fn test_growing_an_empty_axis_adds_complete_headers() {
        let mut engine = create_test_engine();
        engine
            .set_pivot(&PivotAssignment::new(["class", "object", "parameter"], Vec::<&str>::new()))
            .unwrap();
        let report = engine.edit_index(vec![PartialKey::new()], &[1], Axis::Column).unwrap();
        assert_eq!(report.unchanged, vec![1]);
        assert_eq!(engine.column_count(), 2);
        assert!(engine.is_valid(Axis::Column, 1).unwrap());
    }

    #[test]
    fn test_stashed_cells_move_into_store_on_completion() {
        let mut engine = create_test_engine();
        engine
            .edit_index(vec![parts(&[Some("b"), None])], &[1], Axis::Row)
            .unwrap();
        engine.set_pivoted_data([(1, 0, CellValue::Integer(7))]).unwrap();
        assert_eq!(cell(&engine, 1, 0), CellValue::Integer(7));
        assert!(engine.value(&key(&["b", "b1", "p1"])).is_none());

        let report = engine
            .edit_index(vec![parts(&[Some("b"), Some("b1")])], &[1], Axis::Row)
            .unwrap();
        assert_eq!(report.accepted, vec![1]);
        assert_eq!(engine.value(&key(&["b", "b1", "p1"])), Some(&CellValue::Integer(7)));
        assert_eq!(cell(&engine, 1, 0), CellValue::Integer(7));
        assert_eq!(engine.pending_changes().additions.len(), 1);
    }

    #[test]
    fn test_stash_cleared_by_blank() {
        let mut engine = create_test_engine();
        engine
            .edit_index(vec![parts(&[None, Some("x")])], &[1], Axis::Row)
            .unwrap();
        engine.set_pivoted_data([(1, 1, text("raw"))]).unwrap();
        engine.set_pivoted_data([(1, 1, text(" "))]).unwrap();
        assert_eq!(cell(&engine, 1, 1), CellValue::Empty);
    }

    #[test]
    fn test_rename_moves_values() {
        let mut engine = create_test_engine();
        engine
            .edit_index(vec![parts(&[Some("a"), Some("a9")])], &[0], Axis::Row)
            .unwrap();
        assert!(engine.value(&key(&["a", "a1", "p1"])).is_none());
        assert_eq!(engine.value(&key(&["a", "a9", "p2"])), Some(&CellValue::Integer(11)));
        assert_eq!(cell(&engine, 0, 0), CellValue::Integer(10));

        let changes = engine.pending_changes();
        assert_eq!(changes.additions.len(), 2);
        assert_eq!(changes.deletions.len(), 2);
    }

    #[test]
    fn test_rename_column() {
        let mut engine = create_test_engine();
        engine
            .edit_index(vec![parts(&[Some("p7")])], &[1], Axis::Column)
            .unwrap();
        assert_eq!(engine.value(&key(&["a", "a1", "p7"])), Some(&CellValue::Integer(11)));
    }

    #[test]
    fn test_duplicate_rejected_and_parked() {
        let mut engine = create_test_engine();
        engine
            .edit_index(vec![parts(&[Some("b"), Some("b1")])], &[1], Axis::Row)
            .unwrap();
        let report = engine
            .edit_index(vec![parts(&[Some("a"), Some("a1")])], &[1], Axis::Row)
            .unwrap();
        assert_eq!(report.rejected, vec![(1, Rejection::Duplicate)]);
        assert!(!engine.is_valid(Axis::Row, 1).unwrap());
        assert_eq!(engine.headers(Axis::Row)[1].parts(), parts(&[Some("a"), Some("a1")]));
    }

    #[test]
    fn test_parked_rename_keeps_values_until_completed() {
        let mut engine = create_test_engine();
        engine
            .edit_index(vec![parts(&[Some("a"), None])], &[0], Axis::Row)
            .unwrap();
        assert!(!engine.is_valid(Axis::Row, 0).unwrap());
        assert_eq!(engine.value(&key(&["a", "a1", "p1"])), Some(&CellValue::Integer(10)));
        assert_eq!(cell(&engine, 0, 0), CellValue::Empty);

        engine
            .edit_index(vec![parts(&[Some("a"), Some("a2")])], &[0], Axis::Row)
            .unwrap();
        assert_eq!(engine.value(&key(&["a", "a2", "p1"])), Some(&CellValue::Integer(10)));
        assert!(engine.value(&key(&["a", "a1", "p1"])).is_none());
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let dims = vec![
            Dimension::new("year", DimensionType::Integer),
            Dimension::new("name", DimensionType::Text),
        ];
        let data = vec![vec![CellValue::Integer(2020), text("x"), CellValue::Integer(1)]];
        let mut engine = PivotEngine::new();
        engine
            .reset(ResetInput::new(&dims, data).with_assignment(PivotAssignment::new(["year"], ["name"])))
            .unwrap();

        let report = engine
            .edit_index(vec![parts(&[Some("soon")])], &[1], Axis::Row)
            .unwrap();
        assert_eq!(
            report.rejected,
            vec![(1, Rejection::TypeMismatch { dimension: "year".into() })]
        );

        let report = engine
            .edit_index(vec![parts(&[Some("2021")])], &[1], Axis::Row)
            .unwrap();
        assert_eq!(report.accepted, vec![1]);
        assert_eq!(engine.headers(Axis::Row)[1].key(), Some(&Key::from_vec(vec![IndexValue::Integer(2021)])));
    }

    #[test]
    fn test_edit_index_structural_errors() {
        let mut engine = create_test_engine();
        assert_eq!(
            engine.edit_index(vec![parts(&[Some("a")])], &[0], Axis::Row),
            Err(PivotError::HeaderKeyLength { expected: 2, actual: 1 })
        );
        assert_eq!(
            engine.edit_index(vec![], &[0], Axis::Row),
            Err(PivotError::EditLengthMismatch { keys: 0, positions: 1 })
        );
    }

    #[test]
    fn test_joint_catalog_follows_new_headers() {
        let dims = vec![
            Dimension::new("class", DimensionType::Text),
            Dimension::new("object", DimensionType::Text),
            Dimension::new("parameter", DimensionType::Text),
        ];
        let mut input = ResetInput::new(&dims, Vec::new())
            .with_assignment(PivotAssignment::new(["class", "object"], ["parameter"]));
        input.joint_values.push(JointValueSet {
            dimensions: vec!["class".into(), "object".into()],
            values: vec![vec![t("a"), t("a1")]],
        });
        let mut engine = PivotEngine::new();
        engine.reset(input).unwrap();
        assert_eq!(engine.row_count(), 1);

        engine
            .edit_index(vec![parts(&[Some("b"), Some("b1")])], &[1], Axis::Row)
            .unwrap();
        assert!(engine.catalog().tuples()[0].combinations.contains(&key(&["b", "b1"])));

        engine.refresh_headers();
        assert_eq!(engine.row_count(), 2);
    }

    #[test]
    fn test_delete_row_drops_values() {
        let mut engine = create_test_engine();
        engine.delete_row_col(&[0], Axis::Row).unwrap();
        assert_eq!(engine.row_count(), 0);
        assert!(engine.is_empty());
        assert_eq!(engine.pending_changes().deletions.len(), 2);
        assert_eq!(
            engine.delete_row_col(&[0], Axis::Row),
            Err(PivotError::OutOfRange { axis: Axis::Row, position: 0, len: 0 })
        );
    }

    #[test]
    fn test_delete_row_hands_values_to_duplicate() {
        let mut engine = create_test_engine();
        engine
            .edit_index(vec![parts(&[Some("a"), Some("a1")])], &[1], Axis::Row)
            .unwrap();
        engine.set_pivoted_data([(1, 1, CellValue::Integer(5))]).unwrap();
        engine.delete_row_col(&[0], Axis::Row).unwrap();

        assert_eq!(engine.row_count(), 1);
        assert!(engine.is_valid(Axis::Row, 0).unwrap());
        assert_eq!(cell(&engine, 0, 0), CellValue::Integer(10));
        assert_eq!(cell(&engine, 0, 1), CellValue::Integer(5));
    }

    #[test]
    fn test_delete_shifts_stashed_cells_with_their_slots() {
        let mut engine = create_test_engine();
        engine
            .edit_index(
                vec![parts(&[Some("b"), None]), parts(&[Some("c"), None])],
                &[1, 2],
                Axis::Row,
            )
            .unwrap();
        engine.set_pivoted_data([(2, 0, text("kept"))]).unwrap();
        engine.delete_row_col(&[1], Axis::Row).unwrap();
        assert_eq!(cell(&engine, 1, 0), text("kept"));
    }

    #[test]
    fn test_delete_parked_row_drops_its_values() {
        let mut engine = create_test_engine();
        engine
            .edit_index(vec![parts(&[Some("a"), None])], &[0], Axis::Row)
            .unwrap();
        engine.delete_row_col(&[0], Axis::Row).unwrap();

        assert_eq!(engine.row_count(), 0);
        assert!(engine.is_empty());
        assert_eq!(engine.pending_changes().deletions.len(), 2);

        engine
            .edit_index(vec![parts(&[Some("a"), Some("a1")])], &[0], Axis::Row)
            .unwrap();
        assert_eq!(
            engine.get_pivoted_data(&[0], &[0, 1]).unwrap(),
            vec![vec![CellValue::Empty, CellValue::Empty]]
        );
    }

    #[test]
    fn test_rename_moves_values_under_parked_column() {
        let mut engine = create_test_engine();
        let report = engine
            .edit_index(vec![parts(&[Some("p1")])], &[1], Axis::Column)
            .unwrap();
        assert_eq!(report.rejected, vec![(1, Rejection::Duplicate)]);

        engine
            .edit_index(vec![parts(&[Some("a"), Some("a9")])], &[0], Axis::Row)
            .unwrap();
        assert!(engine.value(&key(&["a", "a1", "p2"])).is_none());
        assert_eq!(engine.value(&key(&["a", "a9", "p2"])), Some(&CellValue::Integer(11)));

        engine
            .edit_index(vec![parts(&[Some("p3")])], &[1], Axis::Column)
            .unwrap();
        assert_eq!(cell(&engine, 0, 1), CellValue::Integer(11));
        assert_eq!(engine.value(&key(&["a", "a9", "p3"])), Some(&CellValue::Integer(11)));
        assert!(engine.value(&key(&["a", "a9", "p2"])).is_none());
    }

    #[test]
    fn test_parked_heir_keeps_its_own_values() {
        let mut engine = create_test_engine();
        engine
            .edit_index(vec![parts(&[Some("b"), Some("b1")])], &[1], Axis::Row)
            .unwrap();
        engine.set_pivoted_data([(1, 0, CellValue::Integer(5))]).unwrap();
        engine
            .edit_index(vec![parts(&[Some("a"), Some("a1")])], &[1], Axis::Row)
            .unwrap();

        engine.delete_row_col(&[0], Axis::Row).unwrap();
        assert_eq!(engine.row_count(), 1);
        assert!(engine.is_valid(Axis::Row, 0).unwrap());
        assert_eq!(cell(&engine, 0, 0), CellValue::Integer(5));
        assert_eq!(cell(&engine, 0, 1), CellValue::Empty);
        assert!(engine.value(&key(&["b", "b1", "p1"])).is_none());
        assert_eq!(engine.len(), 1);

        let changes = engine.pending_changes();
        assert!(changes.additions.is_empty());
        assert_eq!(
            changes.updates,
            vec![(key(&["a", "a1", "p1"]), CellValue::Integer(5), CellValue::Integer(10))]
        );
        assert_eq!(changes.deletions, vec![(key(&["a", "a1", "p2"]), CellValue::Integer(11))]);
    }

    #[test]
    fn test_delete_index_values_cascades() {
        let mut engine = create_test_engine();
        let values = BTreeMap::from([("parameter".to_string(), BTreeSet::from([t("p2")]))]);
        engine.delete_index_values(&values).unwrap();
        assert_eq!(engine.column_count(), 1);
        assert!(engine.value(&key(&["a", "a1", "p2"])).is_none());
        assert!(engine.catalog().removed_values()[2].contains(&t("p2")));
        assert!(engine.journal().is_clean());

        engine.refresh_headers();
        assert_eq!(engine.column_count(), 1);
    }

    #[test]
    fn test_delete_index_values_unknown_dimension() {
        let mut engine = create_test_engine();
        let values = BTreeMap::from([("nope".to_string(), BTreeSet::from([t("x")]))]);
        assert_eq!(
            engine.delete_index_values(&values),
            Err(PivotError::UnknownDimension("nope".into()))
        );
        assert_eq!(engine.len(), 2);
    }

    #[test]
    fn test_delete_tuple_index_values() {
        let mut engine = create_test_engine();
        engine
            .add_data(vec![vec![text("b"), text("b1"), text("p1"), CellValue::Integer(3)]])
            .unwrap();
        let values = BTreeMap::from([(
            vec!["class".to_string(), "object".to_string()],
            BTreeSet::from([vec![t("a"), t("a1")]]),
        )]);
        engine.delete_tuple_index_values(&values).unwrap();
        assert_eq!(engine.len(), 1);
        assert_eq!(engine.row_count(), 1);
        assert_eq!(engine.headers(Axis::Row)[0].key(), Some(&key(&["b", "b1"])));
        // Single-dimension catalogs are untouched.
        assert!(engine.catalog().contains(1, &t("a1")));
    }
}
