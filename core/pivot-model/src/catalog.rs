//! FILENAME: core/pivot-model/src/catalog.rs
//! Index Catalog - the known-valid values of every dimension.
//!
//! Each dimension has a set of values that are legal for it: the values seen
//! in stored keys plus values declared up front that have no data yet.
//! Tuples of dimensions can additionally track jointly valid combinations
//! (e.g. which objects belong to which class), which the header builder uses
//! to offer placeholder headers.
//!
//! The catalog remembers which values were added or removed since the last
//! reset so a synchronizer can mirror them to the backing store.

use std::collections::BTreeSet;

use smallvec::SmallVec;

use crate::value::{IndexValue, Key};

/// Jointly valid combinations over a tuple of dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleCatalog {
    /// Native dimension positions, in the order combinations list them.
    pub dimensions: SmallVec<[usize; 4]>,
    pub combinations: BTreeSet<Key>,
}

impl TupleCatalog {
    /// True when every dimension of the tuple is in `a` or `b`.
    pub fn within(&self, a: &[usize], b: &[usize]) -> bool {
        self.dimensions.iter().all(|d| a.contains(d) || b.contains(d))
    }

    pub fn touches(&self, dims: &[usize]) -> bool {
        self.dimensions.iter().any(|d| dims.contains(d))
    }

    /// Projects a native key onto this tuple.
    pub fn project(&self, key: &[IndexValue]) -> Key {
        self.dimensions.iter().map(|&d| key[d].clone()).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct IndexCatalog {
    values: Vec<BTreeSet<IndexValue>>,
    tuples: Vec<TupleCatalog>,

    added: Vec<BTreeSet<IndexValue>>,
    removed: Vec<BTreeSet<IndexValue>>,
    removed_tuples: Vec<BTreeSet<Key>>,
}

impl IndexCatalog {
    pub fn new(dimension_count: usize) -> Self {
        IndexCatalog {
            values: vec![BTreeSet::new(); dimension_count],
            tuples: Vec::new(),
            added: vec![BTreeSet::new(); dimension_count],
            removed: vec![BTreeSet::new(); dimension_count],
            removed_tuples: Vec::new(),
        }
    }

    pub fn dimension_count(&self) -> usize {
        self.values.len()
    }

    // ========================================================================
    // SEEDING
    // ========================================================================

    /// Records the components of a stored key. Not tracked as an addition.
    pub fn observe(&mut self, key: &[IndexValue]) {
        for (set, value) in self.values.iter_mut().zip(key) {
            if !set.contains(value) {
                set.insert(value.clone());
            }
        }
    }

    /// Declares a value without data. Not tracked as an addition.
    pub fn seed(&mut self, dimension: usize, value: IndexValue) {
        self.values[dimension].insert(value);
    }

    /// Starts tracking a tuple of dimensions, or extends the existing
    /// tracker for the same tuple. Returns its index.
    pub fn track_tuple(
        &mut self,
        dimensions: &[usize],
        combinations: impl IntoIterator<Item = Key>,
    ) -> usize {
        let index = match self.tuple_index(dimensions) {
            Some(index) => index,
            None => {
                self.tuples.push(TupleCatalog {
                    dimensions: dimensions.iter().copied().collect(),
                    combinations: BTreeSet::new(),
                });
                self.removed_tuples.push(BTreeSet::new());
                self.tuples.len() - 1
            }
        };
        self.tuples[index].combinations.extend(combinations);
        index
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn values(&self, dimension: usize) -> &BTreeSet<IndexValue> {
        &self.values[dimension]
    }

    pub fn contains(&self, dimension: usize, value: &IndexValue) -> bool {
        self.values[dimension].contains(value)
    }

    pub fn tuples(&self) -> &[TupleCatalog] {
        &self.tuples
    }

    pub fn tuple_index(&self, dimensions: &[usize]) -> Option<usize> {
        self.tuples
            .iter()
            .position(|t| t.dimensions.as_slice() == dimensions)
    }

    /// Values added through `insert_value` since the last reset, per dimension.
    pub fn added_values(&self) -> &[BTreeSet<IndexValue>] {
        &self.added
    }

    /// Values removed since the last reset, per dimension.
    pub fn removed_values(&self) -> &[BTreeSet<IndexValue>] {
        &self.removed
    }

    /// Combinations removed since the last reset, parallel to `tuples()`.
    pub fn removed_tuple_values(&self) -> &[BTreeSet<Key>] {
        &self.removed_tuples
    }

    pub fn clear_changes(&mut self) {
        self.added.iter_mut().for_each(BTreeSet::clear);
        self.removed.iter_mut().for_each(BTreeSet::clear);
        self.removed_tuples.iter_mut().for_each(BTreeSet::clear);
    }

    // ========================================================================
    // MUTATION
    // ========================================================================

    /// Adds a value to a dimension. Returns true if it was new.
    pub fn insert_value(&mut self, dimension: usize, value: &IndexValue) -> bool {
        if self.values[dimension].insert(value.clone()) {
            if !self.removed[dimension].remove(value) {
                self.added[dimension].insert(value.clone());
            }
            true
        } else {
            false
        }
    }

    pub fn insert_combination(&mut self, tuple: usize, combination: Key) -> bool {
        self.removed_tuples[tuple].remove(&combination);
        self.tuples[tuple].combinations.insert(combination)
    }

    /// Removes values from a dimension, along with every tracked combination
    /// that uses them. Returns the values that were actually present.
    pub fn remove_values(
        &mut self,
        dimension: usize,
        values: &BTreeSet<IndexValue>,
    ) -> Vec<IndexValue> {
        let mut removed = Vec::new();
        for value in values {
            if self.values[dimension].remove(value) {
                if !self.added[dimension].remove(value) {
                    self.removed[dimension].insert(value.clone());
                }
                removed.push(value.clone());
            }
        }

        for (tuple, gone) in self.tuples.iter_mut().zip(self.removed_tuples.iter_mut()) {
            let Some(offset) = tuple.dimensions.iter().position(|&d| d == dimension) else {
                continue;
            };
            tuple.combinations.retain(|combination| {
                if values.contains(&combination[offset]) {
                    gone.insert(combination.clone());
                    false
                } else {
                    true
                }
            });
        }
        removed
    }

    /// Removes combinations from the tuple tracker for `dimensions`.
    /// Returns the number removed; an untracked tuple removes nothing.
    pub fn remove_combinations(&mut self, dimensions: &[usize], combinations: &BTreeSet<Key>) -> usize {
        let Some(index) = self.tuple_index(dimensions) else {
            return 0;
        };
        let mut count = 0;
        for combination in combinations {
            if self.tuples[index].combinations.remove(combination) {
                self.removed_tuples[index].insert(combination.clone());
                count += 1;
            }
        }
        count
    }
}
