//! FILENAME: core/pivot-model/src/engine.rs
//! Pivot Engine - the sparse keyed store behind a re-pivotable table view.
//!
//! The engine owns:
//! - the value store (complete key -> scalar),
//! - the catalog of known index values,
//! - the edit journal (diff against the last reset),
//! - the current layout and the derived row/column header slots.
//!
//! Header slots are derived state: `reset` and every effective `set_pivot`
//! rebuild them from the store and the catalog. Between rebuilds they are
//! edited in place (see `index_ops`), which keeps positions stable while a
//! user works in the view.
//!
//! Reads address cells by (row position, column position). A cell whose row
//! and column are both complete resolves through the key projector to a
//! native key; any other cell reads the raw value stashed in its slot.

use log::{debug, info, warn};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::catalog::IndexCatalog;
use crate::definition::{Axis, Dimension, PivotAssignment, ResetInput};
use crate::error::PivotError;
use crate::header::{HeaderBuilder, HeaderSlot, SlotId, SlotIds};
use crate::journal::{ChangeSet, EditJournal};
use crate::projector::KeyProjector;
use crate::value::{CellValue, IndexValue, Key};

pub(crate) const LOG_TARGET: &str = "PIVOT";

// ============================================================================
// LAYOUT
// ============================================================================

/// A pivot assignment resolved to native dimension positions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Layout {
    pub rows: Vec<usize>,
    pub columns: Vec<usize>,
    pub frozen: Vec<usize>,
    pub frozen_value: Key,
}

impl Layout {
    /// Validates the partition invariant and the frozen value.
    fn resolve(dimensions: &[Dimension], assignment: &PivotAssignment) -> Result<Layout, PivotError> {
        let mut assigned = vec![false; dimensions.len()];
        let mut group = |names: &[String]| -> Result<Vec<usize>, PivotError> {
            names
                .iter()
                .map(|name| {
                    let d = dimension_index(dimensions, name)?;
                    if std::mem::replace(&mut assigned[d], true) {
                        return Err(PivotError::DimensionAssignedTwice(name.clone()));
                    }
                    Ok(d)
                })
                .collect()
        };
        let rows = group(&assignment.rows)?;
        let columns = group(&assignment.columns)?;
        let frozen = group(&assignment.frozen)?;

        if let Some(d) = assigned.iter().position(|a| !a) {
            return Err(PivotError::UnassignedDimension(dimensions[d].name.clone()));
        }
        if assignment.frozen_value.len() != frozen.len() {
            return Err(PivotError::FrozenValueLength {
                expected: frozen.len(),
                actual: assignment.frozen_value.len(),
            });
        }
        let frozen_value = frozen
            .iter()
            .zip(&assignment.frozen_value)
            .map(|(&d, value)| {
                dimensions[d]
                    .kind
                    .coerce(value)
                    .ok_or_else(|| PivotError::InvalidFrozenValue(dimensions[d].name.clone()))
            })
            .collect::<Result<Key, _>>()?;

        Ok(Layout {
            rows,
            columns,
            frozen,
            frozen_value,
        })
    }

    pub fn axis(&self, axis: Axis) -> &[usize] {
        match axis {
            Axis::Row => &self.rows,
            Axis::Column => &self.columns,
        }
    }

    /// Maps (row header ++ column header ++ frozen value) to a native key.
    fn projector(&self) -> KeyProjector {
        let order: Vec<usize> = self
            .rows
            .iter()
            .chain(&self.columns)
            .chain(&self.frozen)
            .copied()
            .collect();
        KeyProjector::inverse(&order)
    }

    pub fn passes_frozen(&self, key: &[IndexValue]) -> bool {
        KeyProjector::new(self.frozen.iter().copied()).matches(key, &self.frozen_value)
    }

    pub fn header_of(&self, axis: Axis, key: &[IndexValue]) -> Key {
        KeyProjector::new(self.axis(axis).iter().copied()).project(key)
    }
}

pub(crate) fn dimension_index(dimensions: &[Dimension], name: &str) -> Result<usize, PivotError> {
    dimensions
        .iter()
        .position(|d| d.name == name)
        .ok_or_else(|| PivotError::UnknownDimension(name.to_string()))
}

/// Splits raw rows into (key, value), coercing key components to the
/// dimension types.
fn parse_raw_rows(
    dimensions: &[Dimension],
    rows: Vec<Vec<CellValue>>,
) -> Result<Vec<(Key, CellValue)>, PivotError> {
    let n = dimensions.len();
    rows.into_iter()
        .enumerate()
        .map(|(row, mut fields)| {
            if fields.len() < n + 1 {
                return Err(PivotError::RowTooShort {
                    row,
                    len: fields.len(),
                    expected: n + 1,
                });
            }
            if fields.len() > n + 1 {
                warn!(
                    target: LOG_TARGET,
                    "raw row {} has {} trailing fields, ignoring them",
                    row,
                    fields.len() - n - 1
                );
            }
            let value = std::mem::take(&mut fields[n]);
            let key = fields[..n]
                .iter()
                .zip(dimensions)
                .map(|(field, dimension)| {
                    IndexValue::from_cell(field)
                        .and_then(|v| dimension.kind.coerce(&v))
                        .ok_or_else(|| PivotError::InvalidKeyComponent {
                            row,
                            dimension: dimension.name.clone(),
                        })
                })
                .collect::<Result<Key, _>>()?;
            Ok((key, value))
        })
        .collect()
}

// ============================================================================
// PIVOT ENGINE
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct PivotEngine {
    pub(crate) dimensions: Vec<Dimension>,
    pub(crate) data: FxHashMap<Key, CellValue>,
    pub(crate) catalog: IndexCatalog,
    pub(crate) journal: EditJournal,
    pub(crate) layout: Layout,
    projector: KeyProjector,
    pub(crate) rows: Vec<HeaderSlot>,
    pub(crate) columns: Vec<HeaderSlot>,
    pub(crate) slot_ids: SlotIds,
}

impl PivotEngine {
    /// An engine without dimensions or data. Call `reset` to load it.
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // RESET & PIVOT
    // ========================================================================

    /// Replaces the whole model. Validates everything before touching state.
    pub fn reset(&mut self, input: ResetInput) -> Result<(), PivotError> {
        let ResetInput {
            data,
            dimension_names,
            dimension_types,
            assignment,
            extra_values,
            joint_values,
        } = input;

        if dimension_names.len() != dimension_types.len() {
            return Err(PivotError::DimensionCountMismatch {
                names: dimension_names.len(),
                types: dimension_types.len(),
            });
        }
        let mut dimensions: Vec<Dimension> = Vec::with_capacity(dimension_names.len());
        for (name, kind) in dimension_names.into_iter().zip(dimension_types) {
            if dimensions.iter().any(|d| d.name == name) {
                return Err(PivotError::DuplicateDimension(name));
            }
            dimensions.push(Dimension::new(name, kind));
        }

        let rows = parse_raw_rows(&dimensions, data)?;
        let assignment = assignment.unwrap_or_else(|| PivotAssignment::all_rows(&dimensions));
        let layout = Layout::resolve(&dimensions, &assignment)?;

        let mut catalog = IndexCatalog::new(dimensions.len());
        for (name, values) in &extra_values {
            let d = dimension_index(&dimensions, name)?;
            for value in values {
                let value = dimensions[d]
                    .kind
                    .coerce(value)
                    .ok_or_else(|| PivotError::InvalidCatalogValue(name.clone()))?;
                catalog.seed(d, value);
            }
        }
        for set in &joint_values {
            let dims = set
                .dimensions
                .iter()
                .map(|name| dimension_index(&dimensions, name))
                .collect::<Result<Vec<usize>, _>>()?;
            let mut combinations = Vec::with_capacity(set.values.len());
            for combination in &set.values {
                if combination.len() != dims.len() {
                    return Err(PivotError::KeyLength {
                        expected: dims.len(),
                        actual: combination.len(),
                    });
                }
                let combination = combination
                    .iter()
                    .zip(&dims)
                    .map(|(value, &d)| {
                        dimensions[d]
                            .kind
                            .coerce(value)
                            .ok_or_else(|| PivotError::InvalidCatalogValue(dimensions[d].name.clone()))
                    })
                    .collect::<Result<Key, _>>()?;
                combinations.push(combination);
            }
            catalog.track_tuple(&dims, combinations);
        }

        let mut store: FxHashMap<Key, CellValue> = FxHashMap::default();
        store.reserve(rows.len());
        for (key, value) in rows {
            catalog.observe(&key);
            if matches!(value, CellValue::Empty) {
                store.remove(&key);
            } else {
                store.insert(key, value);
            }
        }

        info!(
            target: LOG_TARGET,
            "reset: {} dimensions, {} values, {} joint value sets",
            dimensions.len(),
            store.len(),
            catalog.tuples().len()
        );

        self.dimensions = dimensions;
        self.data = store;
        self.catalog = catalog;
        self.journal.clear();
        self.apply_layout(layout);
        Ok(())
    }

    /// Re-slices the view. A no-op when nothing changed; otherwise every
    /// header slot (and any stashed raw cell) is rebuilt from scratch.
    pub fn set_pivot(&mut self, assignment: &PivotAssignment) -> Result<(), PivotError> {
        let layout = Layout::resolve(&self.dimensions, assignment)?;
        if layout == self.layout {
            return Ok(());
        }
        self.apply_layout(layout);
        Ok(())
    }

    /// Changes only the frozen value.
    pub fn set_frozen_value(&mut self, frozen_value: Vec<IndexValue>) -> Result<(), PivotError> {
        let mut assignment = self.assignment();
        assignment.frozen_value = frozen_value;
        self.set_pivot(&assignment)
    }

    /// Rebuilds the headers under the current layout, e.g. after catalog
    /// changes. Incomplete headers and their stashed cells are dropped.
    pub fn refresh_headers(&mut self) {
        let layout = std::mem::take(&mut self.layout);
        self.apply_layout(layout);
    }

    fn apply_layout(&mut self, layout: Layout) {
        let builder = HeaderBuilder::new(&self.catalog, &layout.frozen, &layout.frozen_value);
        let rows = builder.build(&layout.rows, self.data.keys());
        let columns = builder.build(&layout.columns, self.data.keys());

        let ids = &mut self.slot_ids;
        self.rows = rows
            .into_iter()
            .map(|parts| HeaderSlot::from_parts(ids.allocate(), parts))
            .collect();
        self.columns = columns
            .into_iter()
            .map(|parts| HeaderSlot::from_parts(ids.allocate(), parts))
            .collect();
        self.projector = layout.projector();
        self.layout = layout;

        debug!(
            target: LOG_TARGET,
            "pivot: rows={:?} columns={:?} frozen={:?} -> {}x{} headers",
            self.layout.rows,
            self.layout.columns,
            self.layout.frozen,
            self.rows.len(),
            self.columns.len()
        );
    }

    /// The current assignment, by dimension name.
    pub fn assignment(&self) -> PivotAssignment {
        let names = |dims: &[usize]| -> Vec<String> {
            dims.iter().map(|&d| self.dimensions[d].name.clone()).collect()
        };
        PivotAssignment {
            rows: names(&self.layout.rows),
            columns: names(&self.layout.columns),
            frozen: names(&self.layout.frozen),
            frozen_value: self.layout.frozen_value.to_vec(),
        }
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Header rows above the data: one per column dimension, at least one.
    pub fn header_row_count(&self) -> usize {
        self.layout.columns.len().max(1)
    }

    /// Header columns left of the data: one per row dimension, at least one.
    pub fn header_column_count(&self) -> usize {
        self.layout.rows.len().max(1)
    }

    pub fn headers(&self, axis: Axis) -> &[HeaderSlot] {
        self.slots(axis)
    }

    pub fn header(&self, axis: Axis, position: usize) -> Result<&HeaderSlot, PivotError> {
        self.check_position(axis, position)?;
        Ok(&self.slots(axis)[position])
    }

    pub fn is_valid(&self, axis: Axis, position: usize) -> Result<bool, PivotError> {
        Ok(self.header(axis, position)?.is_complete())
    }

    pub fn value(&self, key: &[IndexValue]) -> Option<&CellValue> {
        self.data.get(key)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn catalog(&self) -> &IndexCatalog {
        &self.catalog
    }

    pub fn journal(&self) -> &EditJournal {
        &self.journal
    }

    /// The diff since the last reset or `mark_synced`.
    pub fn pending_changes(&self) -> ChangeSet {
        self.journal.changes(&self.data)
    }

    /// Forgets tracked changes once the backing store has applied them.
    pub fn mark_synced(&mut self) {
        self.journal.clear();
        self.catalog.clear_changes();
    }

    // ========================================================================
    // CELL I/O
    // ========================================================================

    pub fn get_pivoted_data(
        &self,
        rows: &[usize],
        columns: &[usize],
    ) -> Result<Vec<Vec<CellValue>>, PivotError> {
        for &row in rows {
            self.check_position(Axis::Row, row)?;
        }
        for &column in columns {
            self.check_position(Axis::Column, column)?;
        }
        Ok(rows
            .iter()
            .map(|&row| columns.iter().map(|&column| self.cell(row, column)).collect())
            .collect())
    }

    /// Writes (row, column, value) triples. All positions are checked
    /// before anything is written.
    pub fn set_pivoted_data(
        &mut self,
        cells: impl IntoIterator<Item = (usize, usize, CellValue)>,
    ) -> Result<(), PivotError> {
        let cells: Vec<(usize, usize, CellValue)> = cells.into_iter().collect();
        for (row, column, _) in &cells {
            self.check_position(Axis::Row, *row)?;
            self.check_position(Axis::Column, *column)?;
        }
        for (row, column, value) in cells {
            self.write_cell(row, column, value);
        }
        Ok(())
    }

    /// Writes a rectangular block: `values[i][j]` goes to
    /// `(rows[i], columns[j])`.
    pub fn batch_set_data(
        &mut self,
        rows: &[usize],
        columns: &[usize],
        values: Vec<Vec<CellValue>>,
    ) -> Result<(), PivotError> {
        if values.len() != rows.len() || values.iter().any(|line| line.len() != columns.len()) {
            return Err(PivotError::BatchShape {
                rows: rows.len(),
                columns: columns.len(),
            });
        }
        let cells: Vec<(usize, usize, CellValue)> = rows
            .iter()
            .zip(values)
            .flat_map(|(&row, line)| {
                columns
                    .iter()
                    .zip(line)
                    .map(move |(&column, value)| (row, column, value))
            })
            .collect();
        self.set_pivoted_data(cells)
    }

    fn cell(&self, row: usize, column: usize) -> CellValue {
        let (row, column) = (&self.rows[row], &self.columns[column]);
        match (row.key(), column.key()) {
            (Some(r), Some(c)) => self.data.get(&self.native_key(r, c)).cloned().unwrap_or_default(),
            _ => {
                let (owner, other) = if row.is_complete() {
                    (column, row.id())
                } else {
                    (row, column.id())
                };
                owner
                    .pending()
                    .and_then(|pending| pending.cells.get(&other))
                    .cloned()
                    .unwrap_or_default()
            }
        }
    }

    fn write_cell(&mut self, row: usize, column: usize, value: CellValue) {
        match (self.rows[row].key(), self.columns[column].key()) {
            (Some(r), Some(c)) => {
                let key = self.native_key(r, c);
                self.store_cell(key, value);
            }
            _ => self.stash_cell(row, column, value),
        }
    }

    /// Raw values typed into a cell with an incomplete header live in the
    /// row slot if the row is incomplete, otherwise in the column slot.
    fn stash_cell(&mut self, row: usize, column: usize, value: CellValue) {
        let (axis, owner, other) = if self.rows[row].is_complete() {
            (Axis::Column, column, self.rows[row].id())
        } else {
            (Axis::Row, row, self.columns[column].id())
        };
        if let Some(pending) = self.slots_mut(axis)[owner].pending_mut() {
            if value.is_blank() {
                pending.cells.remove(&other);
            } else {
                pending.cells.insert(other, value);
            }
        }
    }

    // ========================================================================
    // INCREMENTAL DATA FROM THE BACKING STORE
    // ========================================================================

    /// Merges rows reported as added by the backing store. Not journaled.
    /// New complete headers are appended; existing positions do not move.
    pub fn add_data(&mut self, rows: Vec<Vec<CellValue>>) -> Result<(), PivotError> {
        let rows = parse_raw_rows(&self.dimensions, rows)?;
        let count = rows.len();
        for (key, value) in rows {
            self.catalog.observe(&key);
            self.journal.forget(&key);
            self.append_headers(&key);
            if matches!(value, CellValue::Empty) {
                self.data.remove(&key);
            } else {
                self.data.insert(key, value);
            }
        }
        debug!(target: LOG_TARGET, "add_data: {} rows merged", count);
        Ok(())
    }

    /// Drops values reported as removed by the backing store. Not journaled.
    pub fn remove_data(&mut self, keys: &[Key]) -> Result<(), PivotError> {
        let expected = self.dimensions.len();
        if let Some(key) = keys.iter().find(|k| k.len() != expected) {
            return Err(PivotError::KeyLength {
                expected,
                actual: key.len(),
            });
        }
        for key in keys {
            self.data.remove(key);
            self.journal.forget(key);
        }
        Ok(())
    }

    fn append_headers(&mut self, key: &Key) {
        if !self.layout.passes_frozen(key) {
            return;
        }
        for axis in [Axis::Row, Axis::Column] {
            if self.layout.axis(axis).is_empty() {
                continue;
            }
            let header = self.layout.header_of(axis, key);
            if self.slots(axis).iter().any(|s| s.key() == Some(&header)) {
                continue;
            }
            let id = self.slot_ids.allocate();
            self.slots_mut(axis).push(HeaderSlot::complete(id, header));
        }
    }

    // ========================================================================
    // INTERNALS SHARED WITH INDEX OPERATIONS
    // ========================================================================

    pub(crate) fn slots(&self, axis: Axis) -> &Vec<HeaderSlot> {
        match axis {
            Axis::Row => &self.rows,
            Axis::Column => &self.columns,
        }
    }

    pub(crate) fn slots_mut(&mut self, axis: Axis) -> &mut Vec<HeaderSlot> {
        match axis {
            Axis::Row => &mut self.rows,
            Axis::Column => &mut self.columns,
        }
    }

    pub(crate) fn slot_index(&self, axis: Axis, id: SlotId) -> Option<usize> {
        self.slots(axis).iter().position(|s| s.id() == id)
    }

    pub(crate) fn check_position(&self, axis: Axis, position: usize) -> Result<(), PivotError> {
        let len = self.slots(axis).len();
        if position >= len {
            return Err(PivotError::OutOfRange { axis, position, len });
        }
        Ok(())
    }

    pub(crate) fn native_key(&self, row: &[IndexValue], column: &[IndexValue]) -> Key {
        let mut input: SmallVec<[IndexValue; 8]> = SmallVec::with_capacity(self.dimensions.len());
        input.extend(row.iter().cloned());
        input.extend(column.iter().cloned());
        input.extend(self.layout.frozen_value.iter().cloned());
        self.projector.project(&input)
    }

    /// Native key of the cell where header `this` on `axis` meets header
    /// `other` on the other axis.
    pub(crate) fn cell_key(&self, axis: Axis, this: &[IndexValue], other: &[IndexValue]) -> Key {
        match axis {
            Axis::Row => self.native_key(this, other),
            Axis::Column => self.native_key(other, this),
        }
    }

    /// Journaled write; a blank value deletes.
    pub(crate) fn store_cell(&mut self, key: Key, value: CellValue) {
        if value.is_blank() {
            self.delete_value(&key);
        } else {
            self.write_value(key, value);
        }
    }

    pub(crate) fn write_value(&mut self, key: Key, value: CellValue) {
        self.journal.record_write(&key, self.data.get(&key), &value);
        self.data.insert(key, value);
    }

    pub(crate) fn delete_value(&mut self, key: &Key) {
        self.journal.record_delete(key, self.data.get(key));
        self.data.remove(key);
    }
}
