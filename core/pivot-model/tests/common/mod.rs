//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for pivot model integration tests.

#![allow(dead_code)]

use std::collections::BTreeSet;

use pivot_model::{
    Axis, CellValue, Dimension, DimensionType, IndexValue, Key, PartialKey, PivotAssignment,
    PivotEngine, ResetInput,
};

/// Test harness wrapping an engine loaded with fixture data.
pub struct TestHarness {
    pub engine: PivotEngine,
}

impl TestHarness {
    /// Engine loaded with `rows` (key fields followed by the value) over
    /// the given dimensions, all on rows.
    pub fn new(dimensions: &[Dimension], rows: Vec<Vec<CellValue>>) -> Self {
        let mut engine = PivotEngine::new();
        engine
            .reset(ResetInput::new(dimensions, rows))
            .expect("fixture reset");
        TestHarness { engine }
    }

    /// The class/object/parameter fixture, pivoted as
    /// rows=(class, object), columns=(parameter).
    pub fn with_instrument_data() -> Self {
        let mut harness = Self::new(&InstrumentFixture::dimensions(), InstrumentFixture::rows());
        harness.pivot(&["class", "object"], &["parameter"]);
        harness
    }

    pub fn pivot(&mut self, rows: &[&str], columns: &[&str]) {
        self.engine
            .set_pivot(&PivotAssignment::new(rows.iter().copied(), columns.iter().copied()))
            .expect("pivot");
    }

    pub fn cell(&self, row: usize, column: usize) -> CellValue {
        self.engine
            .get_pivoted_data(&[row], &[column])
            .expect("cell in range")
            .remove(0)
            .remove(0)
    }

    pub fn set(&mut self, row: usize, column: usize, value: impl Into<CellValue>) {
        self.engine
            .set_pivoted_data([(row, column, value.into())])
            .expect("write in range");
    }

    /// Position of the complete header with these components.
    pub fn position(&self, axis: Axis, header: &[&str]) -> Option<usize> {
        let header = key(header);
        self.engine
            .headers(axis)
            .iter()
            .position(|slot| slot.key() == Some(&header))
    }

    /// Native keys addressed by complete (row, column) header pairs that
    /// hold a value.
    pub fn visible_keys(&self) -> BTreeSet<Key> {
        let rows: Vec<usize> = (0..self.engine.row_count()).collect();
        let columns: Vec<usize> = (0..self.engine.column_count()).collect();
        let mut keys = BTreeSet::new();
        for &row in &rows {
            for &column in &columns {
                let row_header = &self.engine.headers(Axis::Row)[row];
                let column_header = &self.engine.headers(Axis::Column)[column];
                if !row_header.is_complete() || !column_header.is_complete() {
                    continue;
                }
                if matches!(self.cell(row, column), CellValue::Empty) {
                    continue;
                }
                keys.insert(self.native_key(row, column));
            }
        }
        keys
    }

    /// Rebuilds the native key of a complete cell from the assignment.
    fn native_key(&self, row: usize, column: usize) -> Key {
        let assignment = self.engine.assignment();
        let row_key = self.engine.headers(Axis::Row)[row].key().cloned().unwrap_or_default();
        let column_key = self.engine.headers(Axis::Column)[column]
            .key()
            .cloned()
            .unwrap_or_default();
        let named: Vec<(&String, &IndexValue)> = assignment
            .rows
            .iter()
            .zip(row_key.iter())
            .chain(assignment.columns.iter().zip(column_key.iter()))
            .chain(assignment.frozen.iter().zip(assignment.frozen_value.iter()))
            .collect();
        self.engine
            .dimensions()
            .iter()
            .map(|d| {
                named
                    .iter()
                    .find(|(name, _)| **name == d.name)
                    .map(|(_, v)| (*v).clone())
                    .expect("every dimension assigned")
            })
            .collect()
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub struct InstrumentFixture;

impl InstrumentFixture {
    pub fn dimensions() -> Vec<Dimension> {
        vec![
            Dimension::new("class", DimensionType::Text),
            Dimension::new("object", DimensionType::Text),
            Dimension::new("parameter", DimensionType::Text),
        ]
    }

    pub fn data() -> Vec<(&'static str, &'static str, &'static str, i64)> {
        vec![
            ("pump", "P-101", "flow", 120),
            ("pump", "P-101", "head", 35),
            ("pump", "P-102", "flow", 95),
            ("valve", "V-201", "size", 4),
            ("valve", "V-202", "size", 6),
            ("valve", "V-202", "rating", 150),
        ]
    }

    pub fn rows() -> Vec<Vec<CellValue>> {
        Self::data()
            .into_iter()
            .map(|(class, object, parameter, value)| {
                vec![
                    CellValue::text(class),
                    CellValue::text(object),
                    CellValue::text(parameter),
                    CellValue::Integer(value),
                ]
            })
            .collect()
    }
}

// ============================================================================
// HELPERS
// ============================================================================

pub fn key(values: &[&str]) -> Key {
    values.iter().map(|v| IndexValue::from(*v)).collect()
}

pub fn parts(values: &[Option<&str>]) -> PartialKey {
    values.iter().map(|v| v.map(IndexValue::from)).collect()
}
