//! FILENAME: core/pivot-model/src/definition.rs
//! Pivot Model Definition - The serializable configuration.
//!
//! This module contains the types needed to DESCRIBE a pivot model:
//! its dimensions, the raw data a reset ingests and which dimensions
//! are laid out as rows, columns or frozen filters. These structures are
//! plain data so a host can save a layout and restore it later.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::{CellValue, DimensionType, IndexValue};

// ============================================================================
// DIMENSIONS
// ============================================================================

/// One axis of the keyed dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    /// Unique name.
    pub name: String,

    /// Declared type of the values along this dimension.
    #[serde(default)]
    pub kind: DimensionType,
}

impl Dimension {
    pub fn new(name: impl Into<String>, kind: DimensionType) -> Self {
        Dimension {
            name: name.into(),
            kind,
        }
    }
}

/// Which header axis an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Row,
    Column,
}

impl Axis {
    pub fn other(self) -> Axis {
        match self {
            Axis::Row => Axis::Column,
            Axis::Column => Axis::Row,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Row => f.write_str("row"),
            Axis::Column => f.write_str("column"),
        }
    }
}

// ============================================================================
// PIVOT ASSIGNMENT
// ============================================================================

/// Partition of the dimensions into rows, columns and frozen filters.
/// Dimensions are referenced by name, in the order they nest on each axis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PivotAssignment {
    #[serde(default)]
    pub rows: Vec<String>,

    #[serde(default)]
    pub columns: Vec<String>,

    #[serde(default)]
    pub frozen: Vec<String>,

    /// One value per frozen dimension, in the same order.
    #[serde(default)]
    pub frozen_value: Vec<IndexValue>,
}

impl PivotAssignment {
    pub fn new<S: Into<String>>(
        rows: impl IntoIterator<Item = S>,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        PivotAssignment {
            rows: rows.into_iter().map(Into::into).collect(),
            columns: columns.into_iter().map(Into::into).collect(),
            frozen: Vec::new(),
            frozen_value: Vec::new(),
        }
    }

    /// Adds a frozen dimension filtered to `value`.
    pub fn freeze(mut self, name: impl Into<String>, value: impl Into<IndexValue>) -> Self {
        self.frozen.push(name.into());
        self.frozen_value.push(value.into());
        self
    }

    /// Every dimension as a row, nothing frozen.
    pub fn all_rows(dimensions: &[Dimension]) -> Self {
        PivotAssignment {
            rows: dimensions.iter().map(|d| d.name.clone()).collect(),
            ..Default::default()
        }
    }
}

// ============================================================================
// RESET INPUT
// ============================================================================

/// A set of jointly valid combinations for a tuple of dimensions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JointValueSet {
    /// Dimension names, in the order the combinations list their values.
    pub dimensions: Vec<String>,

    #[serde(default)]
    pub values: Vec<Vec<IndexValue>>,
}

/// Everything a full reset ingests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResetInput {
    /// Raw rows: one value per dimension followed by the stored value.
    #[serde(default)]
    pub data: Vec<Vec<CellValue>>,

    pub dimension_names: Vec<String>,

    pub dimension_types: Vec<DimensionType>,

    /// Defaults to all dimensions as rows.
    #[serde(default)]
    pub assignment: Option<PivotAssignment>,

    /// Catalog values that have no data yet, by dimension name.
    #[serde(default)]
    pub extra_values: BTreeMap<String, BTreeSet<IndexValue>>,

    #[serde(default)]
    pub joint_values: Vec<JointValueSet>,
}

impl ResetInput {
    pub fn new(dimensions: &[Dimension], data: Vec<Vec<CellValue>>) -> Self {
        ResetInput {
            data,
            dimension_names: dimensions.iter().map(|d| d.name.clone()).collect(),
            dimension_types: dimensions.iter().map(|d| d.kind).collect(),
            ..Default::default()
        }
    }

    pub fn with_assignment(mut self, assignment: PivotAssignment) -> Self {
        self.assignment = Some(assignment);
        self
    }
}
