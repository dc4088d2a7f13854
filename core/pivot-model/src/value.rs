//! FILENAME: core/pivot-model/src/value.rs
//! Value types shared by every layer of the pivot model.
//!
//! - `IndexValue`: one component of a key (what a header shows).
//! - `CellValue`: the opaque scalar stored under a complete key.
//! - `DimensionType`: the declared type of a dimension, with coercion rules.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// ============================================================================
// INDEX VALUES
// ============================================================================

/// A single component of a key, addressing one position along one dimension.
///
/// Integers sort before text so mixed data still has a total order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexValue {
    Integer(i64),
    Text(String),
}

impl IndexValue {
    /// Converts a raw cell into an index component, if it can be one.
    pub fn from_cell(value: &CellValue) -> Option<IndexValue> {
        match value {
            CellValue::Integer(i) => Some(IndexValue::Integer(*i)),
            // i64::MAX as f64 rounds up to 2^63, hence the open upper bound.
            CellValue::Number(n)
                if n.0.fract() == 0.0 && n.0 >= i64::MIN as f64 && n.0 < i64::MAX as f64 =>
            {
                Some(IndexValue::Integer(n.0 as i64))
            }
            CellValue::Text(s) => Some(IndexValue::Text(s.clone())),
            _ => None,
        }
    }
}

impl From<&str> for IndexValue {
    fn from(value: &str) -> Self {
        IndexValue::Text(value.to_string())
    }
}

impl From<String> for IndexValue {
    fn from(value: String) -> Self {
        IndexValue::Text(value)
    }
}

impl From<i64> for IndexValue {
    fn from(value: i64) -> Self {
        IndexValue::Integer(value)
    }
}

impl fmt::Display for IndexValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexValue::Integer(i) => write!(f, "{}", i),
            IndexValue::Text(s) => f.write_str(s),
        }
    }
}

/// A fully specified key: one component per dimension, in native order.
pub type Key = SmallVec<[IndexValue; 4]>;

/// A header key that may have unknown components (`None`).
pub type PartialKey = SmallVec<[Option<IndexValue>; 4]>;

/// Returns the complete key if no component is unknown.
pub fn complete_key(parts: &[Option<IndexValue>]) -> Option<Key> {
    parts.iter().cloned().collect()
}

/// Lifts a complete key into header parts.
pub fn to_parts(key: &[IndexValue]) -> PartialKey {
    key.iter().cloned().map(Some).collect()
}

/// Lexicographic order over partial keys with unknown components sorting last.
pub fn compare_partial(a: &[Option<IndexValue>], b: &[Option<IndexValue>]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let ord = match (x, y) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

// ============================================================================
// CELL VALUES
// ============================================================================

/// Wrapper around f64 that implements Eq and Hash.
/// NaN values are treated as equal to each other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderedFloat(pub f64);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        if self.0.is_nan() && other.0.is_nan() {
            true
        } else {
            self.0 == other.0
        }
    }
}

impl Eq for OrderedFloat {}

impl std::hash::Hash for OrderedFloat {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        if self.0.is_nan() {
            u64::MAX.hash(state);
        } else if self.0 == 0.0 {
            // 0.0 and -0.0 compare equal.
            0u64.hash(state);
        } else {
            self.0.to_bits().hash(state);
        }
    }
}

/// The scalar stored under a key. The model never interprets it beyond
/// equality and blankness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Boolean(bool),
    Integer(i64),
    Number(OrderedFloat),
    Text(String),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    pub fn number(value: f64) -> Self {
        CellValue::Number(OrderedFloat(value))
    }

    /// Empty, or text made only of whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<&IndexValue> for CellValue {
    fn from(value: &IndexValue) -> Self {
        match value {
            IndexValue::Integer(i) => CellValue::Integer(*i),
            IndexValue::Text(s) => CellValue::Text(s.clone()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Boolean(b) => write!(f, "{}", b),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Number(n) => write!(f, "{}", n.0),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

// ============================================================================
// DIMENSION TYPES
// ============================================================================

/// Declared type of a dimension's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionType {
    #[default]
    Text,
    Integer,
}

impl DimensionType {
    /// Coerces a value into this type, or `None` on a type mismatch.
    ///
    /// Integer dimensions accept integers and text that parses as one.
    /// Text dimensions accept non-blank text and integers.
    pub fn coerce(self, value: &IndexValue) -> Option<IndexValue> {
        match (self, value) {
            (DimensionType::Integer, IndexValue::Integer(i)) => Some(IndexValue::Integer(*i)),
            (DimensionType::Integer, IndexValue::Text(s)) => {
                s.trim().parse::<i64>().ok().map(IndexValue::Integer)
            }
            (DimensionType::Text, IndexValue::Text(s)) if !s.trim().is_empty() => {
                Some(IndexValue::Text(s.clone()))
            }
            (DimensionType::Text, IndexValue::Integer(i)) => Some(IndexValue::Text(i.to_string())),
            (DimensionType::Text, IndexValue::Text(_)) => None,
        }
    }
}
