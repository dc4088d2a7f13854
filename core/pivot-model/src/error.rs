//! FILENAME: core/pivot-model/src/error.rs

use thiserror::Error;

use crate::definition::Axis;

/// Broad classes of failure a caller reacts to differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input. The model is left untouched.
    Structural,
    /// A position beyond the current header length. Safe to retry after
    /// refetching the header counts.
    OutOfRange,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PivotError {
    #[error("{names} dimension names but {types} dimension types")]
    DimensionCountMismatch { names: usize, types: usize },

    #[error("Duplicate dimension name: {0}")]
    DuplicateDimension(String),

    #[error("Raw row {row} has {len} fields, expected at least {expected}")]
    RowTooShort { row: usize, len: usize, expected: usize },

    #[error("Raw row {row} has an invalid value for dimension {dimension}")]
    InvalidKeyComponent { row: usize, dimension: String },

    #[error("Catalog value is not valid for dimension {0}")]
    InvalidCatalogValue(String),

    #[error("Unknown dimension: {0}")]
    UnknownDimension(String),

    #[error("Dimension assigned more than once: {0}")]
    DimensionAssignedTwice(String),

    #[error("Dimension not assigned to rows, columns or frozen: {0}")]
    UnassignedDimension(String),

    #[error("Frozen value has {actual} components, expected {expected}")]
    FrozenValueLength { expected: usize, actual: usize },

    #[error("Frozen value is not valid for dimension {0}")]
    InvalidFrozenValue(String),

    #[error("Header key has {actual} components, expected {expected}")]
    HeaderKeyLength { expected: usize, actual: usize },

    #[error("Key has {actual} components, expected {expected}")]
    KeyLength { expected: usize, actual: usize },

    #[error("{keys} header keys given for {positions} positions")]
    EditLengthMismatch { keys: usize, positions: usize },

    #[error("Batch shape mismatch: expected {rows}x{columns} values")]
    BatchShape { rows: usize, columns: usize },

    #[error("{axis} position {position} out of range (length {len})")]
    OutOfRange { axis: Axis, position: usize, len: usize },
}

impl PivotError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PivotError::OutOfRange { .. } => ErrorKind::OutOfRange,
            _ => ErrorKind::Structural,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = PivotError::OutOfRange { axis: Axis::Row, position: 4, len: 2 };
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
        assert_eq!(err.to_string(), "row position 4 out of range (length 2)");
        assert_eq!(PivotError::UnknownDimension("x".into()).kind(), ErrorKind::Structural);
    }
}
