//! FILENAME: core/pivot-model/src/lib.rs
//! Pivot model: a sparse multi-dimensional table that can be re-sliced into
//! any two-axis view and edited through it.
//!
//! Layers:
//! - `value`: Key components, stored scalars and dimension types
//! - `definition`: Serializable configuration (dimensions, assignment, reset input)
//! - `projector`: Positional key reordering between view and storage order
//! - `catalog`: Known index values, single and joint, with change tracking
//! - `header`: Header slots and header derivation
//! - `journal`: Diff of the store against the last reset
//! - `engine`: The pivot engine (reset, pivot, cell I/O)
//! - `index_ops`: Header edits and cascading deletes

pub mod catalog;
pub mod definition;
pub mod engine;
pub mod error;
pub mod header;
pub mod index_ops;
pub mod journal;
pub mod projector;
pub mod value;

pub use catalog::{IndexCatalog, TupleCatalog};
pub use definition::*;
pub use engine::PivotEngine;
pub use error::{ErrorKind, PivotError};
pub use header::{HeaderSlot, PendingHeader, SlotId, SlotState};
pub use index_ops::{IndexEditReport, Rejection};
pub use journal::{ChangeSet, EditJournal};
pub use projector::KeyProjector;
pub use value::*;
