//! Schema diff engine.
//!
//! Computes an ordered, deterministic list of [`crate::schema::Change`]s
//! between two schema graphs. Pure with respect to its inputs; callers may
//! diff disjoint inputs concurrently.

mod engine;

pub use engine::{DefaultDialect, DialectDiffer, DiffError, Differ};
