//! Data source module.
//!
//! This module defines the `DataSource` contract the cache layer consumes,
//! the `ApiError` taxonomy every operation reports, and `MemoryStore`, an
//! in-memory implementation seeded from a JSON database file.

pub mod error;
pub mod source;

pub use error::ApiError;
pub use source::{DataSource, MemoryStore, DEFAULT_LATENCY_MS};
