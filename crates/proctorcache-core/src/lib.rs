//! Core library for proctorcache.
//!
//! Monitoring exam assessments boils down to two pieces of logic:
//!
//! - [`table`]: a generic tabular engine that filters, sorts, paginates and
//!   resolves per-row actions over any [`models::Record`] collection.
//! - [`cache`]: a client-side query cache with stale-time tracking and
//!   in-flight deduplication, a mutation coordinator that merges updated
//!   records back into cached collections, and a polling subscriber.
//!
//! The [`api`] module holds the data source contract and an in-memory store
//! that satisfies it.

pub mod api;
pub mod cache;
pub mod config;
pub mod models;
pub mod table;
pub mod utils;

pub use api::{ApiError, DataSource, MemoryStore};
pub use cache::{MutationCoordinator, QueryCache, QueryKey, QueryState, Subscription};
pub use config::Config;
pub use models::{Assessment, FieldPath, Record, Submission, SubmissionStatus, SubmissionUpdate};
pub use table::{DataTable, SortOrder};
