//! Client-side cache synchronization.
//!
//! - [`query`]: keyed store with stale-time tracking and fetch deduplication
//! - [`queries`]: typed assessment and submission queries over a data source
//! - [`mutation`]: remote updates merged into cached lists after they succeed
//! - [`polling`]: cancellable fixed-interval re-fetching

pub mod mutation;
pub mod polling;
pub mod queries;
pub mod query;

pub use mutation::{merge_record, merge_submission, MutationCoordinator, MutationState};
pub use polling::{poll_into_cache, subscribe, Subscription, MIN_POLL_INTERVAL};
pub use queries::{
    assessment_key, assessments_key, scope_to_assessment, submissions_key, Queries, STALE_TIME,
};
pub use query::{KeyPart, QueryCache, QueryKey, QueryState, DEFAULT_STALE_TIME};
