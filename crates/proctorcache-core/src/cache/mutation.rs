//! Remote updates merged back into cached collections.
//!
//! The update is sent first; only a successful response touches the cache.
//! A failed update leaves every cached value exactly as it was.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, error};

use super::queries::submissions_key;
use super::query::QueryCache;
use crate::api::{ApiError, DataSource};
use crate::models::{Record, Submission, SubmissionStatus, SubmissionUpdate};

/// Progress of the coordinator's mutations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationState {
    /// At least one mutation is still running.
    pub is_loading: bool,
    /// Error from the most recently finished mutation.
    pub error: Option<ApiError>,
}

#[derive(Default)]
struct Progress {
    running: usize,
    error: Option<ApiError>,
}

/// Sends submission updates and merges the results into the query cache.
pub struct MutationCoordinator<S> {
    source: Arc<S>,
    cache: Arc<QueryCache>,
    progress: Mutex<Progress>,
}

impl<S: DataSource> MutationCoordinator<S> {
    pub fn new(source: Arc<S>, cache: Arc<QueryCache>) -> Self {
        Self {
            source,
            cache,
            progress: Mutex::new(Progress::default()),
        }
    }

    pub fn state(&self) -> MutationState {
        let progress = self.progress();
        MutationState {
            is_loading: progress.running > 0,
            error: progress.error.clone(),
        }
    }

    fn progress(&self) -> MutexGuard<'_, Progress> {
        self.progress
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn finish(&self, error: Option<ApiError>) {
        let mut progress = self.progress();
        progress.running = progress.running.saturating_sub(1);
        progress.error = error;
    }

    /// Update submission `id`, then merge the returned record into every
    /// cached submissions list for its assessment.
    pub async fn mutate(
        &self,
        id: &str,
        update: &SubmissionUpdate,
    ) -> Result<Submission, ApiError> {
        {
            let mut progress = self.progress();
            progress.running += 1;
            progress.error = None;
        }

        match self.source.update_submission(id, update).await {
            Ok(updated) => {
                let merged = merge_submission(&self.cache, &updated);
                debug!(submission_id = id, merged, "Submission update merged into cache");
                self.finish(None);
                Ok(updated)
            }
            Err(e) => {
                error!(submission_id = id, error = %e, "Submission update failed");
                self.finish(Some(e.clone()));
                Err(e)
            }
        }
    }

    /// Return a manually locked submission to `pending`.
    pub async fn unlock(&self, id: &str) -> Result<Submission, ApiError> {
        self.mutate(id, &SubmissionUpdate::status(SubmissionStatus::Unlocked))
            .await
    }
}

/// Merge `updated` into every cached `("submissions", assessment_id, ..)`
/// list. Returns how many cached lists changed.
pub fn merge_submission(cache: &QueryCache, updated: &Submission) -> usize {
    let mut merged = 0;
    for key in cache.keys_matching(&submissions_key(&updated.assessment_id)) {
        if cache.update::<Vec<Submission>, _>(&key, |list| merge_record(list, updated.clone())) {
            merged += 1;
        }
    }
    merged
}

/// Replace the record with the same id, or append it when absent.
/// Every other record is left untouched.
pub fn merge_record<R: Record>(list: &mut Vec<R>, record: R) {
    match list.iter_mut().find(|r| r.id() == record.id()) {
        Some(slot) => *slot = record,
        None => list.push(record),
    }
}
