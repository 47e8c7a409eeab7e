//! Typed queries over a [`DataSource`], each cached under a fixed key shape.
//!
//! | Query        | Key                              | Enabled when        |
//! |--------------|----------------------------------|---------------------|
//! | assessments  | `("assessments")`                | always              |
//! | assessment   | `("assessment", id)`             | `id` non-empty      |
//! | submissions  | `("submissions", assessment_id)` | id present, non-empty |

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::query::{QueryCache, QueryKey, QueryState};
use crate::api::{ApiError, DataSource};
use crate::models::{Assessment, Submission};

/// How long fetched data is served without reloading.
/// Monitoring data changes through polling, so five minutes is enough
/// for plain reads.
pub const STALE_TIME: Duration = Duration::from_secs(5 * 60);

pub fn assessments_key() -> QueryKey {
    QueryKey::new("assessments")
}

pub fn assessment_key(id: &str) -> QueryKey {
    QueryKey::new("assessment").with(id)
}

pub fn submissions_key(assessment_id: &str) -> QueryKey {
    QueryKey::new("submissions").with(assessment_id)
}

fn enabled(id: Option<&str>) -> Option<&str> {
    id.filter(|id| !id.is_empty())
}

/// Read access to assessments and submissions through the query cache.
pub struct Queries<S> {
    source: Arc<S>,
    cache: Arc<QueryCache>,
    stale_time: Duration,
}

impl<S: DataSource> Queries<S> {
    pub fn new(source: Arc<S>, cache: Arc<QueryCache>) -> Self {
        Self {
            source,
            cache,
            stale_time: STALE_TIME,
        }
    }

    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub async fn assessments(&self) -> Result<Vec<Assessment>, ApiError> {
        let source = Arc::clone(&self.source);
        self.cache
            .fetch(&assessments_key(), self.stale_time, move || async move {
                source.list_assessments().await
            })
            .await
    }

    /// `Ok(None)` when the query is disabled (empty id).
    pub async fn assessment(&self, id: &str) -> Result<Option<Assessment>, ApiError> {
        let Some(id) = enabled(Some(id)) else {
            debug!("Assessment query disabled: empty id");
            return Ok(None);
        };
        let source = Arc::clone(&self.source);
        let owned_id = id.to_string();
        self.cache
            .fetch(&assessment_key(id), self.stale_time, move || async move {
                source.get_assessment(&owned_id).await
            })
            .await
            .map(Some)
    }

    /// `Ok(None)` when the query is disabled (missing or empty id).
    pub async fn submissions(
        &self,
        assessment_id: Option<&str>,
    ) -> Result<Option<Vec<Submission>>, ApiError> {
        let Some(assessment_id) = enabled(assessment_id) else {
            debug!("Submissions query disabled: no assessment id");
            return Ok(None);
        };
        let source = Arc::clone(&self.source);
        let owned_id = assessment_id.to_string();
        self.cache
            .fetch(
                &submissions_key(assessment_id),
                self.stale_time,
                move || async move { source.list_submissions(&owned_id).await },
            )
            .await
            .map(Some)
    }

    pub fn assessments_state(&self) -> QueryState<Vec<Assessment>> {
        self.cache.state(&assessments_key())
    }

    pub fn assessment_state(&self, id: &str) -> QueryState<Assessment> {
        match enabled(Some(id)) {
            Some(id) => self.cache.state(&assessment_key(id)),
            None => QueryState::default(),
        }
    }

    pub fn submissions_state(&self, assessment_id: Option<&str>) -> QueryState<Vec<Submission>> {
        match enabled(assessment_id) {
            Some(id) => self.cache.state(&submissions_key(id)),
            None => QueryState::default(),
        }
    }
}

/// Keep only the submissions an assessment lists in `submissionIds`,
/// in the order they appear in `submissions`.
pub fn scope_to_assessment(submissions: Vec<Submission>, assessment: &Assessment) -> Vec<Submission> {
    submissions
        .into_iter()
        .filter(|s| assessment.includes_submission(&s.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryStore;
    use crate::models::Database;

    fn store() -> Arc<MemoryStore> {
        let db: Database = serde_json::from_value(serde_json::json!({
            "assessments": [
                { "id": "a1", "areaName": "North", "program": "BSc", "course": "Algorithms",
                  "examStatus": "active", "assessmentName": "Midterm",
                  "startDate": "2024-05-01", "endDate": "2024-05-02",
                  "submissionIds": ["s1"], "area": "North", "group": "G1",
                  "examinee": "Cohort A", "version": "v1" }
            ],
            "submissions": [
                { "id": "s1", "assessmentId": "a1", "status": "In Progress" },
                { "id": "s2", "assessmentId": "a1", "status": "Completed" },
                { "id": "s3", "assessmentId": "a2", "status": "Absent" }
            ]
        }))
        .unwrap();
        Arc::new(MemoryStore::new(db).with_latency(Duration::ZERO))
    }

    fn queries() -> Queries<MemoryStore> {
        Queries::new(store(), Arc::new(QueryCache::new()))
    }

    #[tokio::test]
    async fn test_submissions_query_is_cached_by_assessment() {
        let q = queries();
        let subs = q.submissions(Some("a1")).await.unwrap().unwrap();
        assert_eq!(subs.len(), 2);
        assert_eq!(q.cache().keys_matching(&submissions_key("a1")).len(), 1);
        let state = q.submissions_state(Some("a1"));
        assert_eq!(state.data.map(|d| d.len()), Some(2));
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_disabled_queries_return_none_without_fetching() {
        let q = queries();
        assert_eq!(q.submissions(None).await, Ok(None));
        assert_eq!(q.submissions(Some("")).await, Ok(None));
        assert_eq!(q.assessment("").await, Ok(None));
        assert!(q.cache().is_empty());
        assert_eq!(q.submissions_state(None).data, None);
        assert_eq!(q.submissions_state(None).error, None);
    }

    #[tokio::test]
    async fn test_assessment_not_found_is_surfaced() {
        let q = queries();
        let err = q.assessment("zz").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(q.assessment_state("zz").error, Some(err));
    }

    #[tokio::test]
    async fn test_scope_to_assessment() {
        let q = queries();
        let assessment = q.assessment("a1").await.unwrap().unwrap();
        let subs = q.submissions(Some("a1")).await.unwrap().unwrap();
        let scoped = scope_to_assessment(subs, &assessment);
        let ids: Vec<&str> = scoped.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s1"]);
    }

    #[tokio::test]
    async fn test_assessments_list() {
        let q = queries();
        let list = q.assessments().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(q.assessments_state().data, Some(list));
    }
}
