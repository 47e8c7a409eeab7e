//! Data source contract and an in-memory store that satisfies it.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::RwLock;
use tracing::debug;

use super::ApiError;
use crate::models::{Assessment, Database, Submission, SubmissionUpdate};

/// Simulated round-trip latency of the in-memory store.
pub const DEFAULT_LATENCY_MS: u64 = 500;

/// Asynchronous record store consumed by the query cache and mutation
/// coordinator. Every failure is reported as an [`ApiError`].
pub trait DataSource: Send + Sync + 'static {
    fn list_assessments(&self) -> impl Future<Output = Result<Vec<Assessment>, ApiError>> + Send;

    fn get_assessment(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Assessment, ApiError>> + Send;

    fn list_submissions(
        &self,
        assessment_id: &str,
    ) -> impl Future<Output = Result<Vec<Submission>, ApiError>> + Send;

    fn update_submission(
        &self,
        id: &str,
        update: &SubmissionUpdate,
    ) -> impl Future<Output = Result<Submission, ApiError>> + Send;
}

/// Record store held entirely in memory, with a fixed simulated latency
/// on every call.
pub struct MemoryStore {
    db: RwLock<Database>,
    latency: Duration,
}

impl MemoryStore {
    pub fn new(db: Database) -> Self {
        Self {
            db: RwLock::new(db),
            latency: Duration::from_millis(DEFAULT_LATENCY_MS),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let db: Database = serde_json::from_str(json).context("Failed to parse database JSON")?;
        Ok(Self::new(db))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read database file: {}", path.display()))?;
        Self::from_json_str(&contents)
            .with_context(|| format!("Failed to load database file: {}", path.display()))
    }

    /// Copy of the current contents, bypassing the simulated latency.
    pub async fn snapshot(&self) -> Database {
        self.db.read().await.clone()
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl DataSource for MemoryStore {
    async fn list_assessments(&self) -> Result<Vec<Assessment>, ApiError> {
        self.delay().await;
        let db = self.db.read().await;
        debug!(count = db.assessments.len(), "Listing assessments");
        Ok(db.assessments.clone())
    }

    async fn get_assessment(&self, id: &str) -> Result<Assessment, ApiError> {
        self.delay().await;
        let db = self.db.read().await;
        db.assessments
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| ApiError::not_found("Assessment", id))
    }

    async fn list_submissions(&self, assessment_id: &str) -> Result<Vec<Submission>, ApiError> {
        self.delay().await;
        let db = self.db.read().await;
        let submissions: Vec<Submission> = db
            .submissions
            .iter()
            .filter(|s| s.assessment_id == assessment_id)
            .cloned()
            .collect();
        debug!(assessment_id, count = submissions.len(), "Listing submissions");
        Ok(submissions)
    }

    async fn update_submission(
        &self,
        id: &str,
        update: &SubmissionUpdate,
    ) -> Result<Submission, ApiError> {
        self.delay().await;
        let mut db = self.db.write().await;
        let submission = db
            .submissions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| ApiError::not_found("Submission", id))?;
        update.apply_to(submission);
        debug!(submission_id = id, status = %submission.status, "Submission updated");
        Ok(submission.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubmissionStatus;

    const SEED: &str = r#"{
        "assessments": [
            { "id": "a1", "areaName": "North", "program": "BSc", "course": "Algorithms",
              "examStatus": "active", "assessmentName": "Midterm",
              "startDate": "2024-05-01", "endDate": "2024-05-02",
              "submissionIds": ["s1", "s2"], "area": "North", "group": "G1",
              "examinee": "Cohort A", "users": [], "version": "v1" }
        ],
        "submissions": [
            { "id": "s1", "assessmentId": "a1", "user": "Ada", "status": "Manual Locked", "timeElapsed": "10" },
            { "id": "s2", "assessmentId": "a1", "user": "Grace", "status": "In Progress" },
            { "id": "s3", "assessmentId": "a2", "user": "Linus", "status": "Completed" }
        ]
    }"#;

    fn store() -> MemoryStore {
        MemoryStore::from_json_str(SEED).unwrap().with_latency(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_list_submissions_by_assessment() {
        let subs = store().list_submissions("a1").await.unwrap();
        let ids: Vec<&str> = subs.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2"]);
    }

    #[tokio::test]
    async fn test_get_assessment_not_found() {
        let err = store().get_assessment("zzz").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_submission_persists() {
        let store = store();
        let update = SubmissionUpdate {
            status: Some(SubmissionStatus::Unlocked),
            time_elapsed: Some(99),
            ..SubmissionUpdate::default()
        };
        let updated = store.update_submission("s1", &update).await.unwrap();
        assert_eq!(updated.status, SubmissionStatus::Unlocked);
        assert_eq!(updated.time_elapsed, "99");
        assert_eq!(updated.user, "Ada");

        let db = store.snapshot().await;
        assert_eq!(db.submissions[0], updated);
    }

    #[tokio::test]
    async fn test_update_missing_submission() {
        let err = store()
            .update_submission("nope", &SubmissionUpdate::default())
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::not_found("Submission", "nope"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_simulated() {
        let store = MemoryStore::from_json_str(SEED).unwrap();
        let started = tokio::time::Instant::now();
        store.list_assessments().await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(DEFAULT_LATENCY_MS));
    }

    #[test]
    fn test_from_json_str_rejects_garbage() {
        assert!(MemoryStore::from_json_str("not json").is_err());
    }
}
