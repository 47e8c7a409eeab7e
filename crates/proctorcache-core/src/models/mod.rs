//! Data models for exam monitoring.
//!
//! - `Assessment`, `User`: scheduled exams and their participants
//! - `Submission`, `SubmissionUpdate`: per-examinee monitoring state
//! - `Record`, `FieldPath`: generic field access used by the table engine

pub mod assessment;
pub mod record;
pub mod submission;

pub use assessment::{Assessment, ExamStatus, User};
pub use record::{value_to_string, FieldPath, Record};
pub use submission::{
    ConnectionLoss, LogEntry, SessionHealth, Submission, SubmissionStatus, SubmissionUpdate,
};

/// Full contents of the record store.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Database {
    #[serde(default)]
    pub assessments: Vec<Assessment>,
    #[serde(default)]
    pub submissions: Vec<Submission>,
}
