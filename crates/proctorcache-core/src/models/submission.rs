use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Record;

/// Monitoring status of a single examinee's submission.
///
/// The data carries both "Pending" and a lowercase "pending"; the latter is
/// what an unlock resets a submission to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum SubmissionStatus {
    Completed,
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Auto Locked")]
    AutoLocked,
    #[serde(rename = "Manual Locked")]
    ManualLocked,
    Absent,
    #[serde(rename = "Paper Submitted")]
    PaperSubmitted,
    #[serde(rename = "Student Submission")]
    StudentSubmission,
    Rescheduled,
    #[serde(rename = "Cheating Suspected")]
    CheatingSuspected,
    #[default]
    #[serde(rename = "pending")]
    Unlocked,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Completed => "Completed",
            SubmissionStatus::Pending => "Pending",
            SubmissionStatus::InProgress => "In Progress",
            SubmissionStatus::AutoLocked => "Auto Locked",
            SubmissionStatus::ManualLocked => "Manual Locked",
            SubmissionStatus::Absent => "Absent",
            SubmissionStatus::PaperSubmitted => "Paper Submitted",
            SubmissionStatus::StudentSubmission => "Student Submission",
            SubmissionStatus::Rescheduled => "Rescheduled",
            SubmissionStatus::CheatingSuspected => "Cheating Suspected",
            SubmissionStatus::Unlocked => "pending",
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, SubmissionStatus::AutoLocked | SubmissionStatus::ManualLocked)
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum ConnectionLoss {
    Yes,
    #[default]
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum SessionHealth {
    Good,
    Fair,
    Poor,
    #[default]
    #[serde(rename = "Not yet computed")]
    NotYetComputed,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct LogEntry {
    pub timestamp: String,
    pub event: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase", default)]
pub struct Submission {
    pub id: String,
    pub assessment_id: String,
    /// Examinee's full name
    pub user: String,
    pub login_time: String,
    pub started: bool,
    pub question_synced: u32,
    pub time_elapsed: String,
    pub status: SubmissionStatus,
    pub area_name: String,
    pub group_name: String,
    pub version: String,
    pub questions_solved: u32,
    pub time_spent: String,
    pub browser: String,
    pub packages_detected: String,
    pub ips: String,
    pub offline_time: String,
    pub connection_loss: ConnectionLoss,
    pub overall_session_health: SessionHealth,
    pub status_score: u32,
    pub timers_score: u32,
    pub logs_score: u32,
    pub results_score: u32,
    pub logs: Vec<LogEntry>,
    pub action: String,
    pub area: String,
    pub group: String,
    pub examinee: String,
}

impl Record for Submission {
    fn id(&self) -> &str {
        &self.id
    }

    fn field(&self, name: &str) -> Option<Value> {
        let value = match name {
            "id" => Value::from(self.id.as_str()),
            "assessmentId" => Value::from(self.assessment_id.as_str()),
            "user" => Value::from(self.user.as_str()),
            "loginTime" => Value::from(self.login_time.as_str()),
            "started" => Value::from(self.started),
            "questionSynced" => Value::from(self.question_synced),
            "timeElapsed" => Value::from(self.time_elapsed.as_str()),
            "status" => Value::from(self.status.as_str()),
            "areaName" => Value::from(self.area_name.as_str()),
            "groupName" => Value::from(self.group_name.as_str()),
            "version" => Value::from(self.version.as_str()),
            "questionsSolved" => Value::from(self.questions_solved),
            "timeSpent" => Value::from(self.time_spent.as_str()),
            "browser" => Value::from(self.browser.as_str()),
            "packagesDetected" => Value::from(self.packages_detected.as_str()),
            "ips" => Value::from(self.ips.as_str()),
            "offlineTime" => Value::from(self.offline_time.as_str()),
            "connectionLoss" => serde_json::to_value(self.connection_loss).ok()?,
            "overallSessionHealth" => serde_json::to_value(self.overall_session_health).ok()?,
            "statusScore" => Value::from(self.status_score),
            "timersScore" => Value::from(self.timers_score),
            "logsScore" => Value::from(self.logs_score),
            "resultsScore" => Value::from(self.results_score),
            "logs" => serde_json::to_value(&self.logs).ok()?,
            "action" => Value::from(self.action.as_str()),
            "area" => Value::from(self.area.as_str()),
            "group" => Value::from(self.group.as_str()),
            "examinee" => Value::from(self.examinee.as_str()),
            _ => return None,
        };
        Some(value)
    }
}

/// Partial update accepted by the data source.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct SubmissionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_synced: Option<u32>,
    /// Seconds elapsed; stored on the submission as a string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_elapsed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SubmissionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started: Option<bool>,
}

impl SubmissionUpdate {
    pub fn status(status: SubmissionStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.question_synced.is_none()
            && self.time_elapsed.is_none()
            && self.status.is_none()
            && self.started.is_none()
    }

    /// Apply the set fields, leaving every other field untouched.
    pub fn apply_to(&self, submission: &mut Submission) {
        if let Some(synced) = self.question_synced {
            submission.question_synced = synced;
        }
        if let Some(elapsed) = self.time_elapsed {
            submission.time_elapsed = elapsed.to_string();
        }
        if let Some(status) = self.status {
            submission.status = status;
        }
        if let Some(started) = self.started {
            submission.started = started;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldPath;
    use serde_json::json;

    #[test]
    fn test_status_wire_names() {
        let locked: SubmissionStatus = serde_json::from_value(json!("Manual Locked")).unwrap();
        assert_eq!(locked, SubmissionStatus::ManualLocked);
        let lower: SubmissionStatus = serde_json::from_value(json!("pending")).unwrap();
        assert_eq!(lower, SubmissionStatus::Unlocked);
        let upper: SubmissionStatus = serde_json::from_value(json!("Pending")).unwrap();
        assert_eq!(upper, SubmissionStatus::Pending);
        assert_eq!(serde_json::to_value(SubmissionStatus::CheatingSuspected).unwrap(), json!("Cheating Suspected"));
    }

    #[test]
    fn test_deserialize_partial_submission() {
        let s: Submission = serde_json::from_value(json!({
            "id": "s1",
            "assessmentId": "a1",
            "status": "In Progress",
            "connectionLoss": "Yes",
            "overallSessionHealth": "Not yet computed",
            "logs": [{ "timestamp": "2024-05-01T09:01:00Z", "event": "login" }]
        }))
        .unwrap();
        assert_eq!(s.status, SubmissionStatus::InProgress);
        assert_eq!(s.connection_loss, ConnectionLoss::Yes);
        assert_eq!(s.overall_session_health, SessionHealth::NotYetComputed);
        assert_eq!(s.logs.len(), 1);
        assert!(s.user.is_empty());
    }

    #[test]
    fn test_record_fields() {
        let s = Submission {
            id: "s1".to_string(),
            status: SubmissionStatus::ManualLocked,
            question_synced: 7,
            logs: vec![LogEntry {
                timestamp: "t0".to_string(),
                event: "login".to_string(),
            }],
            ..Submission::default()
        };
        assert_eq!(s.get(&FieldPath::parse("status")), Some(json!("Manual Locked")));
        assert_eq!(s.get(&FieldPath::parse("questionSynced")), Some(json!(7)));
        assert_eq!(s.get(&FieldPath::parse("logs.0.event")), Some(json!("login")));
        assert_eq!(s.get(&FieldPath::parse("connectionLoss")), Some(json!("No")));
        assert_eq!(s.get(&FieldPath::parse("unknownField")), None);
    }

    #[test]
    fn test_update_applies_only_set_fields() {
        let mut s = Submission {
            id: "s1".to_string(),
            user: "Ada".to_string(),
            time_elapsed: "10".to_string(),
            ..Submission::default()
        };
        let update = SubmissionUpdate {
            time_elapsed: Some(42),
            status: Some(SubmissionStatus::ManualLocked),
            ..SubmissionUpdate::default()
        };
        update.apply_to(&mut s);
        assert_eq!(s.time_elapsed, "42");
        assert_eq!(s.status, SubmissionStatus::ManualLocked);
        assert_eq!(s.user, "Ada");
        assert!(!s.started);
    }

    #[test]
    fn test_update_serializes_only_set_fields() {
        let update = SubmissionUpdate::status(SubmissionStatus::Unlocked);
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({ "status": "pending" }));
        assert!(SubmissionUpdate::default().is_empty());
        assert!(!update.is_empty());
    }
}
