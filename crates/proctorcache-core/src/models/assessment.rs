use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum ExamStatus {
    Active,
    Completed,
    Pending,
}

impl ExamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamStatus::Active => "active",
            ExamStatus::Completed => "completed",
            ExamStatus::Pending => "pending",
        }
    }

    /// Label shown in the exam status filter.
    pub fn display_name(&self) -> &'static str {
        match self {
            ExamStatus::Active => "Ongoing",
            ExamStatus::Completed => "Completed",
            ExamStatus::Pending => "Pending",
        }
    }
}

impl std::fmt::Display for ExamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub username: String,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: String,
    pub area_name: String,
    pub program: String,
    pub course: String,
    pub exam_status: ExamStatus,
    pub assessment_name: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub submission_ids: Vec<String>,
    pub area: String,
    pub group: String,
    pub examinee: String,
    #[serde(default)]
    pub users: Vec<User>,
    pub version: String,
}

impl Assessment {
    pub fn submission_count(&self) -> usize {
        self.submission_ids.len()
    }

    pub fn includes_submission(&self, submission_id: &str) -> bool {
        self.submission_ids.iter().any(|id| id == submission_id)
    }
}

impl Record for Assessment {
    fn id(&self) -> &str {
        &self.id
    }

    fn field(&self, name: &str) -> Option<Value> {
        let value = match name {
            "id" => Value::from(self.id.as_str()),
            "areaName" => Value::from(self.area_name.as_str()),
            "program" => Value::from(self.program.as_str()),
            "course" => Value::from(self.course.as_str()),
            "examStatus" => Value::from(self.exam_status.as_str()),
            "assessmentName" => Value::from(self.assessment_name.as_str()),
            "startDate" => Value::from(self.start_date.as_str()),
            "endDate" => Value::from(self.end_date.as_str()),
            "submissionIds" => Value::from(self.submission_ids.clone()),
            "area" => Value::from(self.area.as_str()),
            "group" => Value::from(self.group.as_str()),
            "examinee" => Value::from(self.examinee.as_str()),
            "users" => serde_json::to_value(&self.users).ok()?,
            "version" => Value::from(self.version.as_str()),
            _ => return None,
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldPath;
    use serde_json::json;

    fn sample() -> Assessment {
        serde_json::from_value(json!({
            "id": "a1",
            "areaName": "North",
            "program": "BSc",
            "course": "Algorithms",
            "examStatus": "active",
            "assessmentName": "Midterm",
            "startDate": "2024-05-01T09:00:00Z",
            "endDate": "2024-05-01T11:00:00Z",
            "submissionIds": ["s1", "s2"],
            "area": "North",
            "group": "G1",
            "examinee": "Cohort A",
            "users": [{ "userId": "u1", "username": "ada", "fullName": "Ada Lovelace" }],
            "version": "v1"
        }))
        .expect("valid assessment")
    }

    #[test]
    fn test_deserialize_camel_case() {
        let a = sample();
        assert_eq!(a.exam_status, ExamStatus::Active);
        assert_eq!(a.submission_count(), 2);
        assert!(a.includes_submission("s2"));
        assert!(!a.includes_submission("s3"));
    }

    #[test]
    fn test_record_fields() {
        let a = sample();
        assert_eq!(a.get(&FieldPath::parse("examStatus")), Some(json!("active")));
        assert_eq!(a.get(&FieldPath::parse("users.0.fullName")), Some(json!("Ada Lovelace")));
        assert_eq!(a.get(&FieldPath::parse("submissionIds.1")), Some(json!("s2")));
        assert_eq!(a.get(&FieldPath::parse("nope")), None);
    }
}
