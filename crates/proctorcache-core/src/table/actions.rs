//! Per-row action resolution and dispatch.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{value_to_string, Record, SubmissionStatus};

/// One user-selectable action for a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ActionOption {
    pub label: String,
    pub value: String,
}

impl ActionOption {
    fn of(action: RowAction) -> Self {
        Self {
            label: action.label().to_string(),
            value: action.value().to_string(),
        }
    }
}

/// Actions the monitoring views know how to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Unlock,
    Sync,
    DownloadLogs,
}

impl RowAction {
    pub fn value(&self) -> &'static str {
        match self {
            RowAction::Unlock => "unlock",
            RowAction::Sync => "sync",
            RowAction::DownloadLogs => "download",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RowAction::Unlock => "Unlock",
            RowAction::Sync => "Sync",
            RowAction::DownloadLogs => "Download Logs",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unlock" => Some(RowAction::Unlock),
            "sync" => Some(RowAction::Sync),
            "download" => Some(RowAction::DownloadLogs),
            _ => None,
        }
    }
}

/// Actions permitted for a record, derived from its `status` field alone.
///
/// A manually locked record can only be unlocked; every other record can be
/// synced or have its logs downloaded.
pub fn resolve<R: Record>(record: &R) -> Vec<ActionOption> {
    let status = value_to_string(record.field("status").as_ref());
    if status.as_deref() == Some(SubmissionStatus::ManualLocked.as_str()) {
        vec![ActionOption::of(RowAction::Unlock)]
    } else {
        vec![
            ActionOption::of(RowAction::Sync),
            ActionOption::of(RowAction::DownloadLogs),
        ]
    }
}

/// Caller-supplied reactions to a dispatched action.
pub trait ActionHandler<R> {
    fn unlock(&mut self, record: &R);

    fn sync(&mut self, record: &R) {
        let _ = record;
        self.notify("Syncing logs".to_string());
    }

    fn download_logs(&mut self, record: &R) {
        let _ = record;
        self.notify("Downloading logs".to_string());
    }

    /// Transient user-visible message.
    fn notify(&mut self, message: String);
}

/// Route an action value to the handler. Unknown values never fail; they
/// produce a generic notification instead.
pub fn dispatch<R: Record, H: ActionHandler<R>>(action: &str, record: &R, handler: &mut H) {
    debug!(action, record_id = record.id(), "Dispatching row action");
    match RowAction::parse(action) {
        Some(RowAction::Unlock) => handler.unlock(record),
        Some(RowAction::Sync) => handler.sync(record),
        Some(RowAction::DownloadLogs) => handler.download_logs(record),
        None => handler.notify(format!("Performing action: {}", action)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[derive(Default)]
    struct Recorder {
        unlocked: Vec<String>,
        messages: Vec<String>,
    }

    impl ActionHandler<Value> for Recorder {
        fn unlock(&mut self, record: &Value) {
            self.unlocked.push(Record::id(record).to_string());
        }

        fn notify(&mut self, message: String) {
            self.messages.push(message);
        }
    }

    #[test]
    fn test_manual_locked_yields_only_unlock() {
        let record = json!({ "id": "s1", "status": "Manual Locked" });
        assert_eq!(
            resolve(&record),
            vec![ActionOption {
                label: "Unlock".to_string(),
                value: "unlock".to_string()
            }]
        );
    }

    #[test]
    fn test_other_statuses_yield_sync_and_download() {
        for status in [json!("pending"), json!("Auto Locked"), json!(null)] {
            let record = json!({ "id": "s1", "status": status });
            let values: Vec<String> = resolve(&record).into_iter().map(|a| a.value).collect();
            assert_eq!(values, vec!["sync", "download"]);
        }
        let no_status = json!({ "id": "s2" });
        assert_eq!(resolve(&no_status).len(), 2);
    }

    #[test]
    fn test_resolve_does_not_mutate() {
        let record = json!({ "id": "s1", "status": "Manual Locked" });
        let before = record.clone();
        let _ = resolve(&record);
        assert_eq!(record, before);
    }

    #[test]
    fn test_dispatch_routes_known_actions() {
        let record = json!({ "id": "s1", "status": "Manual Locked" });
        let mut handler = Recorder::default();
        dispatch("unlock", &record, &mut handler);
        dispatch("sync", &record, &mut handler);
        dispatch("download", &record, &mut handler);
        assert_eq!(handler.unlocked, vec!["s1"]);
        assert_eq!(handler.messages, vec!["Syncing logs", "Downloading logs"]);
    }

    #[test]
    fn test_dispatch_unknown_action_notifies() {
        let record = json!({ "id": "s1" });
        let mut handler = Recorder::default();
        dispatch("archive", &record, &mut handler);
        assert!(handler.unlocked.is_empty());
        assert_eq!(handler.messages, vec!["Performing action: archive"]);
    }
}
