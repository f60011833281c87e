//! JSON bodies exchanged with the scraper backend.

use chrono::NaiveTime;
use control_core::{LogEntry, LogKind, ResultArtifact, StatusReport, TaskStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{BackendError, FailureKind, RemoteFile};

#[derive(Debug, Deserialize)]
pub(crate) struct HealthBody {
    #[serde(default)]
    pub driver_initialized: bool,
}

/// Reply shape shared by the driver, cleanup and task-start endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct AckBody {
    #[serde(default)]
    pub success: bool,
    pub message: Option<String>,
    pub error: Option<String>,
    pub task_id: Option<String>,
}

impl AckBody {
    pub fn accepted(self) -> Result<Self, BackendError> {
        if self.success {
            Ok(self)
        } else {
            let message = self
                .error
                .unwrap_or_else(|| "request rejected by backend".to_string());
            Err(BackendError::new(FailureKind::Rejected, message))
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SearchBody<'a> {
    pub keyword: &'a str,
    pub pages: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct ShopBody<'a> {
    pub shop_id: &'a str,
    pub include_active: bool,
    pub include_soldout: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FilesBody {
    #[serde(default)]
    pub files: Vec<RemoteFile>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusBody {
    pub status: Option<String>,
    #[serde(default)]
    pub logs: Vec<WireLog>,
    pub result: Option<WireResult>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireLog {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireResult {
    pub output_file: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl StatusBody {
    /// Converts a status reply; `received_at` stamps log lines without a usable time.
    pub fn into_report(self, received_at: NaiveTime) -> Result<StatusReport, BackendError> {
        let status = match (self.status.as_deref(), self.error.as_deref()) {
            (Some(raw), _) => TaskStatus::from_wire(raw).ok_or_else(|| {
                BackendError::new(FailureKind::Decode, format!("unknown task status {raw:?}"))
            })?,
            // Unknown or expired task ids come back as a bare error.
            (None, Some(_)) => TaskStatus::Error,
            (None, None) => {
                return Err(BackendError::new(
                    FailureKind::Decode,
                    "status reply without status or error",
                ))
            }
        };

        let logs = self
            .logs
            .into_iter()
            .map(|log| {
                let timestamp = log
                    .time
                    .as_deref()
                    .and_then(|t| NaiveTime::parse_from_str(t, "%H:%M:%S").ok())
                    .unwrap_or(received_at);
                let kind = log.kind.as_deref().map(LogKind::from_wire).unwrap_or_default();
                LogEntry::new(log.message, kind, timestamp)
            })
            .collect();

        Ok(StatusReport {
            status,
            logs,
            result: self.result.and_then(WireResult::into_artifact),
            error: self.error,
        })
    }
}

impl WireResult {
    fn into_artifact(self) -> Option<ResultArtifact> {
        let output_file = self.output_file?;
        let mut details: Vec<(String, String)> = self
            .extra
            .into_iter()
            .filter_map(|(name, value)| display_value(value).map(|v| (name, v)))
            .collect();
        details.sort_by(|a, b| a.0.cmp(&b.0));
        let artifact = details
            .into_iter()
            .fold(ResultArtifact::new(output_file), |artifact, (name, value)| {
                artifact.with_detail(name, value)
            });
        Some(artifact)
    }
}

fn display_value(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn noon() -> NaiveTime {
        NaiveTime::from_hms_opt(12, 0, 0).unwrap()
    }

    #[test]
    fn status_reply_keeps_backend_times_and_details() {
        let body: StatusBody = serde_json::from_str(
            r#"{
                "status": "completed",
                "logs": [
                    {"message": "Analyzing reviews", "type": "info", "time": "09:15:02"},
                    {"message": "no time", "type": "success"}
                ],
                "result": {"output_file": "outputs/analysis_1.csv", "total_products": 3, "avg_rating": 4.5, "keyword": null},
                "error": null
            }"#,
        )
        .unwrap();

        let report = body.into_report(noon()).unwrap();
        assert_eq!(report.status, TaskStatus::Completed);
        assert_eq!(
            report.logs,
            vec![
                LogEntry::info("Analyzing reviews", NaiveTime::from_hms_opt(9, 15, 2).unwrap()),
                LogEntry::success("no time", noon()),
            ]
        );
        let result = report.result.unwrap();
        assert_eq!(result.display_name(), "analysis_1.csv");
        assert_eq!(
            result.details,
            vec![
                ("avg_rating".to_string(), "4.5".to_string()),
                ("total_products".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn bare_error_reads_as_terminal_error() {
        let body: StatusBody = serde_json::from_str(r#"{"error": "Task not found"}"#).unwrap();
        let report = body.into_report(noon()).unwrap();
        assert_eq!(report.status, TaskStatus::Error);
        assert_eq!(report.error.as_deref(), Some("Task not found"));
    }

    #[test]
    fn unknown_status_is_a_decode_error() {
        let body: StatusBody = serde_json::from_str(r#"{"status": "paused"}"#).unwrap();
        let err = body.into_report(noon()).unwrap_err();
        assert_eq!(err.kind, FailureKind::Decode);
    }

    #[test]
    fn rejected_ack_carries_backend_error() {
        let ack: AckBody =
            serde_json::from_str(r#"{"success": false, "error": "Keyword is required"}"#).unwrap();
        let err = ack.accepted().unwrap_err();
        assert_eq!(err.kind, FailureKind::Rejected);
        assert_eq!(err.message, "Keyword is required");
    }
}
