//! Status snapshot types
//!
//! A [`StatusSnapshot`] is the decoded result of one status query. A new one
//! is produced for every poll and never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::job::JobId;
use crate::dto::job::Argument;

/// Application status at or above which a job has finished
pub const TERMINAL_STATUS: u16 = 90;

/// Envelope status code the service uses for a successful request
pub const SUCCESS_STATUS: u16 = 200;

/// One decoded status observation for a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Status code reported by the response envelope
    pub http_status: u16,
    /// Progress code of the job (`data.status`), 0 when the payload is absent
    pub application_status: u16,
    /// Message reported by the envelope, if any
    pub message: Option<String>,
    pub payload: Option<TaskData>,
    pub received_at: DateTime<Utc>,
}

impl StatusSnapshot {
    /// Builds a snapshot from a decoded envelope, stamping it with the current time
    pub fn new(http_status: u16, message: Option<String>, payload: Option<TaskData>) -> Self {
        let application_status = payload.as_ref().map(|data| data.status).unwrap_or(0);
        Self {
            http_status,
            application_status,
            message,
            payload,
            received_at: Utc::now(),
        }
    }

    /// Whether the service accepted the status request
    pub fn is_accepted(&self) -> bool {
        self.http_status == SUCCESS_STATUS
    }

    /// Whether the job has reached a terminal status
    pub fn is_terminal(&self) -> bool {
        self.is_accepted() && self.application_status >= TERMINAL_STATUS
    }

    /// Resource URLs of works that finished and produced an output
    pub fn outputs(&self) -> Vec<&str> {
        self.payload
            .iter()
            .flat_map(|data| data.works.iter())
            .filter(|work| work.status >= TERMINAL_STATUS)
            .filter_map(|work| work.resource.as_ref())
            .map(|resource| resource.resource.as_str())
            .filter(|url| !url.is_empty())
            .collect()
    }

    /// The prompt the job was submitted with, used as a display title
    pub fn prompt(&self) -> Option<&str> {
        self.payload
            .as_ref()?
            .task
            .as_ref()?
            .task_info
            .arguments
            .first()
            .map(|arg| arg.value.as_str())
    }
}

/// Payload of a status response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskData {
    pub status: u16,
    #[serde(default)]
    pub task: Option<TaskRecord>,
    #[serde(default)]
    pub works: Vec<Work>,
}

/// The task as recorded by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: JobId,
    #[serde(default)]
    pub task_info: TaskInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    #[serde(default)]
    pub arguments: Vec<Argument>,
}

/// A single unit of work (one generated image) inside a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Work {
    #[serde(default)]
    pub work_id: Option<JobId>,
    #[serde(default)]
    pub work_item_id: Option<JobId>,
    pub status: u16,
    #[serde(default)]
    pub resource: Option<Resource>,
}

/// Location of a generated output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub resource: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> TaskData {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn terminal_requires_accepted_envelope() {
        let data = decode(r#"{"status": 99}"#);
        assert!(StatusSnapshot::new(200, None, Some(data.clone())).is_terminal());
        assert!(!StatusSnapshot::new(500, None, Some(data)).is_terminal());
    }

    #[test]
    fn threshold_is_inclusive() {
        assert!(StatusSnapshot::new(200, None, Some(decode(r#"{"status": 90}"#))).is_terminal());
        assert!(!StatusSnapshot::new(200, None, Some(decode(r#"{"status": 89}"#))).is_terminal());
    }

    #[test]
    fn missing_payload_means_status_zero() {
        let snapshot = StatusSnapshot::new(401, Some("login required".into()), None);
        assert_eq!(snapshot.application_status, 0);
        assert!(snapshot.outputs().is_empty());
        assert_eq!(snapshot.prompt(), None);
    }

    #[test]
    fn outputs_only_include_finished_works() {
        let data = decode(
            r#"{
                "status": 95,
                "task": {"id": 123, "taskInfo": {"arguments": [{"name": "prompt", "value": "a red fox"}]}},
                "works": [
                    {"workId": 1, "status": 99, "resource": {"resource": "https://cdn/1.png"}},
                    {"workId": 2, "status": 50, "resource": {"resource": "https://cdn/2.png"}},
                    {"workId": 3, "status": 99, "resource": {"resource": ""}},
                    {"workId": 4, "status": 99}
                ]
            }"#,
        );
        let snapshot = StatusSnapshot::new(200, None, Some(data));
        assert_eq!(snapshot.outputs(), vec!["https://cdn/1.png"]);
        assert_eq!(snapshot.prompt(), Some("a red fox"));
    }
}
