use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form JSON object used for options, metadata, claims and payloads.
pub type JsonMap = Map<String, Value>;

/// Fax job state as reported on the wire. The mixed casing is part of the
/// gateway's public contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaxStatus {
    #[serde(rename = "queued")]
    Queued,
    #[serde(rename = "in_progress")]
    InProgress,
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "FAILED")]
    Failed,
    #[serde(rename = "cancelled")]
    Cancelled,
}

impl FaxStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FaxStatus::Queued => "queued",
            FaxStatus::InProgress => "in_progress",
            FaxStatus::Success => "SUCCESS",
            FaxStatus::Failed => "FAILED",
            FaxStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            FaxStatus::Success | FaxStatus::Failed | FaxStatus::Cancelled
        )
    }
}

/// Returned by `FaxPlugin::send_fax` once the backend accepted a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendResult {
    pub job_id: String,
    pub backend: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_sid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
    /// Seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<u64>,
    #[serde(default)]
    pub metadata: JsonMap,
}

impl SendResult {
    pub fn new(job_id: impl Into<String>, backend: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            backend: backend.into(),
            provider_sid: None,
            estimated_cost: None,
            estimated_duration: None,
            metadata: JsonMap::new(),
        }
    }

    pub fn with_provider_sid(mut self, sid: impl Into<String>) -> Self {
        self.provider_sid = Some(sid.into());
        self
    }
}

/// Returned by `FaxPlugin::get_status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResult {
    pub job_id: String,
    pub status: FaxStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<JsonMap>,
}

impl StatusResult {
    pub fn new(job_id: impl Into<String>, status: FaxStatus) -> Self {
        Self {
            job_id: job_id.into(),
            status,
            pages: None,
            duration: None,
            cost: None,
            error: None,
            error_code: None,
            completed_at: None,
            raw_response: None,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    NotInitialized,
    /// The plugin's own probe failed.
    Unhealthy,
}

/// Outcome of `Plugin::health_check`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthState,
    pub plugin: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fax_status_keeps_wire_casing() {
        let encoded = serde_json::to_value([
            FaxStatus::Queued,
            FaxStatus::InProgress,
            FaxStatus::Success,
            FaxStatus::Failed,
            FaxStatus::Cancelled,
        ])
        .unwrap();
        assert_eq!(
            encoded,
            json!(["queued", "in_progress", "SUCCESS", "FAILED", "cancelled"])
        );
        let decoded: FaxStatus = serde_json::from_value(json!("SUCCESS")).unwrap();
        assert_eq!(decoded, FaxStatus::Success);
        assert!(serde_json::from_value::<FaxStatus>(json!("success")).is_err());
    }

    #[test]
    fn terminal_states() {
        assert!(!FaxStatus::Queued.is_terminal());
        assert!(!FaxStatus::InProgress.is_terminal());
        assert!(FaxStatus::Failed.is_terminal());
    }

    #[test]
    fn status_result_omits_unset_fields() {
        let mut status = StatusResult::new("job-1", FaxStatus::Success);
        status.pages = Some(3);
        status.completed_at = "2024-05-01T12:00:00Z".parse().ok();
        assert_eq!(
            status.to_value(),
            json!({
                "job_id": "job-1",
                "status": "SUCCESS",
                "pages": 3,
                "completed_at": "2024-05-01T12:00:00Z"
            })
        );
    }

    #[test]
    fn send_result_carries_provider_sid() {
        let sent = SendResult::new("job-7", "phaxio").with_provider_sid("PX-991");
        assert_eq!(sent.provider_sid.as_deref(), Some("PX-991"));
        assert_eq!(
            serde_json::to_value(&sent).unwrap(),
            json!({"job_id": "job-7", "backend": "phaxio", "provider_sid": "PX-991", "metadata": {}})
        );
    }

    #[test]
    fn health_state_serializes_snake_case() {
        let report = HealthReport {
            status: HealthState::NotInitialized,
            plugin: "my-fax".into(),
            version: "1.0.0".into(),
            error: None,
        };
        assert_eq!(
            serde_json::to_value(report).unwrap(),
            json!({"status": "not_initialized", "plugin": "my-fax", "version": "1.0.0"})
        );
    }
}
