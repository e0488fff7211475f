use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Remote job state as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TailoringState {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Everything needed to start a tailoring job. Immutable once submitted;
/// retained by the poller only to support retry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TailoringRequest {
    pub resume_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_history_id: Option<String>,
    pub job_description: String,
}

/// One status report from the backend. Each poll response replaces the
/// previous status wholesale — fields are never merged across ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TailoringStatus {
    pub status: TailoringState,
    pub progress: u8,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time_remaining: Option<u64>,
}

impl TailoringStatus {
    pub fn pending() -> Self {
        Self {
            status: TailoringState::Pending,
            progress: 0,
            message: "Queued".to_string(),
            estimated_time_remaining: None,
        }
    }

    pub fn processing(progress: u8, message: impl Into<String>) -> Self {
        Self {
            status: TailoringState::Processing,
            progress,
            message: message.into(),
            estimated_time_remaining: None,
        }
    }

    pub fn completed() -> Self {
        Self {
            status: TailoringState::Completed,
            progress: 100,
            message: "Tailoring complete".to_string(),
            estimated_time_remaining: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: TailoringState::Failed,
            progress: 0,
            message: message.into(),
            estimated_time_remaining: None,
        }
    }
}

/// Summary of one produced version, as listed in a job's outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSummary {
    pub version_id: String,
    pub version_number: u32,
    pub created_at: DateTime<Utc>,
    pub changes: u32,
}

/// Final record of a tailoring job, fetched once on terminal success.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TailoringOutcome {
    pub tailoring_id: String,
    pub status: TailoringState,
    pub original_resume_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tailored_resume_id: Option<String>,
    #[serde(default)]
    pub tailored_versions: Vec<VersionSummary>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
