// crates/types/src/job.rs
//! Types for the background job API.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a background job.
///
/// The server owns the status vocabulary; anything this client does not
/// recognize deserializes as [`JobStatus::Unknown`] and is passed through
/// for display untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    /// Accepted and handed to the queue backend, not yet picked up.
    Enqueued,
    Running,
    Finished,
    Failed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Whether the job can no longer transition. Terminal jobs must not be
    /// offered a cancel action.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Enqueued => "enqueued",
            JobStatus::Running => "running",
            JobStatus::Finished => "finished",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the job collection listing (subset of the detail fields).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: u64,
    pub status: JobStatus,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Full job detail as returned by the single-job endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: u64,
    pub status: JobStatus,
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub finished_at: Option<String>,
    /// Accumulating run output; absent until the worker produces some.
    #[serde(default)]
    pub output: Option<String>,
}

/// Body for `POST /jobs`.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitRequest {
    pub language: String,
    pub payload: serde_json::Value,
}

// ── Wire envelopes ──────────────────────────────────────────────────────

/// `GET /jobs` response.
#[derive(Debug, Clone, Deserialize)]
pub struct JobsEnvelope {
    #[serde(default)]
    pub jobs: Vec<JobSummary>,
}

/// `GET /jobs/{id}` response.
#[derive(Debug, Clone, Deserialize)]
pub struct JobEnvelope {
    pub job: Job,
}

/// `POST /jobs` acknowledgement.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAck {
    pub ok: bool,
    #[serde(default)]
    pub job_id: Option<u64>,
    #[serde(default)]
    pub status: Option<JobStatus>,
}

/// `POST /jobs/{id}/cancel` acknowledgement.
#[derive(Debug, Clone, Deserialize)]
pub struct CancelAck {
    pub ok: bool,
    #[serde(default)]
    pub cancelled: bool,
}
