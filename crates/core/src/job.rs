//! Job lifecycle record and state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::JobKey;

/// Lifecycle state of a job.
///
/// Transitions are monotonic: `Pending → {Completed, Failed} → Deleted`.
/// Nothing ever reverts to `Pending`, and `Deleted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Submitted; the transform has not reported back yet.
    Pending,
    /// Transform succeeded and a result reference was recorded.
    Completed,
    /// Transform reported a failure.
    Failed,
    /// Retention window elapsed; artifacts are gone.
    Deleted,
}

impl JobState {
    /// True once a terminal callback or a purge has been applied.
    pub fn is_finalized(&self) -> bool {
        !matches!(self, JobState::Pending)
    }
}

/// Terminal outcome reported by the transform service via webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOutcome {
    Succeeded { result_ref: String },
    Failed { error: String },
}

/// Acknowledgment for a terminal callback.
///
/// `AlreadyFinalized` is a success, not an error: the transform service
/// delivers at least once, so a duplicate callback must be swallowed as a
/// no-op rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAck {
    /// The callback transitioned the job out of `Pending`.
    Applied,
    /// The job was already finalized; nothing changed.
    AlreadyFinalized,
}

/// One submission's lifecycle record, keyed by an opaque identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub key: JobKey,
    pub state: JobState,
    /// Blob path holding the uploaded source image.
    pub source_ref: String,
    /// Reference to the produced artifact; set only on `Completed`.
    pub result_ref: Option<String>,
    /// Error summary; set only on `Failed`.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a fresh `Pending` record.
    pub fn new(key: JobKey, source_ref: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            key,
            state: JobState::Pending,
            source_ref: source_ref.into(),
            result_ref: None,
            error: None,
            created_at,
            updated_at: created_at,
        }
    }

    /// Apply a terminal callback from the transform service.
    ///
    /// This is the webhook receiver's decision logic, kept pure so the
    /// at-least-once tolerance is testable without a network: only a
    /// `Pending` job transitions; any other state is a no-op acknowledged
    /// as `AlreadyFinalized`.
    pub fn apply_callback(&mut self, outcome: &TransformOutcome, at: DateTime<Utc>) -> CallbackAck {
        if self.state.is_finalized() {
            return CallbackAck::AlreadyFinalized;
        }

        match outcome {
            TransformOutcome::Succeeded { result_ref } => {
                self.state = JobState::Completed;
                self.result_ref = Some(result_ref.clone());
            }
            TransformOutcome::Failed { error } => {
                self.state = JobState::Failed;
                self.error = Some(error.clone());
            }
        }
        self.updated_at = at;
        CallbackAck::Applied
    }

    /// Transition to `Deleted`.
    ///
    /// Safe in any state (the purge waits out the retention delay, not the
    /// transform). Idempotent: returns `false` when already deleted.
    pub fn mark_deleted(&mut self, at: DateTime<Utc>) -> bool {
        if self.state == JobState::Deleted {
            return false;
        }
        self.state = JobState::Deleted;
        self.updated_at = at;
        true
    }

    /// Snapshot for the result-lookup boundary.
    pub fn status_view(&self) -> JobStatusView {
        JobStatusView {
            key: self.key,
            state: self.state,
            result_ref: self.result_ref.clone(),
            error: self.error.clone(),
            expired: self.state == JobState::Deleted,
        }
    }
}

/// Serializable view of a job's externally-visible state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusView {
    pub key: JobKey,
    pub state: JobState,
    pub result_ref: Option<String>,
    pub error: Option<String>,
    /// Explicit signal that the retention window elapsed; pollers can stop.
    pub expired: bool,
}
