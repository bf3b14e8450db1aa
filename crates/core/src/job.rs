//! Job lifecycle types shared by the store, the worker pool and the API.
//!
//! ```text
//! PENDING -> STARTED -> SUCCESS
//!                    \-> FAILURE
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{JobId, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobState {
    Pending,
    Started,
    Success,
    Failure,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Pending => "PENDING",
            JobState::Started => "STARTED",
            JobState::Success => "SUCCESS",
            JobState::Failure => "FAILURE",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Success | JobState::Failure)
    }

    /// Whether a job in `self` may move to `next`. Each edge is taken at most once.
    pub fn can_transition_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Pending, JobState::Started)
                | (JobState::Started, JobState::Success)
                | (JobState::Started, JobState::Failure)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(JobState::Pending),
            "STARTED" => Ok(JobState::Started),
            "SUCCESS" => Ok(JobState::Success),
            "FAILURE" => Ok(JobState::Failure),
            other => Err(CoreError::Validation(format!("Unknown job state: {other:?}"))),
        }
    }
}

/// The terminal outcome recorded for a job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Success(serde_json::Value),
    Failure(String),
}

impl JobOutcome {
    pub fn state(&self) -> JobState {
        match self {
            JobOutcome::Success(_) => JobState::Success,
            JobOutcome::Failure(_) => JobState::Failure,
        }
    }
}

/// A stored job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    pub id: JobId,
    pub state: JobState,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl JobRecord {
    pub fn pending(id: JobId) -> Self {
        Self {
            id,
            state: JobState::Pending,
            result: None,
            error: None,
            created_at: chrono::Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }
}

/// What a caller sees when polling a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatus {
    pub id: JobId,
    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobStatus {
    /// Status for an id the store has no record of. The store cannot tell
    /// "never existed" from "not started yet", so both read as pending.
    pub fn unknown(id: JobId) -> Self {
        Self {
            id,
            state: JobState::Pending,
            result: None,
            error: None,
        }
    }
}

impl From<JobRecord> for JobStatus {
    fn from(record: JobRecord) -> Self {
        let (result, error) = match record.state {
            JobState::Success => (record.result, None),
            JobState::Failure => (None, record.error),
            _ => (None, None),
        };
        Self {
            id: record.id,
            state: record.state,
            result,
            error,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_forward_edges_are_allowed() {
        use JobState::*;
        assert!(Pending.can_transition_to(Started));
        assert!(Started.can_transition_to(Success));
        assert!(Started.can_transition_to(Failure));

        assert!(!Pending.can_transition_to(Success));
        assert!(!Started.can_transition_to(Started));
        assert!(!Success.can_transition_to(Failure));
        assert!(!Failure.can_transition_to(Started));
    }

    #[test]
    fn state_strings_round_trip() {
        for state in [JobState::Pending, JobState::Started, JobState::Success, JobState::Failure] {
            assert_eq!(state.as_str().parse::<JobState>().unwrap(), state);
            assert_eq!(
                serde_json::to_value(state).unwrap(),
                serde_json::Value::String(state.as_str().to_string())
            );
        }
    }

    #[test]
    fn unknown_status_reads_as_pending() {
        let id = JobId::new_v4();
        let json = serde_json::to_value(JobStatus::unknown(id)).unwrap();
        assert_eq!(json["state"], "PENDING");
        assert!(json.get("result").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn status_exposes_error_only_on_failure() {
        let mut record = JobRecord::pending(JobId::new_v4());
        record.state = JobState::Failure;
        record.error = Some("boom".into());
        record.result = Some(serde_json::json!({"ignored": true}));

        let status = JobStatus::from(record);
        assert_eq!(status.error.as_deref(), Some("boom"));
        assert!(status.result.is_none());
    }
}
