use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::engine::{EngineOutcome, StepStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Finished,
    FinishedWithErrors,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Finished => "finished",
            JobStatus::FinishedWithErrors => "finished_with_errors",
        }
    }
}

/// Outcome snapshot of a job that reached its terminal state.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct JobResult {
    pub nr_errors: u64,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub steps: Vec<StepStatus>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

impl JobResult {
    pub(crate) fn from_outcome(
        outcome: EngineOutcome,
        started_at: DateTime<Utc>,
        elapsed: Duration,
    ) -> Self {
        let status = if outcome.nr_errors == 0 {
            JobStatus::Finished
        } else {
            JobStatus::FinishedWithErrors
        };
        Self {
            nr_errors: outcome.nr_errors,
            status,
            exit_code: outcome.exit_code,
            steps: outcome.steps,
            started_at,
            finished_at: Utc::now(),
            elapsed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.nr_errors == 0
    }

    pub fn lines_input(&self) -> u64 {
        self.steps.iter().map(|s| s.lines_input).sum()
    }

    pub fn lines_output(&self) -> u64 {
        self.steps.iter().map(|s| s.lines_output).sum()
    }

    pub fn lines_read(&self) -> u64 {
        self.steps.iter().map(|s| s.lines_read).sum()
    }

    pub fn lines_written(&self) -> u64 {
        self.steps.iter().map(|s| s.lines_written).sum()
    }

    pub fn lines_updated(&self) -> u64 {
        self.steps.iter().map(|s| s.lines_updated).sum()
    }
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}
