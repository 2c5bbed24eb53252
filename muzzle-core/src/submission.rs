use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::SETTLE_DELAY_MS;
use crate::engine::GeometryEngine;
use crate::solution::{Solution, SolutionError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Passed,
    Failed,
}

impl Status {
    pub fn from_validity(valid: bool) -> Self {
        if valid { Status::Passed } else { Status::Failed }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Passed => "passed",
            Status::Failed => "failed",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientResult {
    pub status: Status,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedSolution {
    pub content: String,
}

/// What is handed to the grading boundary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub solution: SubmittedSolution,
    pub client_result: ClientResult,
}

impl SubmissionPayload {
    /// Snapshot of the live arrangement. The status is read from the engine
    /// right now, never from an earlier validity notification.
    pub fn capture<E: GeometryEngine>(engine: &E) -> Result<Self, SolutionError> {
        Ok(SubmissionPayload {
            solution: SubmittedSolution {
                content: Solution::from_engine(engine).to_json()?,
            },
            client_result: ClientResult {
                status: Status::from_validity(engine.is_valid()),
            },
        })
    }
}

/// Decides when a solved puzzle is sent on its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubmissionGate {
    auto_submit: bool,
    settle_delay: Duration,
}

impl SubmissionGate {
    pub fn new(auto_submit: bool) -> Self {
        SubmissionGate {
            auto_submit,
            settle_delay: Duration::from_millis(u64::from(SETTLE_DELAY_MS)),
        }
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn auto_submit(&self) -> bool {
        self.auto_submit
    }

    /// Delay after which [`SubmissionGate::settle`] must run, once the puzzle
    /// reported itself valid. `None` when automatic submission is off.
    pub fn on_valid(&self) -> Option<Duration> {
        self.auto_submit.then_some(self.settle_delay)
    }

    /// Re-checks the puzzle once the settle delay elapsed. A puzzle that
    /// stopped being valid in the meantime is not sent.
    pub fn settle<E: GeometryEngine>(
        &self,
        engine: &E,
    ) -> Result<Option<SubmissionPayload>, SolutionError> {
        if !engine.is_valid() {
            tracing::debug!("puzzle no longer valid after settling, not submitting");
            return Ok(None);
        }
        SubmissionPayload::capture(engine).map(Some)
    }
}
