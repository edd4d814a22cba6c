//! What running a case produced.

use std::{
    borrow::Cow,
    time::{Duration, Instant},
};

use thiserror::Error;

pub use crate::metadata::NO_REASON_GIVEN;

pub const NOT_YET_IMPLEMENTED: &str = "Not yet implemented";

/// Recorded for a case whose around hooks never let it run.
pub const AROUND_DID_NOT_RUN: &str = "An around hook did not run the case";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Status {
    #[default]
    NotRun,
    Passed,
    Failed,
    Pending,
    Skipped,
}

/// Why a case failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Failure {
    /// The body or a hook returned an error.
    #[error("{0}")]
    Error(String),

    /// The body or a hook panicked.
    #[error("{0}")]
    Panicked(String),

    /// A pending case passed.
    #[error("Expected pending '{reason}' to fail. No error was raised.")]
    PendingPassed { reason: Cow<'static, str> },
}

/// The result of a single case.
///
/// Starts out as [`Status::NotRun`] and is written once, when the case
/// finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct ExecutionResult {
    pub status: Status,
    pub failure: Option<Failure>,
    pub pending_message: Option<Cow<'static, str>>,
    /// The failure a pending case ran into, as expected.
    pub pending_failure: Option<Failure>,
    pub started: Option<Instant>,
    pub run_time: Option<Duration>,
}

impl ExecutionResult {
    pub(crate) fn started_now() -> Self {
        Self {
            started: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub(crate) fn finish(&mut self, status: Status) {
        self.status = status;
        self.run_time = self.started.map(|started| started.elapsed());
    }

    pub fn passed(&self) -> bool {
        self.status == Status::Passed
    }

    pub fn failed(&self) -> bool {
        self.status == Status::Failed
    }

    pub fn pending(&self) -> bool {
        self.status == Status::Pending
    }

    pub fn skipped(&self) -> bool {
        self.status == Status::Skipped
    }

    pub fn ran(&self) -> bool {
        self.status != Status::NotRun
    }

    /// Failed cases are bad, everything else that ran is fine.
    pub fn is_bad(&self) -> bool {
        self.failed()
    }
}
