//! Task contract and task outcomes
//!
//! Every executable action implements [`Task`]. Running a task never returns
//! an error: failures are data, carried in an [`Outcome`] with
//! [`Status::Failed`].

use crate::expr::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Lifecycle of a task.
///
/// `Pending` and `Running` are bookkeeping states; running a task only ever
/// produces `Skipped`, `Done` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Running,
    Skipped,
    Done,
    Failed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Running => "running",
            Status::Skipped => "skipped",
            Status::Done => "done",
            Status::Failed => "failed",
        }
    }

    /// Whether this is a final state of a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Skipped | Status::Done | Status::Failed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened when a task ran
#[derive(Debug)]
pub struct Outcome {
    status: Status,
    message: String,
    output: String,
    error: Option<anyhow::Error>,
    duration: Duration,
}

impl Outcome {
    /// The task changed the system as requested
    pub fn done(message: impl Into<String>) -> Self {
        Self::new(Status::Done, message.into(), None)
    }

    /// Nothing to do: already in the desired state, or gated off
    pub fn skipped(message: impl Into<String>) -> Self {
        Self::new(Status::Skipped, message.into(), None)
    }

    /// The task failed with `error`
    pub fn failed(message: impl Into<String>, error: impl Into<anyhow::Error>) -> Self {
        Self::new(Status::Failed, message.into(), Some(error.into()))
    }

    fn new(status: Status, message: String, error: Option<anyhow::Error>) -> Self {
        Outcome {
            status,
            message,
            output: String::new(),
            error,
            duration: Duration::ZERO,
        }
    }

    /// Attach captured process output
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    /// Present exactly when the status is `Failed`
    pub fn error(&self) -> Option<&anyhow::Error> {
        self.error.as_ref()
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

/// A named, idempotent unit of work
pub trait Task {
    /// Identifier used in logs and as the key under `tasks.<name>`
    fn name(&self) -> &str;

    /// Bring the system into the desired state
    fn run(&self, ctx: &Context) -> Outcome;

    /// Whether the task needs elevated privileges
    fn needs_sudo(&self) -> bool {
        false
    }
}

/// Run `f` and stamp the elapsed time on its outcome
pub fn timed<F>(f: F) -> Outcome
where
    F: FnOnce() -> Outcome,
{
    let started = Instant::now();
    let outcome = f();
    outcome.with_duration(started.elapsed())
}
