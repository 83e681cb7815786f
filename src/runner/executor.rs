//! Sequential task execution
//!
//! Tasks run one at a time, in build order. After each task its output and
//! status are recorded into the context so later expressions can read them.

use crate::error::{ExecutionError, ExecutionResult};
use crate::expr::Context;
use crate::runner::command::CommandRunner;
use crate::runner::task::{Outcome, Status, Task};
use std::rc::Rc;
use tracing::{debug, error, info};

/// Result of a whole run
#[derive(Debug, Default)]
pub struct Report {
    pub outcomes: Vec<(String, Outcome)>,
}

impl Report {
    fn count(&self, status: Status) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| o.status() == status)
            .count()
    }

    pub fn done(&self) -> usize {
        self.count(Status::Done)
    }

    pub fn skipped(&self) -> usize {
        self.count(Status::Skipped)
    }

    pub fn failed(&self) -> usize {
        self.count(Status::Failed)
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// Runs built tasks against a live context
pub struct Executor {
    runner: Rc<dyn CommandRunner>,
    dry_run: bool,
    keep_going: bool,
}

impl Executor {
    pub fn new(runner: Rc<dyn CommandRunner>) -> Self {
        Executor {
            runner,
            dry_run: false,
            keep_going: false,
        }
    }

    /// Report what would run without running anything
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Continue with the next task after a failure
    pub fn keep_going(mut self, keep_going: bool) -> Self {
        self.keep_going = keep_going;
        self
    }

    /// Run `tasks` in order, recording each outcome into `ctx`
    pub fn run(&self, tasks: &[Box<dyn Task>], ctx: &mut Context) -> ExecutionResult<Report> {
        if !self.dry_run && tasks.iter().any(|t| t.needs_sudo()) {
            info!("privileged tasks present, authenticating");
            match self.runner.run_interactive("sudo", &["-v".to_string()]) {
                Ok(true) => {}
                Ok(false) => {
                    return Err(ExecutionError::Authentication(
                        "sudo -v was refused".to_string(),
                    ))
                }
                Err(e) => {
                    return Err(ExecutionError::Authentication(format!(
                        "failed to start 'sudo': {}",
                        e
                    )))
                }
            }
        }

        let mut report = Report::default();

        for task in tasks {
            let name = task.name().to_string();
            debug!(task = %name, "running");

            let outcome = if self.dry_run {
                Outcome::skipped("dry run")
            } else {
                task.run(ctx)
            };

            match outcome.status() {
                Status::Failed => error!(
                    task = %name,
                    error = %outcome.error().map(|e| e.to_string()).unwrap_or_default(),
                    "{}",
                    outcome.message()
                ),
                status => info!(task = %name, %status, "{}", outcome.message()),
            }

            ctx.record_task(
                name.clone(),
                serde_yaml::Value::String(outcome.output().to_string()),
                outcome.status(),
            );

            let stop = outcome.status() == Status::Failed && !self.keep_going;
            report.outcomes.push((name, outcome));
            if stop {
                break;
            }
        }

        Ok(report)
    }
}
