//! Condition-gated tasks

use crate::expr::Context;
use crate::runner::task::{Outcome, Task};
use crate::runner::when::{Condition, Evaluator};

/// Wraps a task so it only runs when its OS/profile condition matches.
///
/// A task skipped by its condition is never invoked. Name and privilege
/// requirement are always those of the wrapped task.
pub struct ConditionalTask {
    task: Box<dyn Task>,
    condition: Condition,
    evaluator: Evaluator,
}

impl ConditionalTask {
    pub fn new(task: Box<dyn Task>, condition: Condition, evaluator: Evaluator) -> Self {
        ConditionalTask {
            task,
            condition,
            evaluator,
        }
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    /// Whether the wrapped task would run
    pub fn is_enabled(&self) -> bool {
        self.evaluator.matches(Some(&self.condition))
    }
}

impl Task for ConditionalTask {
    fn name(&self) -> &str {
        self.task.name()
    }

    fn run(&self, ctx: &Context) -> Outcome {
        if !self.is_enabled() {
            return Outcome::skipped(format!(
                "condition not met: {}",
                self.evaluator.failure_reason(Some(&self.condition))
            ));
        }
        self.task.run(ctx)
    }

    fn needs_sudo(&self) -> bool {
        self.task.needs_sudo()
    }
}
