//! Task building and execution
//!
//! This module turns config entries into tasks, gates them on conditions
//! and runs them in order against a live evaluation context.

pub mod actions;
pub mod builder;
pub mod command;
pub mod conditional;
pub mod executor;
pub mod task;
pub mod when;

// Re-export main types
pub use builder::{Builder, Factory, Gating, Registry};
pub use command::{CommandOutput, CommandRunner, SystemRunner};
pub use conditional::ConditionalTask;
pub use executor::{Executor, Report};
pub use task::{timed, Outcome, Status, Task};
pub use when::{Condition, Evaluator};
