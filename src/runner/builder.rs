//! Turning config entries into executable tasks
//!
//! Each entry names an action; the action's factory parses the entry's
//! arguments into zero or more tasks. Entries with a `when:` clause have
//! their tasks wrapped in [`ConditionalTask`] when the builder gates on an
//! [`Evaluator`]. Positions in errors are 1-indexed.

use crate::config::TaskEntry;
use crate::error::{BuildError, BuildResult, FactoryResult};
use crate::runner::conditional::ConditionalTask;
use crate::runner::task::Task;
use crate::runner::when::Evaluator;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Parses an entry's raw arguments into tasks
pub type Factory = Box<dyn Fn(&serde_yaml::Value) -> FactoryResult<Vec<Box<dyn Task>>>>;

/// Action name to factory mapping
#[derive(Default)]
pub struct Registry {
    factories: HashMap<String, Factory>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Register `factory` under `action`, replacing any previous one
    pub fn register<F>(&mut self, action: impl Into<String>, factory: F)
    where
        F: Fn(&serde_yaml::Value) -> FactoryResult<Vec<Box<dyn Task>>> + 'static,
    {
        self.factories.insert(action.into(), Box::new(factory));
    }

    pub fn get(&self, action: &str) -> Option<&Factory> {
        self.factories.get(action)
    }

    pub fn contains(&self, action: &str) -> bool {
        self.factories.contains_key(action)
    }

    /// Registered action names, sorted
    pub fn actions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// How `when:` clauses are treated
#[derive(Debug, Clone)]
pub enum Gating {
    /// Conditions are ignored; every task runs
    Unconditional,
    /// Conditions are checked against this evaluator when tasks run
    Evaluated(Evaluator),
}

/// Builds the ordered task list for a run
pub struct Builder {
    registry: Registry,
    gating: Gating,
}

impl Builder {
    /// A builder that ignores `when:` clauses
    pub fn unconditional(registry: Registry) -> Self {
        Builder {
            registry,
            gating: Gating::Unconditional,
        }
    }

    /// A builder that gates conditioned entries on `evaluator`
    pub fn with_evaluator(registry: Registry, evaluator: Evaluator) -> Self {
        Builder {
            registry,
            gating: Gating::Evaluated(evaluator),
        }
    }

    pub fn gating(&self) -> &Gating {
        &self.gating
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Register an additional action
    pub fn register<F>(&mut self, action: impl Into<String>, factory: F)
    where
        F: Fn(&serde_yaml::Value) -> FactoryResult<Vec<Box<dyn Task>>> + 'static,
    {
        self.registry.register(action, factory);
    }

    /// Build every entry, in order. Any error aborts the whole build.
    pub fn build(&self, entries: &[TaskEntry]) -> BuildResult<Vec<Box<dyn Task>>> {
        let mut tasks = Vec::new();
        for (i, entry) in entries.iter().enumerate() {
            tasks.extend(self.build_entry(i + 1, entry)?);
        }
        Ok(tasks)
    }

    /// Build a single entry found at 1-indexed position `index`
    pub fn build_entry(&self, index: usize, entry: &TaskEntry) -> BuildResult<Vec<Box<dyn Task>>> {
        let factory = self
            .registry
            .get(&entry.action)
            .ok_or_else(|| BuildError::UnknownAction {
                index,
                action: entry.action.clone(),
            })?;

        let tasks = factory(&entry.args).map_err(|source| BuildError::Factory {
            index,
            action: entry.action.clone(),
            source,
        })?;

        for task in &tasks {
            debug!(index, action = %entry.action, task = task.name(), "built task");
        }

        let condition = match &entry.when {
            Some(condition) if !condition.is_empty() => condition,
            _ => return Ok(tasks),
        };

        match &self.gating {
            Gating::Unconditional => {
                warn!(index, action = %entry.action, "ignoring when clause");
                Ok(tasks)
            }
            Gating::Evaluated(evaluator) => Ok(tasks
                .into_iter()
                .map(|task| {
                    Box::new(ConditionalTask::new(
                        task,
                        condition.clone(),
                        evaluator.clone(),
                    )) as Box<dyn Task>
                })
                .collect()),
        }
    }
}
