//! Evaluation context for expressions
//!
//! The context is a snapshot of system facts, user variables and the outputs
//! of tasks that already ran. Derivations (`with_*`) return a new context and
//! leave the receiver untouched; `record_task` is the one in-place mutation,
//! performed by the executor between task runs.

use crate::platform;
use crate::runner::Status;
use serde::Serialize;
use std::collections::HashMap;
use std::env;

/// Output and status of a task that already ran, exposed as `tasks.<name>`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRecord {
    pub output: serde_yaml::Value,
    pub status: Status,
}

/// Data that expressions are evaluated against
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    os: String,
    arch: String,
    home: String,
    profile: String,
    env: HashMap<String, String>,
    vars: HashMap<String, serde_yaml::Value>,
    tasks: HashMap<String, TaskRecord>,
}

impl Context {
    /// Create a context from the running system and the process environment
    pub fn new() -> Self {
        Context {
            os: platform::detect_os(),
            arch: platform::detect_arch().to_string(),
            home: platform::home_dir()
                .map(|h| h.to_string_lossy().into_owned())
                .unwrap_or_default(),
            profile: String::new(),
            env: env::vars().collect(),
            vars: HashMap::new(),
            tasks: HashMap::new(),
        }
    }

    /// Create a context with explicit platform facts and nothing else
    pub fn with_platform(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Context {
            os: os.into(),
            arch: arch.into(),
            ..Context::default()
        }
    }

    /// Derive a context with a different profile
    pub fn with_profile(&self, profile: impl Into<String>) -> Self {
        let mut derived = self.clone();
        derived.profile = profile.into();
        derived
    }

    /// Derive a context with a different set of variables
    pub fn with_vars(&self, vars: HashMap<String, serde_yaml::Value>) -> Self {
        let mut derived = self.clone();
        derived.vars = vars;
        derived
    }

    /// Derive a context whose environment snapshot is overlaid with `overlay`
    pub fn with_env(&self, overlay: HashMap<String, String>) -> Self {
        let mut derived = self.clone();
        derived.env.extend(overlay);
        derived
    }

    /// Record the result of a finished task, in place
    pub fn record_task(
        &mut self,
        name: impl Into<String>,
        output: serde_yaml::Value,
        status: Status,
    ) {
        self.tasks.insert(name.into(), TaskRecord { output, status });
    }

    pub fn os(&self) -> &str {
        &self.os
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    pub fn home(&self) -> &str {
        &self.home
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }

    /// Look up an environment variable, empty when absent
    pub fn env_var(&self, name: &str) -> &str {
        self.env.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn vars(&self) -> &HashMap<String, serde_yaml::Value> {
        &self.vars
    }

    pub fn get_var(&self, name: &str) -> Option<&serde_yaml::Value> {
        self.vars.get(name)
    }

    pub fn tasks(&self) -> &HashMap<String, TaskRecord> {
        &self.tasks
    }

    pub fn task(&self, name: &str) -> Option<&TaskRecord> {
        self.tasks.get(name)
    }
}
