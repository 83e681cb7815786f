//! Core configuration types
//!
//! This module defines the data structures that represent a bootkit.yml configuration file.

use crate::runner::Condition;
use serde::{Deserialize, Serialize};

/// Top-level configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Profile used when none is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// Allowed profiles; empty means any profile is accepted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<String>,

    /// Dotenv file overlaid on the environment snapshot
    #[serde(
        default,
        rename = "env-file",
        skip_serializing_if = "Option::is_none"
    )]
    pub env_file: Option<String>,

    /// User variables, in declaration order
    #[serde(default, skip_serializing_if = "serde_yaml::Mapping::is_empty")]
    pub vars: serde_yaml::Mapping,

    /// Entries to build tasks from, in execution order
    #[serde(default)]
    pub tasks: Vec<TaskEntry>,
}

/// One entry of the `tasks` list
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TaskEntry {
    /// Registered action name (e.g. `dir.create`)
    pub action: String,

    /// Arguments handed to the action's factory as-is
    #[serde(default, skip_serializing_if = "serde_yaml::Value::is_null")]
    pub args: serde_yaml::Value,

    /// OS/profile gate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<Condition>,
}

impl Config {
    /// Names of the declared variables, in declaration order
    pub fn var_names(&self) -> Vec<String> {
        self.vars
            .keys()
            .map(|k| match k {
                serde_yaml::Value::String(s) => s.clone(),
                other => crate::expr::format_value(other),
            })
            .collect()
    }
}
