//! Error types for Bootkit

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Bootkit operations
pub type Result<T> = std::result::Result<T, BootkitError>;

/// Main error type for Bootkit
#[derive(Error, Debug)]
pub enum BootkitError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Expression compilation and evaluation errors
    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionError),

    /// Errors turning config entries into tasks
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Task execution errors
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// YAML parsing errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Configuration parsing and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to find config file (searched: {0})")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid variable name '{0}': must match [A-Za-z_][A-Za-z0-9_]*")]
    InvalidVarName(String),

    #[error("Unknown profile '{profile}' (declared: {declared})")]
    UnknownProfile { profile: String, declared: String },

    #[error("Failed to load env file '{path}': {error}")]
    EnvFile { path: PathBuf, error: String },

    #[error("Failed to resolve variable '{name}': {source}")]
    Var {
        name: String,
        #[source]
        source: ExpressionError,
    },
}

/// Expression compilation and evaluation errors
#[derive(Error, Debug)]
pub enum ExpressionError {
    #[error("unterminated expression starting at byte {0}")]
    Unterminated(usize),

    #[error("empty expression")]
    Empty,

    #[error("undefined identifier '{name}' in expression '{expr}'")]
    UndefinedIdentifier { name: String, expr: String },

    #[error("failed to compile expression '{expr}': {message}")]
    Compile { expr: String, message: String },

    #[error("failed to evaluate expression '{expr}': {message}")]
    Evaluation { expr: String, message: String },

    #[error("condition must evaluate to bool, got {0}")]
    ConditionType(String),
}

/// Errors raised while building the task list from config entries
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("task {index}: unknown action \"{action}\"")]
    UnknownAction { index: usize, action: String },

    #[error("task {index} ({action}): {source}")]
    Factory {
        index: usize,
        action: String,
        #[source]
        source: FactoryError,
    },
}

/// Errors a task factory reports for malformed arguments
#[derive(Error, Debug)]
pub enum FactoryError {
    #[error("{0}")]
    InvalidArgs(String),

    #[error(transparent)]
    Expression(#[from] ExpressionError),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Task execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("command exited with code {0}")]
    CommandFailed(i32),

    #[error("command was terminated by a signal")]
    CommandKilled,

    #[error("failed to start '{program}': {error}")]
    Spawn { program: String, error: String },

    #[error("privilege escalation failed: {0}")]
    Authentication(String),

    #[error("'{0}' exists and is not a directory")]
    NotADirectory(PathBuf),

    #[error("'{0}' exists and is not the expected symlink")]
    Conflict(PathBuf),

    #[error("{0} task(s) failed")]
    TasksFailed(usize),
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for expression operations
pub type ExpressionResult<T> = std::result::Result<T, ExpressionError>;

/// Specialized result type for building task lists
pub type BuildResult<T> = std::result::Result<T, BuildError>;

/// Specialized result type for task factories
pub type FactoryResult<T> = std::result::Result<T, FactoryError>;

/// Specialized result type for execution operations
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;
