//! Expression engine
//!
//! Parses `${ ... }` expressions embedded in configuration values, evaluates
//! them against a [`Context`] and resolves boolean conditions.

pub mod condition;
pub mod context;
pub mod functions;
pub mod program;
pub mod scan;
pub mod scope;
pub mod syntax;
pub mod value;

// Re-export main types
pub use condition::resolve_condition;
pub use context::{Context, TaskRecord};
pub use program::Program;
pub use value::{format_value, Part, Value};
