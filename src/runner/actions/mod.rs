//! Built-in actions
//!
//! Each action is a factory turning an entry's `args` into tasks. String
//! arguments are compiled when the task list is built and resolved when the
//! task runs, so they can read the outputs of earlier tasks.

pub mod dir;
pub mod shell;
pub mod symlink;

use crate::error::{ExpressionResult, FactoryError, FactoryResult};
use crate::expr::{Context, Value};
use crate::platform;
use crate::runner::builder::Registry;
use crate::runner::command::CommandRunner;
use serde_yaml::Value as Yaml;
use std::path::PathBuf;
use std::rc::Rc;

/// A registry holding every built-in action
pub fn registry(runner: Rc<dyn CommandRunner>) -> Registry {
    let mut registry = Registry::new();
    registry.register(dir::ACTION, dir::factory);
    registry.register(symlink::ACTION, symlink::factory);
    registry.register(shell::ACTION, move |args: &Yaml| {
        shell::factory(args, &runner)
    });
    registry
}

/// A list argument yields its items; anything else is a single item
fn one_or_many(args: &Yaml) -> Vec<&Yaml> {
    match args {
        Yaml::Sequence(items) => items.iter().collect(),
        other => vec![other],
    }
}

/// Compile a required string argument
fn string_arg(value: &Yaml, what: &str) -> FactoryResult<Value> {
    match value {
        Yaml::String(s) if !s.trim().is_empty() => Ok(Value::parse(s)?),
        Yaml::String(_) => Err(FactoryError::InvalidArgs(format!("{} must not be empty", what))),
        _ => Err(FactoryError::InvalidArgs(format!("{} must be a string", what))),
    }
}

/// Raw text of a compiled string argument, used in task names
fn raw_text(value: &Value) -> String {
    match value.raw() {
        Yaml::String(s) => s.clone(),
        other => crate::expr::format_value(other),
    }
}

/// Resolve a path argument and expand `~` and environment references
fn resolve_path(value: &Value, ctx: &Context) -> ExpressionResult<PathBuf> {
    let resolved = value.resolve_string(ctx)?;
    let expanded = platform::expand_with(&resolved, ctx.home(), |name| {
        ctx.env().get(name).cloned()
    });
    Ok(PathBuf::from(expanded))
}
