//! `dir.create`: ensure directories exist

use super::{one_or_many, raw_text, resolve_path, string_arg};
use crate::error::{ExecutionError, FactoryResult};
use crate::expr::{Context, Value};
use crate::runner::task::{timed, Outcome, Task};
use std::fs;

pub const ACTION: &str = "dir.create";

/// Creates a directory and any missing parents
pub struct CreateDir {
    name: String,
    path: Value,
}

impl CreateDir {
    pub fn new(path: Value) -> Self {
        CreateDir {
            name: format!("{} {}", ACTION, raw_text(&path)),
            path,
        }
    }
}

impl Task for CreateDir {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &Context) -> Outcome {
        timed(|| {
            let path = match resolve_path(&self.path, ctx) {
                Ok(path) => path,
                Err(e) => return Outcome::failed("failed to resolve path", e),
            };

            if path.is_dir() {
                return Outcome::skipped("already exists");
            }
            if path.exists() {
                return Outcome::failed(
                    format!("cannot create {}", path.display()),
                    ExecutionError::NotADirectory(path),
                );
            }

            match fs::create_dir_all(&path) {
                Ok(()) => Outcome::done(format!("created {}", path.display())),
                Err(e) => Outcome::failed(format!("cannot create {}", path.display()), e),
            }
        })
    }
}

/// Accepts a path or a list of paths
pub fn factory(args: &serde_yaml::Value) -> FactoryResult<Vec<Box<dyn Task>>> {
    one_or_many(args)
        .into_iter()
        .map(|item| {
            let path = string_arg(item, "path")?;
            Ok(Box::new(CreateDir::new(path)) as Box<dyn Task>)
        })
        .collect()
}
