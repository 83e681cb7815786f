//! `symlink.create`: ensure a symlink points at its source

use super::{one_or_many, raw_text, resolve_path, string_arg};
use crate::error::{ExecutionError, FactoryResult};
use crate::expr::{Context, Value};
use crate::runner::task::{timed, Outcome, Task};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::Path;

pub const ACTION: &str = "symlink.create";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LinkArgs {
    source: serde_yaml::Value,
    target: serde_yaml::Value,
    #[serde(default)]
    force: bool,
}

/// Links `target` to `source`
pub struct CreateSymlink {
    name: String,
    source: Value,
    target: Value,
    force: bool,
}

impl CreateSymlink {
    pub fn new(source: Value, target: Value, force: bool) -> Self {
        CreateSymlink {
            name: format!("{} {}", ACTION, raw_text(&target)),
            source,
            target,
            force,
        }
    }
}

impl Task for CreateSymlink {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &Context) -> Outcome {
        timed(|| {
            let (source, target) = match resolve_path(&self.source, ctx)
                .and_then(|s| resolve_path(&self.target, ctx).map(|t| (s, t)))
            {
                Ok(paths) => paths,
                Err(e) => return Outcome::failed("failed to resolve paths", e),
            };

            if let Ok(meta) = fs::symlink_metadata(&target) {
                let linked = meta.file_type().is_symlink()
                    && fs::read_link(&target).map(|dest| dest == source).unwrap_or(false);
                if linked {
                    return Outcome::skipped("already linked");
                }
                if !self.force {
                    return Outcome::failed(
                        format!("cannot link {}", target.display()),
                        ExecutionError::Conflict(target),
                    );
                }
                let removed = if meta.is_dir() {
                    fs::remove_dir_all(&target)
                } else {
                    fs::remove_file(&target)
                };
                if let Err(e) = removed {
                    return Outcome::failed(format!("cannot replace {}", target.display()), e);
                }
            }

            if let Some(parent) = target.parent() {
                if let Err(e) = fs::create_dir_all(parent) {
                    return Outcome::failed(format!("cannot create {}", parent.display()), e);
                }
            }

            match symlink(&source, &target) {
                Ok(()) => Outcome::done(format!(
                    "linked {} -> {}",
                    target.display(),
                    source.display()
                )),
                Err(e) => Outcome::failed(format!("cannot link {}", target.display()), e),
            }
        })
    }
}

#[cfg(unix)]
fn symlink(source: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, target)
}

#[cfg(not(unix))]
fn symlink(_source: &Path, _target: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symlinks are only supported on unix",
    ))
}

/// Accepts `{source, target, force?}` or a list of them
pub fn factory(args: &serde_yaml::Value) -> FactoryResult<Vec<Box<dyn Task>>> {
    one_or_many(args)
        .into_iter()
        .map(|item| {
            let link: LinkArgs = serde_yaml::from_value(item.clone())?;
            let source = string_arg(&link.source, "source")?;
            let target = string_arg(&link.target, "target")?;
            Ok(Box::new(CreateSymlink::new(source, target, link.force)) as Box<dyn Task>)
        })
        .collect()
}
