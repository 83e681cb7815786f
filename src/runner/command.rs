//! Process execution
//!
//! Concrete tasks run external programs through [`CommandRunner`] so tests
//! can substitute a recording fake for the real system.

use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command as StdCommand, Stdio};

/// Captured result of a finished process
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
    /// Combined stdout and stderr
    pub output: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs external programs
pub trait CommandRunner {
    /// Run `program` with `args`, capturing its output
    fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput>;

    /// Run `program` attached to the terminal; returns whether it succeeded
    fn run_interactive(&self, program: &str, args: &[String]) -> io::Result<bool>;

    /// Locate an executable on the search path
    fn find_executable(&self, name: &str) -> Option<PathBuf> {
        find_executable(name)
    }
}

/// [`CommandRunner`] backed by `std::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        let output = StdCommand::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CommandOutput {
            code: output.status.code(),
            output: combined,
        })
    }

    fn run_interactive(&self, program: &str, args: &[String]) -> io::Result<bool> {
        let status = StdCommand::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()?;
        Ok(status.success())
    }
}

/// Search `PATH` for an executable named `name`.
///
/// Names containing a path separator are checked as given.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }

    if name.contains(std::path::MAIN_SEPARATOR) {
        let path = PathBuf::from(name);
        return is_executable(&path).then_some(path);
    }

    let search_path = env::var_os("PATH")?;
    env::split_paths(&search_path)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
