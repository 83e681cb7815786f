//! Common test utilities
#![allow(dead_code)]

use bootkit::runner::{CommandOutput, CommandRunner};
use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a temporary directory with a bootkit.yml file
pub fn create_test_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("bootkit.yml");
    fs::write(&config_path, content).unwrap();
    (temp_dir, config_path)
}

/// Create a test config with an empty subdirectory next to it
pub fn create_test_config_in_subdir(content: &str) -> (TempDir, PathBuf, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("bootkit.yml");
    let sub_dir = temp_dir.path().join("subdir");

    fs::write(&config_path, content).unwrap();
    fs::create_dir(&sub_dir).unwrap();

    (temp_dir, config_path, sub_dir)
}

/// A runner that records every invocation and always succeeds
#[derive(Default)]
pub struct RecordingRunner {
    pub calls: RefCell<Vec<String>>,
}

impl CommandRunner for RecordingRunner {
    fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        let line = format!("{} {}", program, args.join(" "));
        self.calls.borrow_mut().push(line.clone());
        Ok(CommandOutput {
            code: Some(0),
            output: line,
        })
    }

    fn run_interactive(&self, program: &str, args: &[String]) -> io::Result<bool> {
        self.calls
            .borrow_mut()
            .push(format!("{} {}", program, args.join(" ")));
        Ok(true)
    }
}
