//! CLI interface and argument parsing
//!
//! This module handles command-line interface parsing, terminal output
//! and shell completion.

pub mod app;
pub mod output;

// Re-export main types
pub use app::*;
pub use output::{init_logging, print_report, Verbosity};
