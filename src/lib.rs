//! Bootkit - declarative machine bootstrapping
//!
//! Bootkit reads an ordered task list from a YAML file, gates entries on the
//! host OS and the selected profile, and runs them one by one. Configuration
//! strings may embed `${ ... }` expressions evaluated against system facts,
//! user variables and the outputs of earlier tasks.

// Public modules
pub mod cli;
pub mod config;
pub mod error;
pub mod expr;
pub mod platform;
pub mod runner;

// Re-export commonly used types
pub use error::{BootkitError, Result};

/// Current version of Bootkit
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
