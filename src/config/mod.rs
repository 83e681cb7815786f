//! Configuration parsing and validation
//!
//! This module handles parsing of bootkit.yml configuration files,
//! validation of their structure and resolution of user variables.

pub mod parse;
pub mod schema;
pub mod types;
pub mod vars;

// Re-export main types
pub use parse::*;
pub use schema::*;
pub use types::*;
pub use vars::*;
