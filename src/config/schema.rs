//! Configuration validation
//!
//! This module provides validation logic for configuration files.

use crate::config::types::{Config, TaskEntry};
use crate::error::{ConfigError, ConfigResult};
use regex::Regex;

/// Pattern every variable name must match
const VAR_NAME_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

/// Validate a complete configuration
pub fn validate_config(config: &Config) -> ConfigResult<()> {
    let var_name = Regex::new(VAR_NAME_PATTERN)
        .map_err(|e| ConfigError::Invalid(format!("Bad variable name pattern: {}", e)))?;

    for name in config.var_names() {
        if !var_name.is_match(&name) {
            return Err(ConfigError::InvalidVarName(name));
        }
    }

    if let Some(profile) = &config.profile {
        validate_profile(config, profile)?;
    }

    for (i, entry) in config.tasks.iter().enumerate() {
        validate_entry(config, i + 1, entry)?;
    }

    Ok(())
}

/// Validate a single entry found at 1-indexed position `index`
pub fn validate_entry(config: &Config, index: usize, entry: &TaskEntry) -> ConfigResult<()> {
    if entry.action.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("task {}: missing action", index)));
    }

    if let Some(when) = &entry.when {
        for profile in &when.profile {
            validate_profile(config, profile)?;
        }
    }

    Ok(())
}

/// Check that `profile` is one of the declared profiles.
///
/// Any profile is accepted when none are declared.
pub fn validate_profile(config: &Config, profile: &str) -> ConfigResult<()> {
    if config.profiles.is_empty() || config.profiles.iter().any(|p| p == profile) {
        return Ok(());
    }

    Err(ConfigError::UnknownProfile {
        profile: profile.to_string(),
        declared: config.profiles.join(", "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse::parse_config;

    #[test]
    fn test_validate_valid_config() {
        let config = parse_config(
            r#"
profile: personal
profiles: [personal, work]
vars:
  name: Luke
  _private2: x
tasks:
  - action: dir.create
    when: { profile: [work, personal] }
    args: ~/code
"#,
        )
        .unwrap();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_empty_action() {
        let config = parse_config(
            r#"
tasks:
  - action: dir.create
    args: a
  - action: ""
"#,
        )
        .unwrap();

        let err = validate_config(&config).unwrap_err();
        assert_eq!(err.to_string(), "Invalid configuration: task 2: missing action");
    }

    #[test]
    fn test_validate_var_names() {
        for bad in ["1st", "with-dash", "with space", ""] {
            let mut config = Config::default();
            config
                .vars
                .insert(serde_yaml::Value::from(bad), serde_yaml::Value::from("x"));
            assert!(
                matches!(validate_config(&config), Err(ConfigError::InvalidVarName(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_validate_default_profile() {
        let config = parse_config("profile: home\nprofiles: [personal, work]\n").unwrap();
        let err = validate_config(&config).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown profile 'home' (declared: personal, work)"
        );
    }

    #[test]
    fn test_validate_when_profile() {
        let config = parse_config(
            r#"
profiles: [personal]
tasks:
  - action: dir.create
    when: { profile: work }
    args: a
"#,
        )
        .unwrap();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn test_any_profile_without_declarations() {
        let config = Config::default();
        assert!(validate_profile(&config, "anything").is_ok());
    }
}
