//! Configuration file parsing and discovery

use crate::config::types::Config;
use crate::error::{BootkitError, ConfigError, ConfigResult};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file names to search for
const CONFIG_FILE_NAMES: &[&str] = &["bootkit.yml", "bootkit.yaml"];

/// Find the configuration file by searching current and parent directories
pub fn find_config_file() -> ConfigResult<PathBuf> {
    find_config_file_from(env::current_dir().map_err(|e| {
        ConfigError::Invalid(format!("Failed to get current directory: {}", e))
    })?)
}

/// Find the configuration file starting from a specific directory
pub fn find_config_file_from(start_dir: PathBuf) -> ConfigResult<PathBuf> {
    let mut current_dir = start_dir;
    let mut searched_paths = Vec::new();

    loop {
        for file_name in CONFIG_FILE_NAMES {
            let config_path = current_dir.join(file_name);
            searched_paths.push(config_path.display().to_string());

            if config_path.is_file() {
                return Ok(config_path);
            }
        }

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => return Err(ConfigError::NotFound(searched_paths.join(", "))),
        }
    }
}

/// Parse a configuration file from a path
pub fn parse_config_file(path: &Path) -> Result<Config, BootkitError> {
    let contents = fs::read_to_string(path).map_err(|e| {
        ConfigError::Invalid(format!("Failed to read {}: {}", path.display(), e))
    })?;

    parse_config(&contents)
}

/// Parse configuration from a string
pub fn parse_config(yaml: &str) -> Result<Config, BootkitError> {
    // An empty file is an empty config
    if yaml.trim().is_empty() {
        return Ok(Config::default());
    }
    let config: Config = serde_yaml::from_str(yaml)?;
    Ok(config)
}

/// Parse configuration with automatic file discovery
pub fn parse_config_auto() -> Result<(Config, PathBuf), BootkitError> {
    let config_path = find_config_file()?;
    let config = parse_config_file(&config_path)?;
    Ok((config, config_path))
}

/// Load the config's `env-file`, relative to the directory holding the config.
///
/// Returns an empty map when no env file is configured.
pub fn load_env_file(config: &Config, config_path: &Path) -> ConfigResult<HashMap<String, String>> {
    let env_file = match &config.env_file {
        Some(env_file) => env_file,
        None => return Ok(HashMap::new()),
    };

    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let path = base_dir.join(crate::platform::expand_path(env_file));

    let env_error = |error: String| ConfigError::EnvFile {
        path: path.clone(),
        error,
    };

    dotenvy::from_path_iter(&path)
        .map_err(|e| env_error(e.to_string()))?
        .map(|item| item.map_err(|e| env_error(e.to_string())))
        .collect()
}
