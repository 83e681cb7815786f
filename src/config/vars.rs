//! Variable resolution
//!
//! Variables are resolved in declaration order. Each one is evaluated against
//! a context holding the variables declared before it, so later values can
//! build on earlier ones.

use crate::config::types::Config;
use crate::error::{ConfigError, ConfigResult};
use crate::expr::{Context, Value};
use serde_yaml::Value as Yaml;
use std::collections::HashMap;

/// Resolve the config's variables against `ctx`.
///
/// `overrides` replace the raw value of a declared variable before it is
/// resolved; overrides naming undeclared variables are appended in order.
pub fn resolve_vars(
    config: &Config,
    overrides: &[(String, String)],
    ctx: &Context,
) -> ConfigResult<HashMap<String, Yaml>> {
    let mut pending: Vec<(String, Yaml)> = config
        .var_names()
        .into_iter()
        .zip(config.vars.values().cloned())
        .collect();

    for (name, raw) in overrides {
        match pending.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = Yaml::String(raw.clone()),
            None => pending.push((name.clone(), Yaml::String(raw.clone()))),
        }
    }

    let mut resolved = HashMap::new();
    for (name, raw) in pending {
        let scope = ctx.with_vars(resolved.clone());
        let value = Value::new(raw)
            .and_then(|value| value.resolve(&scope))
            .map_err(|source| ConfigError::Var {
                name: name.clone(),
                source,
            })?;
        resolved.insert(name, value);
    }

    Ok(resolved)
}

/// Split a `KEY=VALUE` command-line override
pub fn parse_override(s: &str) -> ConfigResult<(String, String)> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(ConfigError::Invalid(format!(
            "Invalid variable override '{}': expected KEY=VALUE",
            s
        ))),
    }
}
