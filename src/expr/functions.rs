//! Builtin functions available inside expressions
//!
//! Arguments may themselves be expressions, so arity and argument types are
//! checked when the function is called.

use crate::expr::syntax::CONTAINS;
use crate::expr::value::format_value;
use crate::platform;
use crate::runner::command::find_executable;
use mlua::prelude::*;
use std::collections::HashMap;
use std::path::Path;

/// Names of all builtin functions
pub const BUILTINS: &[&str] = &[
    "exists",
    "which",
    "installed",
    "default",
    "expand",
    "hasSubstr",
    "join",
];

/// Home and environment of the context being evaluated, kept as Lua app data
#[derive(Debug, Clone, Default)]
pub struct PathEnv {
    pub home: String,
    pub env: HashMap<String, String>,
}

impl PathEnv {
    pub fn expand(&self, path: &str) -> String {
        platform::expand_with(path, &self.home, |name| self.env.get(name).cloned())
    }
}

/// Expand against the bound context, or the process environment when none is bound
fn expand(lua: &Lua, path: &str) -> String {
    match lua.app_data_ref::<PathEnv>() {
        Some(env) => env.expand(path),
        None => platform::expand_path(path),
    }
}

/// Register every builtin as a global of `lua`
pub fn register(lua: &Lua) -> LuaResult<()> {
    let globals = lua.globals();

    globals.set(
        "exists",
        lua.create_function(|lua, args: LuaMultiValue| {
            let [path] = take_args::<1>("exists", args)?;
            let path = string_arg("exists", 1, &path)?;
            Ok(Path::new(&expand(lua, &path)).exists())
        })?,
    )?;

    globals.set(
        "which",
        lua.create_function(|_, args: LuaMultiValue| {
            let [name] = take_args::<1>("which", args)?;
            let name = string_arg("which", 1, &name)?;
            Ok(find_executable(&name)
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default())
        })?,
    )?;

    globals.set(
        "installed",
        lua.create_function(|_, args: LuaMultiValue| {
            let [name] = take_args::<1>("installed", args)?;
            let name = string_arg("installed", 1, &name)?;
            Ok(find_executable(&name).is_some())
        })?,
    )?;

    globals.set(
        "default",
        lua.create_function(|_, args: LuaMultiValue| {
            let [value, fallback] = take_args::<2>("default", args)?;
            let missing = match &value {
                LuaValue::Nil => true,
                LuaValue::String(s) => s.as_bytes().is_empty(),
                _ => false,
            };
            Ok(if missing { fallback } else { value })
        })?,
    )?;

    globals.set(
        "expand",
        lua.create_function(|lua, args: LuaMultiValue| {
            let [path] = take_args::<1>("expand", args)?;
            let path = string_arg("expand", 1, &path)?;
            Ok(expand(lua, &path))
        })?,
    )?;

    globals.set(
        "hasSubstr",
        lua.create_function(|_, args: LuaMultiValue| {
            let [haystack, needle] = take_args::<2>("hasSubstr", args)?;
            let haystack = string_arg("hasSubstr", 1, &haystack)?;
            let needle = string_arg("hasSubstr", 2, &needle)?;
            Ok(haystack.contains(&needle))
        })?,
    )?;

    globals.set(
        "join",
        lua.create_function(|lua, args: LuaMultiValue| {
            let [list, sep] = take_args::<2>("join", args)?;
            let list = match list {
                LuaValue::Table(t) => t,
                other => {
                    return Err(LuaError::runtime(format!(
                        "join(): argument 1 must be a list, got {}",
                        other.type_name()
                    )))
                }
            };
            let sep = string_arg("join", 2, &sep)?;

            let mut parts = Vec::new();
            for item in list.sequence_values::<LuaValue>() {
                let item: serde_yaml::Value = lua.from_value(item?)?;
                parts.push(format_value(&item));
            }
            Ok(parts.join(&sep))
        })?,
    )?;

    globals.set(
        CONTAINS,
        lua.create_function(|_, (needle, haystack): (LuaValue, LuaValue)| contains(needle, haystack))?,
    )?;

    Ok(())
}

/// `needle in haystack`: element of a list, otherwise key of a map
fn contains(needle: LuaValue, haystack: LuaValue) -> LuaResult<bool> {
    let table = match haystack {
        LuaValue::Table(t) => t,
        other => {
            return Err(LuaError::runtime(format!(
                "'in' needs a list or map on the right, got {}",
                other.type_name()
            )))
        }
    };

    if table.raw_len() > 0 {
        for item in table.sequence_values::<LuaValue>() {
            if item? == needle {
                return Ok(true);
            }
        }
        return Ok(false);
    }
    if needle.is_nil() {
        return Ok(false);
    }
    Ok(!table.raw_get::<LuaValue>(needle)?.is_nil())
}

/// Split call arguments into exactly `N` values
fn take_args<const N: usize>(name: &str, args: LuaMultiValue) -> LuaResult<[LuaValue; N]> {
    let values: Vec<LuaValue> = args.into_iter().collect();
    let got = values.len();
    values.try_into().map_err(|_| {
        LuaError::runtime(format!(
            "{}() takes {} argument(s), got {}",
            name, N, got
        ))
    })
}

fn string_arg(name: &str, position: usize, value: &LuaValue) -> LuaResult<String> {
    match value {
        LuaValue::String(s) => Ok(s.to_string_lossy().to_string()),
        other => Err(LuaError::runtime(format!(
            "{}(): argument {} must be a string, got {}",
            name,
            position,
            other.type_name()
        ))),
    }
}
