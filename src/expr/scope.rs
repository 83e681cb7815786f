//! Static environment of the expression language
//!
//! Lua resolves unknown globals to `nil` at run time, so typos would silently
//! evaluate. Expressions have no binding forms, so every name in the parsed
//! tree must be one the evaluation environment provides.

use crate::expr::functions::BUILTINS;
use crate::expr::syntax::Expr;

/// Top-level names bound from the evaluation context
pub const CONTEXT_ROOTS: &[&str] = &["os", "arch", "home", "profile", "env", "vars", "tasks"];

/// Lua globals that stay available inside the sandbox
pub const LUA_GLOBALS: &[&str] = &[
    "string", "math", "table", "utf8", "tostring", "tonumber", "type", "pairs", "ipairs",
    "select", "next",
];

/// Whether `name` is provided by the evaluation environment
pub fn is_known(name: &str) -> bool {
    CONTEXT_ROOTS.contains(&name) || LUA_GLOBALS.contains(&name) || BUILTINS.contains(&name)
}

/// Names read by `expr`, in order of first appearance
pub fn free_names(expr: &Expr) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    expr.walk_names(&mut |name| {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    });
    names
}

/// Return the first name in `expr` the environment does not provide
pub fn first_unknown(expr: &Expr) -> Option<String> {
    free_names(expr).into_iter().find(|name| !is_known(name))
}
