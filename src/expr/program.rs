//! A single compiled expression
//!
//! Every program owns a sandboxed Lua state holding the builtin functions and
//! the compiled chunk. Evaluation binds the context as globals, calls the
//! chunk and converts the result back into a YAML value.

use crate::error::{ExpressionError, ExpressionResult};
use crate::expr::context::Context;
use crate::expr::functions::{self, PathEnv, BUILTINS};
use crate::expr::scope::{self, LUA_GLOBALS};
use crate::expr::syntax::{self, CONTAINS};
use mlua::prelude::*;
use std::fmt;

/// A compiled `${ ... }` expression
pub struct Program {
    source: String,
    function: LuaFunction,
    lua: Lua,
}

impl Program {
    /// Compile `source` against the static environment
    pub fn compile(source: &str) -> ExpressionResult<Self> {
        let expr = source.trim();
        if expr.is_empty() {
            return Err(ExpressionError::Empty);
        }

        let tree = syntax::parse(expr)?;
        if let Some(name) = scope::first_unknown(&tree) {
            return Err(ExpressionError::UndefinedIdentifier {
                name,
                expr: expr.to_string(),
            });
        }

        let compile_error = |e: LuaError| ExpressionError::Compile {
            expr: expr.to_string(),
            message: e.to_string(),
        };

        let lua = sandbox().map_err(compile_error)?;
        let function = lua
            .load(format!("return ({})", tree))
            .set_name(format!("=${{{}}}", expr))
            .into_function()
            .map_err(compile_error)?;

        Ok(Program {
            source: expr.to_string(),
            function,
            lua,
        })
    }

    /// The expression text, without the `${ }` delimiters
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against `ctx`, returning the native result
    pub fn eval(&self, ctx: &Context) -> ExpressionResult<serde_yaml::Value> {
        self.try_eval(ctx)
            .map_err(|e| ExpressionError::Evaluation {
                expr: self.source.clone(),
                message: e.to_string(),
            })
    }

    fn try_eval(&self, ctx: &Context) -> LuaResult<serde_yaml::Value> {
        bind_context(&self.lua, ctx)?;
        let result: LuaValue = self.function.call(())?;
        self.lua.from_value(result)
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// A Lua state holding only the allowed globals and the builtins
fn sandbox() -> LuaResult<Lua> {
    let libs = LuaStdLib::STRING | LuaStdLib::MATH | LuaStdLib::TABLE | LuaStdLib::UTF8;
    let lua = Lua::new_with(libs, LuaOptions::default())?;
    functions::register(&lua)?;

    // The base library is always opened; drop everything outside the allow-list
    let globals = lua.globals();
    let mut removed = Vec::new();
    for pair in globals.pairs::<LuaValue, LuaValue>() {
        let (key, _) = pair?;
        let allowed = match &key {
            LuaValue::String(name) => {
                let name = name.to_string_lossy();
                LUA_GLOBALS.contains(&name.as_str())
                    || BUILTINS.contains(&name.as_str())
                    || name == CONTAINS
            }
            _ => false,
        };
        if !allowed {
            removed.push(key);
        }
    }
    for key in removed {
        globals.raw_set(key, LuaValue::Nil)?;
    }

    Ok(lua)
}

/// Expose the context as globals; YAML nulls become `nil`
fn bind_context(lua: &Lua, ctx: &Context) -> LuaResult<()> {
    let options = LuaSerializeOptions::new()
        .serialize_none_to_null(false)
        .serialize_unit_to_null(false);
    let globals = lua.globals();

    globals.set("os", ctx.os())?;
    globals.set("arch", ctx.arch())?;
    globals.set("home", ctx.home())?;
    globals.set("profile", ctx.profile())?;
    globals.set("env", lua.to_value_with(ctx.env(), options)?)?;
    globals.set("vars", lua.to_value_with(ctx.vars(), options)?)?;
    globals.set("tasks", lua.to_value_with(ctx.tasks(), options)?)?;

    lua.set_app_data(PathEnv {
        home: ctx.home().to_string(),
        env: ctx.env().clone(),
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::Status;
    use serde_yaml::Value as Yaml;
    use std::collections::HashMap;

    fn ctx() -> Context {
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), Yaml::from("Luke"));
        vars.insert("nothing".to_string(), Yaml::Null);
        vars.insert(
            "tools".to_string(),
            Yaml::Sequence(vec![Yaml::from("git"), Yaml::from("fzf")]),
        );
        Context::with_platform("arch", "x86_64")
            .with_profile("personal")
            .with_vars(vars)
    }

    #[test]
    fn test_integer_result() {
        let program = Program::compile(" 1 + 2 ").unwrap();
        assert_eq!(program.source(), "1 + 2");
        assert_eq!(program.eval(&ctx()).unwrap(), Yaml::Number(3.into()));
    }

    #[test]
    fn test_context_bindings() {
        let ctx = ctx();
        let os = Program::compile("os").unwrap().eval(&ctx).unwrap();
        let profile = Program::compile("profile == 'personal'").unwrap().eval(&ctx).unwrap();
        let tool = Program::compile("vars.tools[2]").unwrap().eval(&ctx).unwrap();
        assert_eq!(os, Yaml::from("arch"));
        assert_eq!(profile, Yaml::Bool(true));
        assert_eq!(tool, Yaml::from("fzf"));
    }

    #[test]
    fn test_null_var_is_nil() {
        let result = Program::compile("vars.nothing == nil")
            .unwrap()
            .eval(&ctx())
            .unwrap();
        assert_eq!(result, Yaml::Bool(true));
    }

    #[test]
    fn test_task_records_are_visible() {
        let mut ctx = ctx();
        ctx.record_task("whoami", Yaml::from("luke\n"), Status::Done);

        let status = Program::compile("tasks.whoami.status")
            .unwrap()
            .eval(&ctx)
            .unwrap();
        let output = Program::compile("tasks['whoami'].output")
            .unwrap()
            .eval(&ctx)
            .unwrap();
        assert_eq!(status, Yaml::from("done"));
        assert_eq!(output, Yaml::from("luke\n"));
    }

    #[test]
    fn test_program_is_reusable_across_contexts() {
        let program = Program::compile("profile").unwrap();
        let base = ctx();
        assert_eq!(program.eval(&base).unwrap(), Yaml::from("personal"));
        assert_eq!(
            program.eval(&base.with_profile("work")).unwrap(),
            Yaml::from("work")
        );
    }

    #[test]
    fn test_syntax_error() {
        let err = Program::compile("1 +").unwrap_err();
        assert!(matches!(err, ExpressionError::Compile { .. }));
    }

    #[test]
    fn test_undefined_identifier() {
        let err = Program::compile("varz.name").unwrap_err();
        assert!(matches!(
            err,
            ExpressionError::UndefinedIdentifier { ref name, .. } if name == "varz"
        ));
    }

    #[test]
    fn test_empty_expression() {
        assert!(matches!(
            Program::compile("   ").unwrap_err(),
            ExpressionError::Empty
        ));
    }

    #[test]
    fn test_runtime_error() {
        let err = Program::compile("vars.name + 1").unwrap().eval(&ctx()).unwrap_err();
        assert!(matches!(err, ExpressionError::Evaluation { .. }));
    }

    #[test]
    fn test_sandbox_drops_loaders() {
        let lua = sandbox().unwrap();
        for name in ["dofile", "loadfile", "load", "require", "collectgarbage", "rawset", "_G"] {
            let value: LuaValue = lua.globals().get(name).unwrap();
            assert!(value.is_nil(), "{} is still reachable", name);
        }
        let tostring: LuaValue = lua.globals().get("tostring").unwrap();
        assert!(tostring.is_function());
    }

    #[test]
    fn test_function_literal_cannot_shadow_names() {
        let err = Program::compile("(function(x) return 1 end)(0) + x").unwrap_err();
        assert!(matches!(err, ExpressionError::Compile { .. }));
        assert!(Program::compile("(function(dofile) end) and type(dofile)").is_err());
        assert!(matches!(
            Program::compile("type(dofile)").unwrap_err(),
            ExpressionError::UndefinedIdentifier { ref name, .. } if name == "dofile"
        ));
    }

    #[test]
    fn test_membership() {
        let ctx = ctx();
        let has_git = Program::compile("'git' in vars.tools").unwrap().eval(&ctx).unwrap();
        let no_vim = Program::compile("'vim' not in vars.tools").unwrap().eval(&ctx).unwrap();
        assert_eq!(has_git, Yaml::Bool(true));
        assert_eq!(no_vim, Yaml::Bool(true));
    }

    #[test]
    fn test_path_builtins_see_context_env() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("dotfiles")).unwrap();

        let mut overlay = HashMap::new();
        overlay.insert(
            "BOOTKIT_OVERLAY_ONLY".to_string(),
            temp_dir.path().to_string_lossy().to_string(),
        );
        let overlaid = ctx().with_env(overlay);

        let program = Program::compile("exists('$BOOTKIT_OVERLAY_ONLY/dotfiles')").unwrap();
        assert_eq!(program.eval(&overlaid).unwrap(), Yaml::Bool(true));
        assert_eq!(program.eval(&ctx()).unwrap(), Yaml::Bool(false));

        let expanded = Program::compile("expand('$BOOTKIT_OVERLAY_ONLY')")
            .unwrap()
            .eval(&overlaid)
            .unwrap();
        assert_eq!(expanded, Yaml::from(temp_dir.path().to_string_lossy().to_string()));
    }

    #[test]
    fn test_sandbox_has_no_os_library() {
        // `os` is the OS identifier string, not Lua's os library
        let result = Program::compile("type(os)").unwrap().eval(&ctx()).unwrap();
        assert_eq!(result, Yaml::from("string"));
    }
}
