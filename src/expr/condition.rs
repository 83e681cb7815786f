//! Boolean conditions written as expressions

use crate::error::{ExpressionError, ExpressionResult};
use crate::expr::context::Context;
use crate::expr::value::{type_name, Value};
use serde_yaml::Value as Yaml;

/// Decide whether a task guarded by `when` should run.
///
/// A missing condition, or a literal empty string, always runs. Anything else
/// must resolve to a bool; other types are an error and are never coerced.
pub fn resolve_condition(when: Option<&Value>, ctx: &Context) -> ExpressionResult<bool> {
    let when = match when {
        Some(when) => when,
        None => return Ok(true),
    };

    if when.is_literal() && matches!(when.raw(), Yaml::String(s) if s.is_empty()) {
        return Ok(true);
    }

    match when.resolve(ctx)? {
        Yaml::Bool(b) => Ok(b),
        other => Err(ExpressionError::ConditionType(type_name(&other).to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn ctx() -> Context {
        let mut vars = HashMap::new();
        vars.insert("work".to_string(), Yaml::Bool(false));
        Context::with_platform("darwin", "aarch64")
            .with_profile("personal")
            .with_vars(vars)
    }

    #[test]
    fn test_missing_condition_runs() {
        assert!(resolve_condition(None, &ctx()).unwrap());
    }

    #[test]
    fn test_empty_string_runs() {
        let when = Value::parse("").unwrap();
        assert!(resolve_condition(Some(&when), &ctx()).unwrap());
    }

    #[test]
    fn test_boolean_expression() {
        let yes = Value::parse("${ os == 'darwin' and profile == 'personal' }").unwrap();
        let no = Value::parse("${ vars.work }").unwrap();
        assert!(resolve_condition(Some(&yes), &ctx()).unwrap());
        assert!(!resolve_condition(Some(&no), &ctx()).unwrap());
    }

    #[test]
    fn test_literal_bool() {
        let when = Value::new(Yaml::Bool(false)).unwrap();
        assert!(!resolve_condition(Some(&when), &ctx()).unwrap());
    }

    #[test]
    fn test_string_result_is_type_error() {
        let when = Value::parse("${ 'hello' }").unwrap();
        let err = resolve_condition(Some(&when), &ctx()).unwrap_err();
        assert_eq!(err.to_string(), "condition must evaluate to bool, got string");
    }

    #[test]
    fn test_number_result_is_type_error() {
        let when = Value::parse("${ 40 + 2 }").unwrap();
        let err = resolve_condition(Some(&when), &ctx()).unwrap_err();
        assert!(matches!(err, ExpressionError::ConditionType(ref t) if t == "int"));
    }

    #[test]
    fn test_plain_text_is_type_error() {
        let when = Value::parse("hello").unwrap();
        assert!(resolve_condition(Some(&when), &ctx()).is_err());
    }

    #[test]
    fn test_evaluation_error_propagates() {
        let when = Value::parse("${ vars.missing.field }").unwrap();
        let err = resolve_condition(Some(&when), &ctx()).unwrap_err();
        assert!(matches!(err, ExpressionError::Evaluation { .. }));
    }
}
