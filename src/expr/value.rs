//! Configuration values that may embed expressions
//!
//! A [`Value`] is built once from a raw YAML scalar and can be resolved any
//! number of times against different contexts:
//!
//! - non-string values and strings without `${` are literals and resolve to
//!   themselves;
//! - a string that is exactly one `${ ... }` is a full expression and resolves
//!   to the expression's native result (bool, number, list, ...);
//! - anything else is interpolated into a single string.

use crate::error::{ExpressionError, ExpressionResult};
use crate::expr::context::Context;
use crate::expr::program::Program;
use crate::expr::scan::find_spans;
use serde_yaml::Value as Yaml;
use std::rc::Rc;

/// A piece of an interpolated string
#[derive(Debug, Clone)]
pub enum Part {
    Literal(String),
    Expr(Rc<Program>),
}

/// A parsed configuration value
#[derive(Debug, Clone)]
pub struct Value {
    raw: Yaml,
    parts: Vec<Part>,
    full: Option<Rc<Program>>,
}

impl Value {
    /// Parse a raw configuration value, compiling every embedded expression
    pub fn new(raw: Yaml) -> ExpressionResult<Self> {
        let s = match &raw {
            Yaml::String(s) => s.clone(),
            _ => return Ok(Value::literal(raw)),
        };

        let trimmed = s.trim();
        let trimmed_spans = find_spans(trimmed)?;
        if let [span] = trimmed_spans.as_slice() {
            if span.start == 0 && span.end == trimmed.len() {
                let program = Program::compile(&span.inner)?;
                return Ok(Value {
                    raw,
                    parts: Vec::new(),
                    full: Some(Rc::new(program)),
                });
            }
        }

        let spans = find_spans(&s)?;
        if spans.is_empty() {
            return Ok(Value::literal(raw));
        }

        let mut parts = Vec::with_capacity(spans.len() * 2 + 1);
        let mut cursor = 0;
        for span in spans {
            if span.start > cursor {
                parts.push(Part::Literal(s[cursor..span.start].to_string()));
            }
            parts.push(Part::Expr(Rc::new(Program::compile(&span.inner)?)));
            cursor = span.end;
        }
        if cursor < s.len() {
            parts.push(Part::Literal(s[cursor..].to_string()));
        }

        Ok(Value {
            raw,
            parts,
            full: None,
        })
    }

    /// Parse a string value
    pub fn parse(s: &str) -> ExpressionResult<Self> {
        Value::new(Yaml::String(s.to_string()))
    }

    /// A value that is never scanned for expressions
    pub fn literal(raw: Yaml) -> Self {
        Value {
            raw,
            parts: Vec::new(),
            full: None,
        }
    }

    /// The value as it appeared in the configuration
    pub fn raw(&self) -> &Yaml {
        &self.raw
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Whether the whole value is a single expression
    pub fn is_full_expression(&self) -> bool {
        self.full.is_some()
    }

    /// True when resolving never evaluates anything
    pub fn is_literal(&self) -> bool {
        self.full.is_none() && self.parts.iter().all(|p| matches!(p, Part::Literal(_)))
    }

    /// Resolve against `ctx`
    pub fn resolve(&self, ctx: &Context) -> ExpressionResult<Yaml> {
        if let Some(program) = &self.full {
            return program.eval(ctx);
        }
        if self.parts.is_empty() {
            return Ok(self.raw.clone());
        }

        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Expr(program) => out.push_str(&format_value(&program.eval(ctx)?)),
            }
        }
        Ok(Yaml::String(out))
    }

    /// Resolve and format the result as a string
    pub fn resolve_string(&self, ctx: &Context) -> ExpressionResult<String> {
        self.resolve(ctx).map(|v| format_value(&v))
    }
}

impl TryFrom<&str> for Value {
    type Error = ExpressionError;

    fn try_from(s: &str) -> ExpressionResult<Self> {
        Value::parse(s)
    }
}

/// Default string form of a resolved value
pub fn format_value(value: &Yaml) -> String {
    match value {
        Yaml::Null => String::new(),
        Yaml::Bool(b) => b.to_string(),
        Yaml::Number(n) => n.to_string(),
        Yaml::String(s) => s.clone(),
        Yaml::Sequence(items) => {
            let items: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", items.join(", "))
        }
        Yaml::Mapping(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", format_value(k), format_value(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
        Yaml::Tagged(tagged) => format_value(&tagged.value),
    }
}

/// Name of the dynamic type of a resolved value, for error messages
pub fn type_name(value: &Yaml) -> &'static str {
    match value {
        Yaml::Null => "null",
        Yaml::Bool(_) => "bool",
        Yaml::Number(n) if n.is_f64() => "float",
        Yaml::Number(_) => "int",
        Yaml::String(_) => "string",
        Yaml::Sequence(_) => "list",
        Yaml::Mapping(_) => "map",
        Yaml::Tagged(_) => "tagged",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn ctx() -> Context {
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), Yaml::from("Luke"));
        vars.insert("version".to_string(), Yaml::from("1.0"));
        Context::with_platform("arch", "x86_64").with_vars(vars)
    }

    #[test]
    fn test_non_string_literals_round_trip() {
        let raws = vec![
            Yaml::Null,
            Yaml::Bool(true),
            Yaml::Number(42.into()),
            Yaml::Number(1.5.into()),
            Yaml::Sequence(vec![Yaml::from("${ not scanned }")]),
        ];
        for raw in raws {
            let value = Value::new(raw.clone()).unwrap();
            assert!(value.is_literal());
            assert_eq!(value.resolve(&ctx()).unwrap(), raw);
        }
    }

    #[test]
    fn test_plain_string_is_literal() {
        let value = Value::parse("~/.config").unwrap();
        assert!(value.is_literal());
        assert!(value.parts().is_empty());
        assert_eq!(value.resolve(&ctx()).unwrap(), Yaml::from("~/.config"));
    }

    #[test]
    fn test_full_expression_keeps_native_type() {
        let sum = Value::parse("${ 1 + 2 }").unwrap();
        assert!(sum.is_full_expression());
        assert_eq!(sum.resolve(&ctx()).unwrap(), Yaml::Number(3.into()));

        let and = Value::parse("  ${ true and false }  ").unwrap();
        assert_eq!(and.resolve(&ctx()).unwrap(), Yaml::Bool(false));
    }

    #[test]
    fn test_interpolation() {
        let value = Value::parse("${ vars.name } v${ vars.version }").unwrap();
        assert!(!value.is_full_expression());
        assert!(!value.is_literal());
        assert_eq!(value.resolve(&ctx()).unwrap(), Yaml::from("Luke v1.0"));
    }

    #[test]
    fn test_interpolation_keeps_surrounding_whitespace() {
        let value = Value::parse("  hi ${ vars.name }  ").unwrap();
        assert_eq!(value.resolve_string(&ctx()).unwrap(), "  hi Luke  ");
    }

    #[test]
    fn test_interpolation_formats_non_strings() {
        let value = Value::parse("n=${ 40 + 2 } ok=${ 1 < 2 } none=${ nil }").unwrap();
        assert_eq!(value.resolve_string(&ctx()).unwrap(), "n=42 ok=true none=");
    }

    #[test]
    fn test_nested_table_braces() {
        let value = Value::parse("${ ({foo = 1, bar = 2}).foo == 1 }").unwrap();
        assert!(value.is_full_expression());
        assert_eq!(value.resolve(&ctx()).unwrap(), Yaml::Bool(true));
    }

    #[test]
    fn test_membership_in_map_literal() {
        let value = Value::parse(r#"${ "foo" in {"foo":1,"bar":2} }"#).unwrap();
        assert!(value.is_full_expression());
        assert_eq!(value.resolve(&ctx()).unwrap(), Yaml::Bool(true));

        let missing = Value::parse(r#"${ "baz" in {"foo":1,"bar":2} }"#).unwrap();
        assert_eq!(missing.resolve(&ctx()).unwrap(), Yaml::Bool(false));
    }

    #[test]
    fn test_map_literal_member() {
        let value = Value::parse(r#"${ {"key":"value"}.key }"#).unwrap();
        assert_eq!(value.resolve(&ctx()).unwrap(), Yaml::from("value"));
    }

    #[test]
    fn test_map_literal_resolves_to_mapping() {
        let value = Value::parse(r#"${ {"foo": 1, "bar": 2} }"#).unwrap();
        let resolved = value.resolve(&ctx()).unwrap();
        assert_eq!(resolved["foo"], Yaml::Number(1.into()));
        assert_eq!(resolved["bar"], Yaml::Number(2.into()));
    }

    #[test]
    fn test_function_literal_rejects_construction() {
        assert!(Value::parse("${ (function(x) return 1 end)(0) + x }").is_err());
        assert!(Value::parse("${ (function(dofile) end) and type(dofile) }").is_err());
    }

    #[test]
    fn test_quoted_closing_brace() {
        let value = Value::parse(r#"${ "}" .. vars.name }"#).unwrap();
        assert_eq!(value.resolve(&ctx()).unwrap(), Yaml::from("}Luke"));
    }

    #[test]
    fn test_two_spans_are_not_a_full_expression() {
        let value = Value::parse("${ vars.name }${ vars.version }").unwrap();
        assert!(!value.is_full_expression());
        assert_eq!(value.resolve(&ctx()).unwrap(), Yaml::from("Luke1.0"));
    }

    #[test]
    fn test_full_expression_returns_list() {
        let value = Value::parse("${ {vars.name, 'x'} }").unwrap();
        assert_eq!(
            value.resolve(&ctx()).unwrap(),
            Yaml::Sequence(vec![Yaml::from("Luke"), Yaml::from("x")])
        );
    }

    #[test]
    fn test_compile_error_rejects_construction() {
        assert!(Value::parse("hello ${ 1 + }").is_err());
        assert!(Value::parse("${ undefined_thing }").is_err());
        assert!(Value::parse("open ${ vars.name").is_err());
    }

    #[test]
    fn test_evaluation_error_aborts_resolution() {
        let value = Value::parse("a ${ vars.name } b ${ vars.name.x.y }").unwrap();
        assert!(value.resolve(&ctx()).is_err());
    }

    #[test]
    fn test_format_value() {
        let seq = Yaml::Sequence(vec![Yaml::from("a"), Yaml::Number(1.into())]);
        assert_eq!(format_value(&seq), "[a, 1]");
        assert_eq!(format_value(&Yaml::Null), "");
        assert_eq!(format_value(&Yaml::Number(1.5.into())), "1.5");
    }

    #[test]
    fn test_type_name() {
        assert_eq!(type_name(&Yaml::Number(42.into())), "int");
        assert_eq!(type_name(&Yaml::Number(4.2.into())), "float");
        assert_eq!(type_name(&Yaml::from("x")), "string");
    }
}
