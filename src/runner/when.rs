//! Declarative OS/profile conditions
//!
//! A lower-power alternative to expression conditions, used by the builder
//! to gate whole config entries. Values within a field are alternatives (OR);
//! non-empty fields must all match (AND).

use crate::expr::Context;
use serde::{Deserialize, Deserializer, Serialize};

/// `when:` clause of a config entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Condition {
    /// Accepted OS identifiers
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "string_or_list"
    )]
    pub os: Vec<String>,

    /// Accepted profiles
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "string_or_list"
    )]
    pub profile: Vec<String>,
}

impl Condition {
    pub fn new(os: &[&str], profile: &[&str]) -> Self {
        Condition {
            os: os.iter().map(|s| s.to_string()).collect(),
            profile: profile.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// A condition with no fields always matches
    pub fn is_empty(&self) -> bool {
        self.os.is_empty() && self.profile.is_empty()
    }
}

/// Matches conditions against a fixed OS and profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluator {
    os: String,
    profile: String,
}

impl Evaluator {
    pub fn new(os: impl Into<String>, profile: impl Into<String>) -> Self {
        Evaluator {
            os: os.into(),
            profile: profile.into(),
        }
    }

    /// Take the OS and profile from an evaluation context
    pub fn from_context(ctx: &Context) -> Self {
        Evaluator::new(ctx.os(), ctx.profile())
    }

    pub fn os(&self) -> &str {
        &self.os
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Whether `cond` admits this OS and profile
    pub fn matches(&self, cond: Option<&Condition>) -> bool {
        self.first_mismatch(cond).is_none()
    }

    /// Why `cond` does not match, or an empty string when it does
    pub fn failure_reason(&self, cond: Option<&Condition>) -> String {
        match self.first_mismatch(cond) {
            Some((field, actual, wanted)) => {
                format!("{}={}, want {}", field, actual, wanted.join(" or "))
            }
            None => String::new(),
        }
    }

    fn first_mismatch<'a>(
        &'a self,
        cond: Option<&'a Condition>,
    ) -> Option<(&'static str, &'a str, &'a [String])> {
        let cond = cond?;
        if !cond.os.is_empty() && !cond.os.iter().any(|os| *os == self.os) {
            return Some(("os", &self.os, &cond.os));
        }
        if !cond.profile.is_empty() && !cond.profile.iter().any(|p| *p == self.profile) {
            return Some(("profile", &self.profile, &cond.profile));
        }
        None
    }
}

/// Accept either a single string or a list of strings
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    let value = Value::deserialize(deserializer)?;

    match value {
        Value::String(s) => Ok(vec![s]),
        Value::Sequence(seq) => seq
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(D::Error::custom(format!(
                    "expected a string, got {:?}",
                    other
                ))),
            })
            .collect(),
        Value::Null => Ok(Vec::new()),
        _ => Err(D::Error::custom("expected a string or a list of strings")),
    }
}
