//! Tagged parameter map carried by generation requests.
//!
//! Parameters feed template placeholder substitution and the cache
//! fingerprint, so values need a canonical textual rendering.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::errors::{SharedError, SharedResult};

/// A single request parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Text(String),
    Number(f64),
    Flag(bool),
    List(Vec<String>),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Text(s) => write!(f, "{s}"),
            ParamValue::Number(n) => write!(f, "{n}"),
            ParamValue::Flag(b) => write!(f, "{b}"),
            ParamValue::List(items) => write!(f, "{}", items.join(", ")),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Number(value as f64)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Flag(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(value: Vec<String>) -> Self {
        ParamValue::List(value)
    }
}

pub type Parameters = HashMap<String, ParamValue>;

/// Reject parameter shapes that would poison fingerprints or prompts
pub fn validate(params: &Parameters) -> SharedResult<()> {
    for (name, value) in params {
        if name.trim().is_empty() {
            return Err(SharedError::InvalidParameter {
                name: name.clone(),
                message: "parameter names must be non-empty".to_string(),
            });
        }
        if let ParamValue::Number(n) = value {
            if !n.is_finite() {
                return Err(SharedError::InvalidParameter {
                    name: name.clone(),
                    message: "numeric parameters must be finite".to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Required variables the map does not provide, in input order
pub fn missing_variables(params: &Parameters, required: &[String]) -> Vec<String> {
    required
        .iter()
        .filter(|name| !params.contains_key(*name))
        .cloned()
        .collect()
}

/// Key-sorted `name=value` rendering used by cache fingerprints
pub fn canonical_fragment(params: &Parameters) -> String {
    let mut names: Vec<&String> = params.keys().collect();
    names.sort();
    names
        .iter()
        .map(|name| format!("{name}={}", params[*name]))
        .collect::<Vec<_>>()
        .join("&")
}

/// Substitute `{name}` placeholders with parameter values.
///
/// Placeholders without a matching parameter are left verbatim;
/// submission validation guarantees required ones exist.
pub fn render_placeholders(text: &str, params: &Parameters) -> String {
    let mut rendered = text.to_string();
    for (name, value) in params {
        rendered = rendered.replace(&format!("{{{name}}}"), &value.to_string());
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Parameters {
        let mut params = Parameters::new();
        params.insert("topic".to_string(), "photosynthesis".into());
        params.insert("question_count".to_string(), ParamValue::Number(10.0));
        params.insert("include_answers".to_string(), true.into());
        params.insert(
            "objectives".to_string(),
            vec!["light reactions".to_string(), "calvin cycle".to_string()].into(),
        );
        params
    }

    #[test]
    fn test_canonical_fragment_is_key_sorted() {
        let fragment = canonical_fragment(&sample());
        assert_eq!(
            fragment,
            "include_answers=true&objectives=light reactions, calvin cycle&question_count=10&topic=photosynthesis"
        );
    }

    #[test]
    fn test_canonical_fragment_ignores_insertion_order() {
        let mut reversed = Parameters::new();
        reversed.insert("b".to_string(), ParamValue::Number(2.0));
        reversed.insert("a".to_string(), "x".into());

        let mut forward = Parameters::new();
        forward.insert("a".to_string(), "x".into());
        forward.insert("b".to_string(), ParamValue::Number(2.0));

        assert_eq!(canonical_fragment(&reversed), canonical_fragment(&forward));
    }

    #[test]
    fn test_missing_variables() {
        let required = vec!["topic".to_string(), "difficulty".to_string(), "audience".to_string()];
        let missing = missing_variables(&sample(), &required);
        assert_eq!(missing, vec!["difficulty".to_string(), "audience".to_string()]);
    }

    #[test]
    fn test_placeholder_rendering() {
        let text = "Write a {difficulty} quiz about {topic} with {question_count} questions.";
        let mut params = sample();
        params.insert("difficulty".to_string(), "intermediate".into());

        let rendered = render_placeholders(text, &params);
        assert_eq!(
            rendered,
            "Write a intermediate quiz about photosynthesis with 10 questions."
        );
    }

    #[test]
    fn test_unknown_placeholders_left_verbatim() {
        let rendered = render_placeholders("Focus on {style}.", &sample());
        assert_eq!(rendered, "Focus on {style}.");
    }

    #[test]
    fn test_validation_rejects_non_finite_numbers() {
        let mut params = sample();
        params.insert("weight".to_string(), ParamValue::Number(f64::NAN));
        assert!(validate(&params).is_err());

        let mut params = sample();
        params.insert("weight".to_string(), ParamValue::Number(f64::INFINITY));
        assert!(validate(&params).is_err());

        assert!(validate(&sample()).is_ok());
    }
}
