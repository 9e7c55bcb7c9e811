// Structured output contract
// Declares the fields a completion must contain, renders the format
// instructions embedded in prompts, and parses raw completions back out

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

/// One declared response field.
#[derive(Debug, Clone, Copy)]
pub struct ResponseField {
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Error)]
pub enum SchemaParseError {
    #[error("completion contains no JSON object")]
    NoJsonObject,

    #[error("completion JSON is malformed: {0}")]
    Malformed(String),

    #[error("completion is missing required field '{0}'")]
    MissingField(String),

    #[error("field '{field}' is '{value}', expected one of {allowed:?}")]
    InvalidEnum {
        field: String,
        value: String,
        allowed: &'static [&'static str],
    },

    #[error("field '{field}' is not a {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },
}

/// Ordered response-field declaration for one node.
///
/// `format_instructions` is the only place the completion service's text
/// contract is spelled out, and `parse` is its inverse: a completion is
/// valid iff it carries a JSON object with every declared field present.
#[derive(Debug, Clone, Default)]
pub struct OutputSchema {
    fields: Vec<ResponseField>,
}

impl OutputSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &'static str, description: &'static str) -> Self {
        self.fields.push(ResponseField { name, description });
        self
    }

    /// Render the deterministic instruction block appended to prompts.
    pub fn format_instructions(&self) -> String {
        let mut body = String::new();
        for field in &self.fields {
            body.push_str(&format!(
                "\t\"{}\": string  // {}\n",
                field.name, field.description
            ));
        }
        format!(
            "The output should be a markdown code snippet formatted in the following \
             schema, including the leading and trailing \"```json\" and \"```\":\n\n\
             ```json\n{{\n{}}}\n```",
            body
        )
    }

    /// Parse a raw completion against the declared fields.
    pub fn parse(&self, raw: &str) -> Result<StructuredOutput, SchemaParseError> {
        let payload = extract_json_object(raw).ok_or(SchemaParseError::NoJsonObject)?;
        let value: Value = serde_json::from_str(payload)
            .map_err(|err| SchemaParseError::Malformed(err.to_string()))?;
        let values = match value {
            Value::Object(map) => map,
            _ => return Err(SchemaParseError::NoJsonObject),
        };
        for field in &self.fields {
            if !values.contains_key(field.name) {
                return Err(SchemaParseError::MissingField(field.name.to_string()));
            }
        }
        Ok(StructuredOutput { values })
    }
}

/// Pull the first fenced JSON object out of a completion, falling back to the
/// outermost brace span when the model forgot the fence.
fn extract_json_object(raw: &str) -> Option<&str> {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("valid fence pattern")
    });

    if let Some(captures) = fence.captures(raw) {
        return captures.get(1).map(|m| m.as_str());
    }

    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

/// A completion validated against an [`OutputSchema`].
#[derive(Debug, Clone)]
pub struct StructuredOutput {
    values: Map<String, Value>,
}

impl StructuredOutput {
    /// Free-text field, coerced to a string. Declared fields are guaranteed
    /// present after `parse`, so an undeclared name yields an empty string.
    pub fn text(&self, field: &str) -> String {
        match self.values.get(field) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }

    /// Enumerated string field; matching is trimmed and case-insensitive and
    /// the canonical spelling from `allowed` is returned.
    pub fn enumerated(
        &self,
        field: &str,
        allowed: &'static [&'static str],
    ) -> Result<&'static str, SchemaParseError> {
        let value = self
            .values
            .get(field)
            .ok_or_else(|| SchemaParseError::MissingField(field.to_string()))?;
        let raw = match value {
            Value::String(s) => s.trim().to_string(),
            other => other.to_string(),
        };
        allowed
            .iter()
            .copied()
            .find(|candidate| candidate.eq_ignore_ascii_case(&raw))
            .ok_or(SchemaParseError::InvalidEnum {
                field: field.to_string(),
                value: raw,
                allowed,
            })
    }

    /// Boolean field: native JSON bool, or the strings "true"/"false".
    pub fn boolean(&self, field: &str) -> Result<bool, SchemaParseError> {
        match self.values.get(field) {
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(SchemaParseError::WrongType {
                    field: field.to_string(),
                    expected: "boolean",
                }),
            },
            Some(_) => Err(SchemaParseError::WrongType {
                field: field.to_string(),
                expected: "boolean",
            }),
            None => Err(SchemaParseError::MissingField(field.to_string())),
        }
    }

    /// JSON object field, accepted either inline or as an escaped JSON string.
    pub fn json_object(&self, field: &str) -> Result<Map<String, Value>, SchemaParseError> {
        match self.values.get(field) {
            Some(Value::Object(map)) => Ok(map.clone()),
            Some(Value::String(s)) => {
                let value: Value = serde_json::from_str(s)
                    .map_err(|err| SchemaParseError::Malformed(err.to_string()))?;
                match value {
                    Value::Object(map) => Ok(map),
                    _ => Err(SchemaParseError::WrongType {
                        field: field.to_string(),
                        expected: "JSON object",
                    }),
                }
            }
            Some(_) => Err(SchemaParseError::WrongType {
                field: field.to_string(),
                expected: "JSON object",
            }),
            None => Err(SchemaParseError::MissingField(field.to_string())),
        }
    }
}
