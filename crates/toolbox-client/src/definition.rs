//! Tool definitions as declared by the server.

use std::collections::BTreeSet;
use std::fmt;

use serde_json::Value;

/// Declared type of a tool parameter.
///
/// Type names are matched case-insensitively. Anything the client does not
/// recognize is kept verbatim in [`ParameterType::Other`] and accepts any value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum ParameterType {
    #[default]
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Other(String),
}

impl ParameterType {
    /// Parse a JSON Schema type name.
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "string" => Self::String,
            "integer" => Self::Integer,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "array" => Self::Array,
            "object" => Self::Object,
            _ => Self::Other(name.to_string()),
        }
    }

    /// The schema name of this type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Other(name) => name,
        }
    }

    /// Whether `value` is acceptable for a parameter of this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => is_whole_number(value),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Other(_) => true,
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_whole_number(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
        }
        _ => false,
    }
}

/// JSON type name of a value, as reported in type-mismatch errors.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A single declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub param_type: ParameterType,
    pub required: bool,
    pub description: String,
    /// Services whose resolved token may satisfy this parameter.
    pub auth_sources: BTreeSet<String>,
}

impl Parameter {
    /// Create an optional, unauthenticated parameter.
    pub fn new(name: impl Into<String>, param_type: ParameterType) -> Self {
        Self {
            name: name.into(),
            param_type,
            required: false,
            description: String::new(),
            auth_sources: BTreeSet::new(),
        }
    }

    /// Mark the parameter as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add an auth source.
    pub fn with_auth_source(mut self, service: impl Into<String>) -> Self {
        self.auth_sources.insert(service.into());
        self
    }

    /// Whether a token for `service` may fill this parameter.
    pub fn is_authenticated_by(&self, service: &str) -> bool {
        self.auth_sources.contains(service)
    }
}

/// The schema of one tool. Immutable once fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolDefinition {
    pub description: String,
    /// Parameters in schema declaration order.
    pub parameters: Vec<Parameter>,
}

impl ToolDefinition {
    pub fn new(description: impl Into<String>, parameters: Vec<Parameter>) -> Self {
        Self {
            description: description.into(),
            parameters,
        }
    }

    /// Look up a parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// First parameter, in schema order, that lists `service` as an auth source.
    pub fn parameter_for_service(&self, service: &str) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.is_authenticated_by(service))
    }
}
