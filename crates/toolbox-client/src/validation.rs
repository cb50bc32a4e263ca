//! Shallow argument validation against a tool's declared parameters.
//!
//! This is a shape check only: required-ness and top-level JSON type. Ranges,
//! patterns and enum values are left to the server.

use serde_json::{Map, Value};

use crate::definition::{ToolDefinition, json_type_name};
use crate::error::ValidationError;

/// Drop null arguments, then check every declared parameter in schema order.
///
/// Mutates `args` in place and stops at the first violation.
pub fn validate_and_sanitize(
    args: &mut Map<String, Value>,
    definition: &ToolDefinition,
    tool_name: &str,
) -> Result<(), ValidationError> {
    args.retain(|_, value| !value.is_null());

    for param in &definition.parameters {
        match args.get(&param.name) {
            None if param.required => {
                return Err(ValidationError::MissingRequired {
                    parameter: param.name.clone(),
                    tool: tool_name.to_string(),
                });
            }
            None => {}
            Some(value) if !param.param_type.accepts(value) => {
                return Err(ValidationError::TypeMismatch {
                    parameter: param.name.clone(),
                    expected: param.param_type.to_string(),
                    actual: json_type_name(value).to_string(),
                });
            }
            Some(_) => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{Parameter, ParameterType};
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn n_rows() -> ToolDefinition {
        ToolDefinition::new(
            "",
            vec![
                Parameter::new("num_rows", ParameterType::String).required(),
                Parameter::new("verbose", ParameterType::Boolean),
            ],
        )
    }

    #[test]
    fn test_nulls_dropped_without_schema() {
        let mut a = args(json!({"a": null, "b": 1}));
        validate_and_sanitize(&mut a, &ToolDefinition::default(), "t").unwrap();
        assert_eq!(a, args(json!({"b": 1})));
    }

    #[test]
    fn test_null_optional_same_as_omitted() {
        let mut with_null = args(json!({"num_rows": "2", "verbose": null}));
        let mut omitted = args(json!({"num_rows": "2"}));
        validate_and_sanitize(&mut with_null, &n_rows(), "t").unwrap();
        validate_and_sanitize(&mut omitted, &n_rows(), "t").unwrap();
        assert_eq!(with_null, omitted);
    }

    #[test]
    fn test_missing_required() {
        let mut a = args(json!({"verbose": true}));
        let err = validate_and_sanitize(&mut a, &n_rows(), "get-n-rows").unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingRequired {
                parameter: "num_rows".to_string(),
                tool: "get-n-rows".to_string(),
            }
        );
    }

    #[test]
    fn test_null_required_is_missing() {
        let mut a = args(json!({"num_rows": null}));
        let err = validate_and_sanitize(&mut a, &n_rows(), "t").unwrap_err();
        assert!(matches!(err, ValidationError::MissingRequired { .. }));
    }

    #[test]
    fn test_type_mismatch() {
        let mut a = args(json!({"num_rows": 2}));
        let err = validate_and_sanitize(&mut a, &n_rows(), "t").unwrap_err();
        assert!(err.to_string().contains("expected type 'string' but got 'integer'"));
        assert_eq!(err.parameter(), "num_rows");
    }

    #[test]
    fn test_first_violation_in_schema_order() {
        let def = ToolDefinition::new(
            "",
            vec![
                Parameter::new("first", ParameterType::Integer),
                Parameter::new("second", ParameterType::String).required(),
            ],
        );
        let mut a = args(json!({"first": "nope"}));
        let err = validate_and_sanitize(&mut a, &def, "t").unwrap_err();
        assert_eq!(err.parameter(), "first");
    }

    #[test]
    fn test_undeclared_arguments_pass_through() {
        let mut a = args(json!({"num_rows": "1", "extra": [1, 2]}));
        validate_and_sanitize(&mut a, &n_rows(), "t").unwrap();
        assert!(a.contains_key("extra"));
    }
}
