//! Parsing of `tools/list` responses into [`ToolDefinition`]s.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde_json::Value;

use crate::definition::{Parameter, ParameterType, ToolDefinition};
use crate::error::{Result, ToolboxError};
use crate::protocol::{JsonRpcResponse, ListToolsResult, ToolInfo};

/// Tool name → definition.
pub type ToolCatalog = HashMap<String, ToolDefinition>;

/// Parse a raw `tools/list` HTTP response.
///
/// Non-success statuses and JSON-RPC errors abort; they are never turned into
/// an empty catalog.
pub fn parse_list_response(status: u16, body: &str) -> Result<ToolCatalog> {
    if !(200..300).contains(&status) {
        return Err(ToolboxError::transport(status, body));
    }

    let envelope: JsonRpcResponse = serde_json::from_str(body)?;
    let result = envelope
        .into_result()
        .map_err(|e| ToolboxError::protocol(e.code, e.message, e.data))?;

    parse_list_result(result)
}

/// Parse the `result` member of a `tools/list` response.
pub fn parse_list_result(result: Value) -> Result<ToolCatalog> {
    if result.is_null() {
        return Err(ToolboxError::MalformedResponse(
            "tools/list response has no result".to_string(),
        ));
    }
    let list: ListToolsResult = serde_json::from_value(result)?;

    Ok(list
        .tools
        .into_iter()
        .map(|tool| {
            let name = tool.name.clone();
            (name, definition_from_info(tool))
        })
        .collect())
}

/// Build a [`ToolDefinition`] from a wire tool entry.
pub fn definition_from_info(tool: ToolInfo) -> ToolDefinition {
    let schema = tool.input_schema.unwrap_or_default();
    let required: HashSet<&str> = schema.required.iter().map(String::as_str).collect();
    let meta = tool.meta.unwrap_or_default();

    let parameters = schema
        .properties
        .iter()
        .map(|(name, prop)| {
            let param_type = match prop.get("type") {
                None | Some(Value::Null) => ParameterType::String,
                Some(Value::String(t)) => ParameterType::parse(t),
                Some(other) => ParameterType::Other(other.to_string()),
            };
            let description = prop
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let auth_sources: BTreeSet<String> = meta.auth_sources(name).into_iter().collect();

            Parameter {
                name: name.clone(),
                param_type,
                required: required.contains(name.as_str()),
                description,
                auth_sources,
            }
        })
        .collect();

    ToolDefinition {
        description: tool.description.unwrap_or_default(),
        parameters,
    }
}
