//! Tool invocation results and response normalization.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One content item returned by a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolContent {
    /// Content type (`"text"`, `"image"`, ...).
    #[serde(rename = "type", default = "default_content_type")]
    pub content_type: String,
    /// Text payload, present for text items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

fn default_content_type() -> String {
    "text".to_string()
}

impl ToolContent {
    /// A text content item.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content_type: "text".to_string(),
            text: Some(text.into()),
        }
    }

    /// Check if this is a text item.
    pub fn is_text(&self) -> bool {
        self.content_type == "text"
    }
}

/// The uniform result of a tool invocation.
///
/// Tool-level failures are results with `is_error` set, not `Err`s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<ToolContent>,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    /// A result holding a single text item.
    pub fn text_result(text: impl Into<String>, is_error: bool) -> Self {
        Self {
            content: vec![ToolContent::text(text)],
            is_error,
        }
    }

    /// An error result holding a single text item.
    pub fn error(message: impl Into<String>) -> Self {
        Self::text_result(message, true)
    }

    /// Check if the tool call was an error.
    pub fn is_error(&self) -> bool {
        self.is_error
    }

    /// Text of all text items joined by newlines, trimmed.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|c| c.is_text())
            .filter_map(|c| c.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

/// `result` as it may appear on the wire, before `content` is guaranteed.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawToolResult {
    #[serde(default)]
    content: Option<Vec<ToolContent>>,
    #[serde(default)]
    is_error: Option<bool>,
}

/// Convert a raw `tools/call` HTTP response into a [`ToolResult`].
///
/// Never fails: HTTP and JSON-RPC errors become error results, and bodies
/// that cannot be parsed on a success status become plain-text results.
pub fn normalize(status: u16, body: &str) -> ToolResult {
    if !(200..300).contains(&status) {
        return ToolResult::error(format!("Error {status}: {body}"));
    }

    let Ok(root) = serde_json::from_str::<Value>(body) else {
        return ToolResult::text_result(body, false);
    };

    if let Some(error) = root.get("error").filter(|e| !e.is_null()) {
        return ToolResult::error(format!("MCP Error: {error}"));
    }

    let envelope_error = root
        .get("isError")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let Some(result) = root.get("result").filter(|r| !r.is_null()) else {
        return ToolResult::text_result(body, envelope_error);
    };

    match serde_json::from_value::<RawToolResult>(result.clone()) {
        Ok(RawToolResult {
            content: Some(content),
            is_error,
        }) => ToolResult {
            content,
            is_error: is_error.unwrap_or(false),
        },
        Ok(RawToolResult {
            content: None,
            is_error,
        }) => ToolResult::text_result(body, envelope_error || is_error.unwrap_or(false)),
        Err(_) => ToolResult::text_result(body, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_http_error_status() {
        let result = normalize(500, "boom");
        assert!(result.is_error());
        assert_eq!(result.text(), "Error 500: boom");
    }

    #[test]
    fn test_jsonrpc_error() {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32602, "message": "invalid params"}
        })
        .to_string();
        let result = normalize(200, &body);
        assert!(result.is_error());
        assert!(result.text().starts_with("MCP Error: "));
        assert!(result.text().contains("invalid params"));
    }

    #[test]
    fn test_well_formed_result_passes_through() {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "content": [
                    {"type": "text", "text": "row1"},
                    {"type": "image", "data": "aGk=", "mimeType": "image/png"},
                    {"type": "text", "text": "row2"}
                ]
            }
        })
        .to_string();
        let result = normalize(200, &body);
        assert!(!result.is_error());
        assert_eq!(result.content.len(), 3);
        assert_eq!(result.content[1].content_type, "image");
        assert!(result.content[1].text.is_none());
        assert_eq!(result.text(), "row1\nrow2");
    }

    #[test]
    fn test_result_is_error_flag() {
        let body = json!({
            "result": {
                "content": [{"type": "text", "text": "permission error"}],
                "isError": true
            }
        })
        .to_string();
        let result = normalize(200, &body);
        assert!(result.is_error());
        assert_eq!(result.text(), "permission error");
    }

    #[test]
    fn test_content_result_ignores_envelope_flag() {
        let body = json!({
            "isError": true,
            "result": {"content": [{"type": "text", "text": "ok"}], "isError": false}
        })
        .to_string();
        let result = normalize(200, &body);
        assert!(!result.is_error());
        assert_eq!(result.text(), "ok");

        let body = json!({
            "isError": true,
            "result": {"content": [{"type": "text", "text": "ok"}]}
        })
        .to_string();
        assert!(!normalize(200, &body).is_error());
    }

    #[test]
    fn test_null_content_wraps_raw_body() {
        let body = json!({"isError": true, "result": {"content": null}}).to_string();
        let result = normalize(200, &body);
        assert_eq!(result.content, vec![ToolContent::text(body.clone())]);
        assert!(result.is_error());

        let body = json!({"result": {"rows": 3}}).to_string();
        let result = normalize(200, &body);
        assert_eq!(result.content.len(), 1);
        assert_eq!(result.content[0].text.as_deref(), Some(body.as_str()));
        assert!(!result.is_error());
    }

    #[test]
    fn test_missing_result_uses_envelope_flag() {
        let body = json!({"jsonrpc": "2.0", "id": 1, "isError": true}).to_string();
        let result = normalize(200, &body);
        assert!(result.is_error());
        assert_eq!(result.text(), body);
    }

    #[test]
    fn test_malformed_body_is_not_an_error() {
        let result = normalize(200, "<html>not json</html>");
        assert!(!result.is_error());
        assert_eq!(result.text(), "<html>not json</html>");

        let body = json!({"isError": true, "result": "plain string"}).to_string();
        let result = normalize(200, &body);
        assert!(!result.is_error());
        assert_eq!(result.text(), body);
    }

    #[test]
    fn test_text_skips_non_text_items() {
        let result = ToolResult {
            content: vec![
                ToolContent {
                    content_type: "resource".to_string(),
                    text: Some("ignored".to_string()),
                },
                ToolContent::text("  kept  "),
            ],
            is_error: false,
        };
        assert_eq!(result.text(), "kept");
        assert_eq!(ToolResult::error("x").text(), "x");
    }
}
