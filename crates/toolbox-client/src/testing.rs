//! In-memory transport for unit tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::catalog::ToolCatalog;
use crate::error::Result;
use crate::result::ToolResult;
use crate::transport::ToolTransport;

/// One recorded `invoke`.
#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub tool: String,
    pub arguments: Map<String, Value>,
    pub headers: HashMap<String, String>,
}

/// Serves a fixed catalog and records every call.
#[derive(Default)]
pub(crate) struct RecordingTransport {
    pub catalog: ToolCatalog,
    pub calls: Mutex<Vec<RecordedCall>>,
    pub listed: Mutex<Vec<Option<String>>>,
}

impl RecordingTransport {
    pub fn with_catalog(catalog: ToolCatalog) -> Self {
        Self {
            catalog,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn last_call(&self) -> RecordedCall {
        self.calls().pop().expect("no calls recorded")
    }
}

#[async_trait]
impl ToolTransport for RecordingTransport {
    async fn list_tools(&self, toolset: Option<&str>) -> Result<ToolCatalog> {
        self.listed.lock().push(toolset.map(str::to_string));
        Ok(self.catalog.clone())
    }

    async fn invoke(
        &self,
        tool: &str,
        arguments: Map<String, Value>,
        headers: HashMap<String, String>,
    ) -> Result<ToolResult> {
        let text = Value::Object(arguments.clone()).to_string();
        self.calls.lock().push(RecordedCall {
            tool: tool.to_string(),
            arguments,
            headers,
        });
        Ok(ToolResult::text_result(text, false))
    }
}

/// Build an argument map from a JSON object literal.
pub(crate) fn args(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}
