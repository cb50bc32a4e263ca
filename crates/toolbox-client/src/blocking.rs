//! Synchronous facade over [`ToolboxClient`].
//!
//! Owns a current-thread runtime and blocks on it. Do not use from inside
//! an async context; block_on panics there.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tokio::runtime::{Builder, Runtime};

use crate::binding::ToolsetBindings;
use crate::catalog::ToolCatalog;
use crate::client::ToolboxClient;
use crate::error::{Result, ToolboxError};
use crate::result::ToolResult;
use crate::tool::Tool;

/// Blocking toolbox client.
#[derive(Debug)]
pub struct BlockingToolboxClient {
    inner: ToolboxClient,
    runtime: Runtime,
}

impl BlockingToolboxClient {
    /// Wrap an async client.
    pub fn new(inner: ToolboxClient) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ToolboxError::config(format!("failed to start runtime: {e}")))?;
        Ok(Self { inner, runtime })
    }

    /// The wrapped async client.
    pub fn inner(&self) -> &ToolboxClient {
        &self.inner
    }

    pub fn list_tools(&self) -> Result<ToolCatalog> {
        self.runtime.block_on(self.inner.list_tools())
    }

    pub fn load_toolset(&self, toolset: &str) -> Result<ToolCatalog> {
        self.runtime.block_on(self.inner.load_toolset(toolset))
    }

    pub fn load_toolset_with_bindings(
        &self,
        toolset: &str,
        bindings: ToolsetBindings,
    ) -> Result<HashMap<String, Tool>> {
        self.runtime
            .block_on(self.inner.load_toolset_with_bindings(toolset, bindings))
    }

    pub fn load_tool(&self, name: &str) -> Result<Tool> {
        self.runtime.block_on(self.inner.load_tool(name))
    }

    pub fn invoke_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<ToolResult> {
        self.runtime.block_on(self.inner.invoke_tool(name, arguments))
    }

    /// Run a loaded tool to completion.
    pub fn execute(&self, tool: &Tool, arguments: Map<String, Value>) -> Result<ToolResult> {
        self.runtime.block_on(tool.execute(arguments))
    }
}

impl ToolboxClient {
    /// Blocking facade sharing this client's session.
    pub fn blocking(&self) -> Result<BlockingToolboxClient> {
        BlockingToolboxClient::new(self.clone())
    }
}
