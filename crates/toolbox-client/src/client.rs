//! The toolbox client: tool discovery and loading.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::auth::{CredentialProvider, SharedTokenGetter};
use crate::binding::ToolsetBindings;
use crate::catalog::ToolCatalog;
use crate::error::{Result, ToolboxError};
use crate::protocol::ClientInfo;
use crate::result::ToolResult;
use crate::tool::Tool;
use crate::transport::{HttpTransport, HttpTransportConfig, ToolTransport};

/// Entry point for talking to a toolbox server.
///
/// Cheap to clone; clones share one transport and therefore one session.
#[derive(Clone)]
pub struct ToolboxClient {
    transport: Arc<dyn ToolTransport>,
}

impl ToolboxClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Client for `base_url` with default settings.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::builder().base_url(base_url).build()
    }

    /// Client over a custom transport.
    pub fn with_transport(transport: Arc<dyn ToolTransport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn ToolTransport> {
        &self.transport
    }

    /// Every tool the server exposes.
    pub async fn list_tools(&self) -> Result<ToolCatalog> {
        self.transport.list_tools(None).await
    }

    /// Definitions of the tools in `toolset`. An empty name means the default
    /// toolset.
    pub async fn load_toolset(&self, toolset: &str) -> Result<ToolCatalog> {
        self.transport.list_tools(Some(toolset)).await
    }

    /// Load `toolset` as callable tools with bindings applied.
    ///
    /// Every listed tool is returned. Tools without bindings come back
    /// unbound. In strict mode, bindings naming unlisted tools fail the load
    /// with [`ToolboxError::Binding`]; otherwise they are dropped.
    pub async fn load_toolset_with_bindings(
        &self,
        toolset: &str,
        bindings: ToolsetBindings,
    ) -> Result<HashMap<String, Tool>> {
        let catalog = self.load_toolset(toolset).await?;

        let unknown_tools = bindings.unknown_tools(&catalog);
        if !unknown_tools.is_empty() {
            if bindings.strict {
                return Err(ToolboxError::Binding { unknown_tools });
            }
            tracing::debug!(
                toolset,
                unknown = ?unknown_tools,
                "ignoring bindings for unknown tools"
            );
        }

        let ToolsetBindings {
            mut params,
            mut auth,
            ..
        } = bindings;

        let tools = catalog
            .into_iter()
            .map(|(name, definition)| {
                let mut tool = Tool::new(name.clone(), definition, Arc::clone(&self.transport));
                for (param, value) in params.remove(&name).unwrap_or_default() {
                    tool.bind(param, value);
                }
                for (service, getter) in auth.remove(&name).unwrap_or_default() {
                    tool.add_shared_auth_token_getter(service, getter);
                }
                (name, tool)
            })
            .collect::<HashMap<_, _>>();

        tracing::debug!(toolset, tool_count = tools.len(), "loaded toolset");

        Ok(tools)
    }

    /// Load a single tool by name.
    pub async fn load_tool(&self, name: &str) -> Result<Tool> {
        self.load_tool_with_auth(name, HashMap::new()).await
    }

    /// Load a single tool and register token getters keyed by service.
    pub async fn load_tool_with_auth(
        &self,
        name: &str,
        auth_getters: HashMap<String, SharedTokenGetter>,
    ) -> Result<Tool> {
        let mut catalog = self.list_tools().await?;
        let definition = catalog
            .remove(name)
            .ok_or_else(|| ToolboxError::ToolNotFound(name.to_string()))?;

        let mut tool = Tool::new(name, definition, Arc::clone(&self.transport));
        for (service, getter) in auth_getters {
            tool.add_shared_auth_token_getter(service, getter);
        }
        Ok(tool)
    }

    /// Call a tool directly, bypassing bindings and validation.
    pub async fn invoke_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<ToolResult> {
        self.invoke_tool_with_headers(name, arguments, HashMap::new())
            .await
    }

    /// Call a tool directly with extra request headers.
    ///
    /// An `Authorization` entry replaces the client-wide credential for this
    /// request.
    pub async fn invoke_tool_with_headers(
        &self,
        name: &str,
        arguments: Map<String, Value>,
        headers: HashMap<String, String>,
    ) -> Result<ToolResult> {
        self.transport.invoke(name, arguments, headers).await
    }
}

impl std::fmt::Debug for ToolboxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolboxClient").finish_non_exhaustive()
    }
}

/// Builder for [`ToolboxClient`].
#[derive(Default)]
pub struct ClientBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    client_info: Option<ClientInfo>,
    credentials: Option<Arc<dyn CredentialProvider>>,
}

impl ClientBuilder {
    /// Server base URL. Required.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Static API key sent as `Authorization: Bearer <key>`.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Request timeout (default: 30 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Identity sent in `initialize`.
    pub fn client_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.client_info = Some(ClientInfo {
            name: name.into(),
            version: version.into(),
        });
        self
    }

    /// Fallback identity-token source, consulted when no API key is set.
    pub fn credential_provider(mut self, provider: impl CredentialProvider + 'static) -> Self {
        self.credentials = Some(Arc::new(provider));
        self
    }

    /// Build the client. No request is made until the first operation.
    pub fn build(self) -> Result<ToolboxClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| ToolboxError::config("base URL must be provided"))?;

        let mut config = HttpTransportConfig::new(base_url);
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        if let Some(key) = self.api_key {
            config = config.with_api_key(key);
        }
        if let Some(ua) = self.user_agent {
            config = config.with_user_agent(ua);
        }
        if let Some(info) = self.client_info {
            config = config.with_client_info(info);
        }

        let transport = HttpTransport::new(config, self.credentials)?;
        Ok(ToolboxClient::with_transport(Arc::new(transport)))
    }
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .field("timeout", &self.timeout)
            .field("has_credentials", &self.credentials.is_some())
            .finish_non_exhaustive()
    }
}
