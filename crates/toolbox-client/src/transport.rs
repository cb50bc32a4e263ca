//! HTTP transport and session management.
//!
//! Every request is a JSON-RPC message POSTed to the server. The first request
//! made through a transport (of any kind) performs the MCP handshake:
//!
//! ```text
//! POST <base>  initialize                 (protocol version, client info)
//! POST <base>  notifications/initialized  (response ignored)
//! ```
//!
//! The handshake runs at most once per transport. Concurrent first callers
//! wait on the same attempt; a failed attempt leaves the session
//! uninitialized so the next call tries again.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::OnceCell;

use crate::auth::{self, CredentialProvider};
use crate::catalog::{self, ToolCatalog};
use crate::error::{Result, ToolboxError};
use crate::protocol::{
    CallToolParams, ClientInfo, InitializeParams, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, MCP_PROTOCOL_VERSION, PROTOCOL_VERSION_HEADER, methods,
};
use crate::result::{self, ToolResult};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Operations the tool layer needs from a server connection.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// Fetch tool definitions, optionally scoped to a toolset.
    ///
    /// `None` or an empty name lists every tool.
    async fn list_tools(&self, toolset: Option<&str>) -> Result<ToolCatalog>;

    /// Call a tool.
    ///
    /// HTTP-status and JSON-RPC failures come back as error-flagged results;
    /// only failures to reach the server (or to establish the session) are `Err`.
    async fn invoke(
        &self,
        tool: &str,
        arguments: Map<String, Value>,
        headers: HashMap<String, String>,
    ) -> Result<ToolResult>;
}

/// Configuration for HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Base URL of the toolbox server.
    pub url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Static API key, sent as a bearer token.
    pub api_key: Option<String>,
    /// Identity sent in `initialize`.
    pub client_info: ClientInfo,
    /// Custom user agent.
    pub user_agent: Option<String>,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout: DEFAULT_TIMEOUT,
            api_key: None,
            client_info: ClientInfo::default(),
            user_agent: None,
        }
    }
}

impl HttpTransportConfig {
    /// Create a new HTTP transport config with the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the client identity.
    pub fn with_client_info(mut self, client_info: ClientInfo) -> Self {
        self.client_info = client_info;
        self
    }

    /// Set a custom user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// JSON-RPC over HTTP transport with a lazily established session.
pub struct HttpTransport {
    http: reqwest::Client,
    /// Base URL without a trailing slash.
    base_url: String,
    api_key: Option<String>,
    credentials: Option<Arc<dyn CredentialProvider>>,
    client_info: ClientInfo,
    /// Set once the handshake has succeeded. Never reset.
    session: OnceCell<()>,
    request_id: AtomicU64,
}

impl HttpTransport {
    /// Create a new HTTP transport.
    ///
    /// No network traffic happens here; the session is established by the
    /// first request.
    pub fn new(
        config: HttpTransportConfig,
        credentials: Option<Arc<dyn CredentialProvider>>,
    ) -> Result<Self> {
        if config.url.is_empty() {
            return Err(ToolboxError::config("base URL must be provided"));
        }
        url::Url::parse(&config.url)?;
        let base_url = config.url.trim_end_matches('/').to_string();

        let user_agent = config
            .user_agent
            .unwrap_or_else(|| format!("toolbox-client/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(user_agent)
            .pool_max_idle_per_host(5)
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        tracing::info!(
            url = %base_url,
            timeout_secs = config.timeout.as_secs(),
            "created HTTP transport"
        );

        Ok(Self {
            http,
            base_url,
            api_key: config.api_key,
            credentials,
            client_info: config.client_info,
            session: OnceCell::new(),
            request_id: AtomicU64::new(1),
        })
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if the handshake has completed.
    pub fn is_initialized(&self) -> bool {
        self.session.initialized()
    }

    fn next_request_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    fn toolset_url(&self, toolset: Option<&str>) -> String {
        match toolset.filter(|t| !t.is_empty()) {
            Some(name) => format!("{}/{}", self.base_url, name.trim_start_matches('/')),
            None => self.base_url.clone(),
        }
    }

    /// The `Authorization` header for one request. Resolved on every call.
    async fn authorization(&self, explicit: Option<&str>) -> Option<String> {
        auth::resolve_authorization(
            explicit,
            self.api_key.as_deref(),
            self.credentials.as_deref(),
            &self.base_url,
        )
        .await
    }

    /// Establish the session if it is not established yet.
    pub async fn ensure_initialized(&self, authorization: Option<&str>) -> Result<()> {
        self.session
            .get_or_try_init(|| self.handshake(authorization))
            .await?;
        Ok(())
    }

    async fn handshake(&self, authorization: Option<&str>) -> Result<()> {
        let params = InitializeParams::new(self.client_info.clone());
        let request = JsonRpcRequest::new(
            self.next_request_id(),
            methods::INITIALIZE,
            serde_json::to_value(&params)?,
        );

        let (status, body) = self
            .post(&self.base_url, &request, authorization, &[], false)
            .await?;
        if !(200..300).contains(&status) {
            return Err(ToolboxError::transport(status, body));
        }

        let response: JsonRpcResponse = serde_json::from_str(&body)?;
        let result = response
            .into_result()
            .map_err(|e| ToolboxError::protocol(e.code, e.message, e.data))?;

        let server = result
            .pointer("/serverInfo/name")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let protocol = result
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or(MCP_PROTOCOL_VERSION);
        tracing::info!(url = %self.base_url, server, protocol, "toolbox session initialized");

        let notification = JsonRpcNotification::new(methods::INITIALIZED, Value::Object(Map::new()));
        if let Err(e) = self
            .post(&self.base_url, &notification, authorization, &[], true)
            .await
        {
            tracing::warn!(error = %e, "failed to send initialized notification");
        }

        Ok(())
    }

    /// POST a JSON-RPC message and return the raw status and body.
    async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        authorization: Option<&str>,
        extra_headers: &[(&str, &str)],
        versioned: bool,
    ) -> Result<(u16, String)> {
        let json = serde_json::to_string(body)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if versioned {
            headers.insert(
                HeaderName::from_static(PROTOCOL_VERSION_HEADER),
                HeaderValue::from_static(MCP_PROTOCOL_VERSION),
            );
        }
        if let Some(auth) = authorization {
            let value = HeaderValue::from_str(auth)
                .map_err(|_| ToolboxError::InvalidHeader(AUTHORIZATION.to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }
        for (name, value) in extra_headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ToolboxError::InvalidHeader(name.to_string()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| ToolboxError::InvalidHeader(name.to_string()))?;
            headers.insert(header_name, header_value);
        }

        tracing::trace!(url = %url, json = %json, "sending toolbox request");

        let response = self.http.post(url).headers(headers).body(json).send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        tracing::trace!(status, json = %text, "received toolbox response");

        Ok((status, text))
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ToolTransport for HttpTransport {
    async fn list_tools(&self, toolset: Option<&str>) -> Result<ToolCatalog> {
        let authorization = self.authorization(None).await;
        self.ensure_initialized(authorization.as_deref()).await?;

        let url = self.toolset_url(toolset);
        let request = JsonRpcRequest::new(
            self.next_request_id(),
            methods::TOOLS_LIST,
            Value::Object(Map::new()),
        );
        let (status, body) = self
            .post(&url, &request, authorization.as_deref(), &[], true)
            .await?;

        let catalog = catalog::parse_list_response(status, &body)?;

        tracing::debug!(
            url = %url,
            toolset = toolset.unwrap_or_default(),
            tool_count = catalog.len(),
            "listed toolbox tools"
        );

        Ok(catalog)
    }

    async fn invoke(
        &self,
        tool: &str,
        arguments: Map<String, Value>,
        headers: HashMap<String, String>,
    ) -> Result<ToolResult> {
        let explicit = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(AUTHORIZATION.as_str()))
            .map(|(_, value)| value.as_str());
        let authorization = self.authorization(explicit).await;
        self.ensure_initialized(authorization.as_deref()).await?;

        let extra: Vec<(&str, &str)> = headers
            .iter()
            .filter(|(name, _)| !name.eq_ignore_ascii_case(AUTHORIZATION.as_str()))
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();

        let params = CallToolParams {
            name: tool.to_string(),
            arguments,
        };
        let request = JsonRpcRequest::new(
            self.next_request_id(),
            methods::TOOLS_CALL,
            serde_json::to_value(&params)?,
        );

        tracing::debug!(tool = %tool, header_count = extra.len(), "invoking toolbox tool");

        let (status, body) = self
            .post(&self.base_url, &request, authorization.as_deref(), &extra, true)
            .await?;
        let result = result::normalize(status, &body);

        if result.is_error() {
            tracing::warn!(tool = %tool, status, "tool call returned error");
        } else {
            tracing::debug!(tool = %tool, "tool call succeeded");
        }

        Ok(result)
    }
}
