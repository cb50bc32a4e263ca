//! Client for MCP Toolbox servers.
//!
//! Discovers the tools a toolbox server exposes, lets callers pre-bind
//! parameter values and auth token sources, and invokes tools over
//! JSON-RPC 2.0 on HTTP.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ToolboxClient                                              │
//! │  - list_tools / load_toolset / load_tool                    │
//! │  - Applies toolset bindings (strict or permissive)          │
//! └─────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Tool::execute                                              │
//! │  - Bound params → auth tokens → validation → dispatch       │
//! └─────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  HttpTransport (ToolTransport)                              │
//! │  - Lazy initialize handshake, at most once                  │
//! │  - tools/list, tools/call; responses normalized             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use toolbox_client::{StaticToken, ToolboxClient};
//!
//! let client = ToolboxClient::builder()
//!     .base_url("http://127.0.0.1:5000/mcp")
//!     .build()?;
//!
//! let mut tool = client.load_tool("get-row-by-id-auth").await?;
//! tool.bind_param("id", "2")
//!     .add_auth_token_getter("my-test-auth", StaticToken::new(id_token));
//!
//! let result = tool.execute(serde_json::Map::new()).await?;
//! println!("{}", result.text());
//! ```
//!
//! Tool-level failures (HTTP errors, JSON-RPC errors, `isError` results)
//! come back as a [`ToolResult`] with `is_error` set. Client-side failures
//! (validation, token getters, unreachable server) are [`ToolboxError`]s.

pub mod auth;
pub mod binding;
#[cfg(feature = "blocking")]
pub mod blocking;
pub mod catalog;
pub mod client;
pub mod config;
pub mod definition;
pub mod error;
pub mod protocol;
pub mod result;
pub mod tool;
pub mod transport;
pub mod validation;

#[cfg(test)]
mod testing;

pub use auth::{AuthTokenGetter, CredentialProvider, EnvIdTokenProvider, SharedTokenGetter, StaticToken};
pub use binding::{BoundValue, ToolsetBindings};
#[cfg(feature = "blocking")]
pub use blocking::BlockingToolboxClient;
pub use catalog::ToolCatalog;
pub use client::{ClientBuilder, ToolboxClient};
pub use config::ToolboxConfig;
pub use definition::{Parameter, ParameterType, ToolDefinition};
pub use error::{Result, ToolboxError, ValidationError};
pub use result::{ToolContent, ToolResult};
pub use tool::Tool;
pub use transport::{HttpTransport, HttpTransportConfig, ToolTransport};
