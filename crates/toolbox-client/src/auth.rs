//! Authentication sources.
//!
//! Two kinds of credentials flow through the client:
//!
//! - [`AuthTokenGetter`]s registered per service on a [`Tool`](crate::Tool).
//!   Their tokens fill authenticated parameters and are sent as headers.
//! - The client-wide `Authorization` header, resolved fresh for every request
//!   from an explicit header, a static API key, or a [`CredentialProvider`].

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

/// Prefix for bearer credentials.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Suffix of the per-service token header (`<service>_token`).
pub const SERVICE_TOKEN_HEADER_SUFFIX: &str = "_token";

/// Produces a token for one auth service.
///
/// How the token is obtained is up to the implementation; the client only
/// awaits it. Closures returning a future of `anyhow::Result<String>`
/// implement this trait.
#[async_trait]
pub trait AuthTokenGetter: Send + Sync {
    /// Fetch a token.
    async fn get_token(&self) -> anyhow::Result<String>;
}

/// Shared auth token getter.
pub type SharedTokenGetter = Arc<dyn AuthTokenGetter>;

#[async_trait]
impl<F, Fut> AuthTokenGetter for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
{
    async fn get_token(&self) -> anyhow::Result<String> {
        (self)().await
    }
}

/// A fixed token.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(***)")
    }
}

#[async_trait]
impl AuthTokenGetter for StaticToken {
    async fn get_token(&self) -> anyhow::Result<String> {
        Ok(self.0.clone())
    }
}

/// Supplies a default identity token when no API key is configured.
///
/// `audience` is the server base URL. Returning `Ok(None)` means no
/// credential is available; errors are logged and treated the same way.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn id_token(&self, audience: &str) -> anyhow::Result<Option<String>>;
}

/// Reads an identity token from an environment variable on every call.
#[derive(Debug, Clone)]
pub struct EnvIdTokenProvider {
    var: String,
}

impl EnvIdTokenProvider {
    /// Default variable name.
    pub const DEFAULT_VAR: &'static str = "TOOLBOX_ID_TOKEN";

    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvIdTokenProvider {
    fn default() -> Self {
        Self::new(Self::DEFAULT_VAR)
    }
}

#[async_trait]
impl CredentialProvider for EnvIdTokenProvider {
    async fn id_token(&self, _audience: &str) -> anyhow::Result<Option<String>> {
        Ok(std::env::var(&self.var).ok().filter(|t| !t.is_empty()))
    }
}

/// Prefix `token` with `Bearer ` unless it already carries the prefix.
pub fn bearer(token: &str) -> String {
    if token.starts_with(BEARER_PREFIX) {
        token.to_string()
    } else {
        format!("{BEARER_PREFIX}{token}")
    }
}

/// Name of the convention header carrying a service's raw token.
pub fn service_token_header(service: &str) -> String {
    format!("{service}{SERVICE_TOKEN_HEADER_SUFFIX}")
}

/// Resolve the `Authorization` header for one request.
///
/// Order: explicit header, static API key, credential provider, none.
pub async fn resolve_authorization(
    explicit: Option<&str>,
    api_key: Option<&str>,
    provider: Option<&dyn CredentialProvider>,
    audience: &str,
) -> Option<String> {
    if let Some(header) = explicit {
        return Some(header.to_string());
    }
    if let Some(key) = api_key.filter(|k| !k.is_empty()) {
        return Some(bearer(key));
    }
    let provider = provider?;
    match provider.id_token(audience).await {
        Ok(Some(token)) => Some(bearer(&token)),
        Ok(None) => None,
        Err(e) => {
            tracing::debug!(error = %e, "default credentials unavailable, proceeding without auth");
            None
        }
    }
}
