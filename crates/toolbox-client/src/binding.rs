//! Parameter and auth bindings.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde_json::Value;

use crate::auth::{AuthTokenGetter, SharedTokenGetter};
use crate::catalog::ToolCatalog;

/// A value pre-bound to a tool parameter.
#[derive(Clone)]
pub enum BoundValue {
    /// Sent as-is on every call.
    Literal(Value),
    /// Called on every `execute`; its result is sent.
    Producer(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl BoundValue {
    /// Bind a fixed value.
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// Bind a value computed at call time.
    pub fn producer<F, V>(f: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        Self::Producer(Arc::new(move || f().into()))
    }

    /// The value to send for this call.
    pub fn resolve(&self) -> Value {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Producer(f) => f(),
        }
    }
}

impl std::fmt::Debug for BoundValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

/// Bindings to apply when loading a whole toolset.
///
/// Keys are tool names. In strict mode, a binding for a tool the server does
/// not expose fails the load; otherwise such bindings are ignored.
#[derive(Clone, Default)]
pub struct ToolsetBindings {
    pub(crate) params: HashMap<String, HashMap<String, BoundValue>>,
    pub(crate) auth: HashMap<String, HashMap<String, SharedTokenGetter>>,
    pub(crate) strict: bool,
}

impl ToolsetBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a fixed value to `param` of `tool`.
    pub fn bind_param(
        mut self,
        tool: impl Into<String>,
        param: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.params
            .entry(tool.into())
            .or_default()
            .insert(param.into(), BoundValue::literal(value));
        self
    }

    /// Bind a call-time value to `param` of `tool`.
    pub fn bind_param_with<F, V>(
        mut self,
        tool: impl Into<String>,
        param: impl Into<String>,
        f: F,
    ) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        self.params
            .entry(tool.into())
            .or_default()
            .insert(param.into(), BoundValue::producer(f));
        self
    }

    /// Register a token getter for `service` on `tool`.
    pub fn add_auth_token_getter<G>(
        mut self,
        tool: impl Into<String>,
        service: impl Into<String>,
        getter: G,
    ) -> Self
    where
        G: AuthTokenGetter + 'static,
    {
        self.auth
            .entry(tool.into())
            .or_default()
            .insert(service.into(), Arc::new(getter));
        self
    }

    /// Reject bindings for unknown tools instead of ignoring them.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Tool names referenced by any binding.
    pub fn bound_tools(&self) -> BTreeSet<&str> {
        self.params
            .keys()
            .chain(self.auth.keys())
            .map(String::as_str)
            .collect()
    }

    /// Referenced tool names absent from `catalog`, sorted.
    pub fn unknown_tools(&self, catalog: &ToolCatalog) -> Vec<String> {
        self.bound_tools()
            .into_iter()
            .filter(|name| !catalog.contains_key(*name))
            .map(str::to_string)
            .collect()
    }
}

impl std::fmt::Debug for ToolsetBindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolsetBindings")
            .field("params", &self.params)
            .field(
                "auth",
                &self
                    .auth
                    .iter()
                    .map(|(tool, getters)| (tool, getters.keys().collect::<Vec<_>>()))
                    .collect::<HashMap<_, _>>(),
            )
            .field("strict", &self.strict)
            .finish()
    }
}
