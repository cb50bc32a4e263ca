//! Loaded tools and the invocation pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::{Map, Value};

use crate::auth::{self, AuthTokenGetter, SharedTokenGetter};
use crate::binding::BoundValue;
use crate::definition::ToolDefinition;
use crate::error::{Result, ToolboxError};
use crate::result::ToolResult;
use crate::transport::ToolTransport;
use crate::validation;

/// Header name the pipeline stages for bearer tokens.
const AUTHORIZATION_HEADER: &str = "Authorization";

/// A callable tool: a definition plus pre-bound parameters and token getters.
///
/// Mutators take `&mut self` and are meant for setup, before the tool is
/// shared. `execute` only reads, so concurrent calls on one tool are fine.
#[derive(Clone)]
pub struct Tool {
    name: String,
    definition: Arc<ToolDefinition>,
    bound_parameters: HashMap<String, BoundValue>,
    auth_getters: HashMap<String, SharedTokenGetter>,
    transport: Arc<dyn ToolTransport>,
}

impl Tool {
    pub fn new(
        name: impl Into<String>,
        definition: impl Into<Arc<ToolDefinition>>,
        transport: Arc<dyn ToolTransport>,
    ) -> Self {
        Self {
            name: name.into(),
            definition: definition.into(),
            bound_parameters: HashMap::new(),
            auth_getters: HashMap::new(),
            transport,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    pub fn description(&self) -> &str {
        &self.definition.description
    }

    /// Names of parameters with a bound value.
    pub fn bound_parameters(&self) -> impl Iterator<Item = &str> {
        self.bound_parameters.keys().map(String::as_str)
    }

    /// Services with a registered token getter.
    pub fn auth_services(&self) -> impl Iterator<Item = &str> {
        self.auth_getters.keys().map(String::as_str)
    }

    /// Bind a fixed value. Replaces any earlier binding for `name`.
    pub fn bind_param(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.bind(name, BoundValue::literal(value))
    }

    /// Bind a value computed on every call.
    pub fn bind_param_with<F, V>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn() -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        self.bind(name, BoundValue::producer(f))
    }

    pub fn bind(&mut self, name: impl Into<String>, value: BoundValue) -> &mut Self {
        self.bound_parameters.insert(name.into(), value);
        self
    }

    /// Register the token getter for `service`. Replaces any earlier one.
    pub fn add_auth_token_getter<G>(&mut self, service: impl Into<String>, getter: G) -> &mut Self
    where
        G: AuthTokenGetter + 'static,
    {
        self.add_shared_auth_token_getter(service, Arc::new(getter))
    }

    pub fn add_shared_auth_token_getter(
        &mut self,
        service: impl Into<String>,
        getter: SharedTokenGetter,
    ) -> &mut Self {
        self.auth_getters.insert(service.into(), getter);
        self
    }

    /// Run the tool.
    ///
    /// Bound values override caller arguments. Token getters run
    /// concurrently; each token fills the first parameter declared for its
    /// service and is staged as `Authorization` and `<service>_token`
    /// headers. With several services the last token to arrive owns
    /// `Authorization`. Any getter failure aborts the call before dispatch,
    /// as does validation.
    pub async fn execute(&self, args: Map<String, Value>) -> Result<ToolResult> {
        let mut arguments = args;
        for (name, bound) in &self.bound_parameters {
            arguments.insert(name.clone(), bound.resolve());
        }

        let headers = self.resolve_auth(&mut arguments).await?;

        validation::validate_and_sanitize(&mut arguments, &self.definition, &self.name)?;

        tracing::debug!(
            tool = %self.name,
            bound = self.bound_parameters.len(),
            auth_services = self.auth_getters.len(),
            "dispatching tool call"
        );

        self.transport.invoke(&self.name, arguments, headers).await
    }

    /// Await every getter, applying tokens in completion order.
    async fn resolve_auth(
        &self,
        arguments: &mut Map<String, Value>,
    ) -> Result<HashMap<String, String>> {
        let mut headers = HashMap::new();
        if self.auth_getters.is_empty() {
            return Ok(headers);
        }

        let mut pending: FuturesUnordered<_> = self
            .auth_getters
            .iter()
            .map(|(service, getter)| async move { (service.as_str(), getter.get_token().await) })
            .collect();

        let mut first_error = None;
        while let Some((service, token)) = pending.next().await {
            match token {
                Ok(token) => {
                    if let Some(param) = self.definition.parameter_for_service(service) {
                        arguments.insert(param.name.clone(), Value::String(token.clone()));
                    }
                    headers.insert(
                        AUTHORIZATION_HEADER.to_string(),
                        format!("{}{token}", auth::BEARER_PREFIX),
                    );
                    headers.insert(auth::service_token_header(service), token);
                }
                Err(source) => {
                    tracing::warn!(tool = %self.name, service, error = %source, "auth token getter failed");
                    if first_error.is_none() {
                        first_error = Some(ToolboxError::AuthToken {
                            service: service.to_string(),
                            source,
                        });
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(headers),
        }
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("definition", &self.definition)
            .field("bound_parameters", &self.bound_parameters)
            .field("auth_services", &self.auth_getters.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;
    use crate::definition::{Parameter, ParameterType};
    use crate::testing::{RecordingTransport, args};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    fn tool(definition: ToolDefinition) -> (Tool, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::default());
        let tool = Tool::new("test-tool", definition, transport.clone());
        (tool, transport)
    }

    fn n_rows() -> ToolDefinition {
        ToolDefinition::new(
            "Get n rows",
            vec![Parameter::new("num_rows", ParameterType::String).required()],
        )
    }

    fn authenticated() -> ToolDefinition {
        ToolDefinition::new(
            "Needs auth",
            vec![
                Parameter::new("id", ParameterType::String),
                Parameter::new("email", ParameterType::String)
                    .required()
                    .with_auth_source("my-test-auth"),
            ],
        )
    }

    #[tokio::test]
    async fn test_bound_value_overrides_argument() {
        let (mut tool, transport) = tool(n_rows());
        tool.bind_param("num_rows", "3");

        tool.execute(args(json!({"num_rows": "9"}))).await.unwrap();

        assert_eq!(transport.last_call().arguments["num_rows"], json!("3"));
    }

    #[tokio::test]
    async fn test_later_binding_wins() {
        let (mut tool, transport) = tool(n_rows());
        tool.bind_param("num_rows", "1").bind_param("num_rows", "2");

        tool.execute(Map::new()).await.unwrap();

        assert_eq!(transport.last_call().arguments["num_rows"], json!("2"));
    }

    #[tokio::test]
    async fn test_producer_runs_per_call() {
        let (mut tool, transport) = tool(n_rows());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        tool.bind_param_with("num_rows", move || {
            (counter.fetch_add(1, Ordering::SeqCst) + 1).to_string()
        });

        tool.execute(Map::new()).await.unwrap();
        tool.execute(Map::new()).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let sent: Vec<Value> = transport
            .calls()
            .into_iter()
            .map(|c| c.arguments["num_rows"].clone())
            .collect();
        assert_eq!(sent, vec![json!("1"), json!("2")]);
    }

    #[tokio::test]
    async fn test_null_argument_same_as_omitted() {
        let definition = ToolDefinition::new(
            "",
            vec![
                Parameter::new("num_rows", ParameterType::String).required(),
                Parameter::new("filter", ParameterType::String),
            ],
        );
        let (tool, transport) = tool(definition);

        tool.execute(args(json!({"num_rows": "1", "filter": null})))
            .await
            .unwrap();
        tool.execute(args(json!({"num_rows": "1"}))).await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls[0].arguments, calls[1].arguments);
        assert!(!calls[0].arguments.contains_key("filter"));
    }

    #[tokio::test]
    async fn test_validation_failure_is_not_dispatched() {
        let (tool, transport) = tool(n_rows());

        let err = tool.execute(Map::new()).await.unwrap_err();

        assert!(err.is_validation_error());
        assert_eq!(
            err.to_string(),
            "Missing required parameter 'num_rows' for tool 'test-tool'."
        );
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_auth_token_fills_parameter_and_headers() {
        let (mut tool, transport) = tool(authenticated());
        tool.add_auth_token_getter("my-test-auth", StaticToken::new("tok-123"));

        tool.execute(args(json!({"id": "2"}))).await.unwrap();

        let call = transport.last_call();
        assert_eq!(call.arguments["email"], json!("tok-123"));
        assert_eq!(call.arguments["id"], json!("2"));
        assert_eq!(call.headers["Authorization"], "Bearer tok-123");
        assert_eq!(call.headers["my-test-auth_token"], "tok-123");
    }

    #[tokio::test]
    async fn test_token_without_matching_parameter_only_sets_headers() {
        let (mut tool, transport) = tool(n_rows());
        tool.bind_param("num_rows", "1");
        tool.add_auth_token_getter("other", || async { Ok::<_, anyhow::Error>("t".to_string()) });

        tool.execute(Map::new()).await.unwrap();

        let call = transport.last_call();
        assert_eq!(call.arguments.len(), 1);
        assert_eq!(call.headers["other_token"], "t");
        assert_eq!(call.headers["Authorization"], "Bearer t");
    }

    #[tokio::test]
    async fn test_missing_getter_fails_validation() {
        let (tool, transport) = tool(authenticated());

        let err = tool.execute(args(json!({"id": "2"}))).await.unwrap_err();

        assert!(matches!(
            err,
            ToolboxError::Validation(crate::error::ValidationError::MissingRequired { ref parameter, .. })
                if parameter == "email"
        ));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_injected_token_is_type_checked() {
        let definition = ToolDefinition::new(
            "",
            vec![Parameter::new("user_id", ParameterType::Integer).with_auth_source("svc")],
        );
        let (mut tool, transport) = tool(definition);
        tool.add_auth_token_getter("svc", StaticToken::new("not-a-number"));

        let err = tool.execute(Map::new()).await.unwrap_err();

        assert!(err.is_validation_error());
        assert!(transport.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_getter_failure_aborts_after_all_complete() {
        let (mut tool, transport) = tool(authenticated());
        let slow_done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&slow_done);

        tool.add_auth_token_getter("broken", || async {
            Err::<String, _>(anyhow::anyhow!("token endpoint unavailable"))
        });
        tool.add_auth_token_getter("my-test-auth", move || {
            let flag = Arc::clone(&flag);
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                flag.store(true, Ordering::SeqCst);
                Ok::<_, anyhow::Error>("late".to_string())
            }
        });

        let err = tool.execute(args(json!({"id": "1"}))).await.unwrap_err();

        match err {
            ToolboxError::AuthToken { service, source } => {
                assert_eq!(service, "broken");
                assert_eq!(source.to_string(), "token endpoint unavailable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(slow_done.load(Ordering::SeqCst));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_completed_token_owns_authorization() {
        let (mut tool, transport) = tool(n_rows());
        tool.bind_param("num_rows", "1");
        tool.add_auth_token_getter("slow", || async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok::<_, anyhow::Error>("slow-token".to_string())
        });
        tool.add_auth_token_getter("fast", || async {
            Ok::<_, anyhow::Error>("fast-token".to_string())
        });

        tool.execute(Map::new()).await.unwrap();

        let call = transport.last_call();
        assert_eq!(call.headers["Authorization"], "Bearer slow-token");
        assert_eq!(call.headers["slow_token"], "slow-token");
        assert_eq!(call.headers["fast_token"], "fast-token");
    }

    #[tokio::test]
    async fn test_caller_arguments_not_shared_between_calls() {
        let (mut tool, transport) = tool(n_rows());
        tool.bind_param("num_rows", "5");
        let caller = args(json!({"extra": 1}));

        tool.execute(caller.clone()).await.unwrap();

        assert_eq!(caller, args(json!({"extra": 1})));
        assert_eq!(transport.last_call().arguments["extra"], json!(1));
    }

    #[test]
    fn test_debug_hides_getters() {
        let (mut tool, _) = tool(n_rows());
        tool.add_auth_token_getter("svc", StaticToken::new("secret"));
        let debug = format!("{tool:?}");
        assert!(debug.contains("test-tool"));
        assert!(!debug.contains("secret"));
    }
}
