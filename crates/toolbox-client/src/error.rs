//! Error types for toolbox operations.

use thiserror::Error;

/// Result type for toolbox operations.
pub type Result<T> = std::result::Result<T, ToolboxError>;

/// Argument validation failures raised before a tool is dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required parameter was absent (or null) after bindings were applied.
    #[error("Missing required parameter '{parameter}' for tool '{tool}'.")]
    MissingRequired {
        /// Parameter name.
        parameter: String,
        /// Tool name.
        tool: String,
    },

    /// A parameter value does not match the declared schema type.
    #[error("Parameter '{parameter}' expected type '{expected}' but got '{actual}'.")]
    TypeMismatch {
        /// Parameter name.
        parameter: String,
        /// Type declared by the server.
        expected: String,
        /// JSON type of the supplied value.
        actual: String,
    },
}

impl ValidationError {
    /// Name of the offending parameter.
    pub fn parameter(&self) -> &str {
        match self {
            Self::MissingRequired { parameter, .. } | Self::TypeMismatch { parameter, .. } => {
                parameter
            }
        }
    }
}

/// Error type for toolbox operations.
#[derive(Debug, Error)]
pub enum ToolboxError {
    /// The HTTP request could not be completed (connection, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered a catalog or handshake request with a non-success status.
    #[error("transport error {status}: {body}")]
    Transport {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The server returned a JSON-RPC error object.
    #[error("protocol error {code}: {message}")]
    Protocol {
        /// Error code from the server.
        code: i64,
        /// Error message from the server.
        message: String,
        /// Optional additional data.
        data: Option<serde_json::Value>,
    },

    /// The response was valid JSON but not the expected envelope.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Strict toolset load referenced tools the server does not expose.
    #[error("strict mode error: bindings provided for unknown tools: {}", .unknown_tools.join(", "))]
    Binding {
        /// Sorted names of the unknown tools.
        unknown_tools: Vec<String>,
    },

    /// Arguments failed schema validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An auth token provider failed.
    #[error("failed to resolve auth token for service '{service}': {source}")]
    AuthToken {
        /// Service the provider was registered for.
        service: String,
        /// Underlying provider error.
        #[source]
        source: anyhow::Error,
    },

    /// The requested tool is not in the catalog.
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// A header name or value could not be encoded.
    #[error("invalid header '{0}'")]
    InvalidHeader(String),

    /// URL parsing failed.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadConfig {
        /// File path.
        path: String,
        /// IO error.
        source: std::io::Error,
    },

    /// Failed to parse a TOML config.
    #[error("failed to parse config: {0}")]
    ParseConfig(#[from] toml::de::Error),
}

impl ToolboxError {
    /// Create a protocol error from a JSON-RPC error object.
    pub fn protocol(code: i64, message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self::Protocol {
            code,
            message: message.into(),
            data,
        }
    }

    /// Create a transport error from a status code and body.
    pub fn transport(status: u16, body: impl Into<String>) -> Self {
        Self::Transport {
            status,
            body: body.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Check if this is a validation error.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a strict-mode binding error.
    pub fn is_binding_error(&self) -> bool {
        matches!(self, Self::Binding { .. })
    }

    /// Check if this error came from the network or an HTTP status.
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Transport { .. })
    }

    /// The HTTP status, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
