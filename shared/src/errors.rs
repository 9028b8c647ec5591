//! Error types shared by every layer.
//!
//! `BotError` is the closed set callers see. `ServiceError` describes what
//! went wrong talking to a remote service (embedding or completion) and is
//! mapped into `BotError` by the application layer.

use thiserror::Error;

/// Errors surfaced to the user.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BotError {
    /// Missing credential, malformed template or invalid setting
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Index file missing, corrupt or built with an incompatible model
    #[error("Failed to load index at {path}: {reason}")]
    IndexLoad { path: String, reason: String },

    /// A single turn failed; the session stays usable
    #[error("Query failed: {0}")]
    QueryExecution(String),

    /// Building the index from documents failed
    #[error("Ingestion failed: {0}")]
    Ingestion(String),
}

impl BotError {
    pub fn index_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        BotError::IndexLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Get error code for logging
    pub fn error_code(&self) -> &'static str {
        match self {
            BotError::Configuration(_) => "CONFIGURATION",
            BotError::IndexLoad { .. } => "INDEX_LOAD",
            BotError::QueryExecution(_) => "QUERY_EXECUTION",
            BotError::Ingestion(_) => "INGESTION",
        }
    }

    /// Fatal errors end the interactive session; query errors do not.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, BotError::QueryExecution(_))
    }
}

/// Failures talking to an HTTP service.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("API key not found. Set {env_var} environment variable")]
    MissingCredential { env_var: String },

    #[error("Request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Network error: {0}")]
    Transport(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl ServiceError {
    /// Timeouts, connection failures, rate limiting and server errors may
    /// succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            ServiceError::Timeout { .. } | ServiceError::Transport(_) => true,
            ServiceError::Api { status, .. } => *status == 429 || *status >= 500,
            ServiceError::MissingCredential { .. } | ServiceError::MalformedResponse(_) => false,
        }
    }
}

impl From<ServiceError> for BotError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::MissingCredential { .. } => BotError::Configuration(err.to_string()),
            other => BotError::QueryExecution(other.to_string()),
        }
    }
}
