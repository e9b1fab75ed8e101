//! Error types for the DNS sync system
//!
//! Every per-request failure is recoverable: the request stays pending and is
//! picked up again on the next pass. Only configuration errors are fatal, and
//! only at startup.

use thiserror::Error;

/// Result type alias for DNS sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DNS sync system
#[derive(Error, Debug)]
pub enum Error {
    /// Request content is malformed; detected before any provider call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Update/delete target does not exist at the provider
    #[error("No provider record named {name}")]
    LookupMiss {
        /// Fully-qualified name that was looked up
        name: String,
    },

    /// More than one provider record shares the looked-up name
    #[error("{count} provider records named {name}; refusing to pick one")]
    AmbiguousMatch {
        /// Fully-qualified name that was looked up
        name: String,
        /// Number of matches returned
        count: usize,
    },

    /// Provider answered but did not report success
    #[error("Provider rejected {operation} (status {status}): {body}")]
    ProviderRejected {
        /// Provider call that was rejected (e.g. "create", "find")
        operation: String,
        /// HTTP status code
        status: u16,
        /// Raw response body, kept for diagnosis
        body: String,
    },

    /// Network, timeout or HTTP-layer failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Record store errors
    #[error("Record store error: {0}")]
    Store(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a lookup-miss error
    pub fn lookup_miss(name: impl Into<String>) -> Self {
        Self::LookupMiss { name: name.into() }
    }

    /// Create an ambiguous-match error
    pub fn ambiguous(name: impl Into<String>, count: usize) -> Self {
        Self::AmbiguousMatch {
            name: name.into(),
            count,
        }
    }

    /// Create a provider-rejected error
    pub fn rejected(operation: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::ProviderRejected {
            operation: operation.into(),
            status,
            body: body.into(),
        }
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a record store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether retrying on a later pass cannot change the outcome
    ///
    /// Only malformed request content qualifies: the row itself must be
    /// fixed. Everything else depends on provider or network state.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Short machine-friendly label used in logs and reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::LookupMiss { .. } => "lookup_miss",
            Self::AmbiguousMatch { .. } => "ambiguous_match",
            Self::ProviderRejected { .. } => "provider_rejected",
            Self::Transport(_) => "transport",
            Self::Store(_) => "store",
            Self::Config(_) => "config",
            Self::Json(_) => "json",
            Self::Other(_) => "other",
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
