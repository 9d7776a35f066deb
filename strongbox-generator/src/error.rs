//! Generator error types.

use crate::options::Forwarder;
use strongbox_state::StateError;
use thiserror::Error;

/// Result type for policy evaluation.
pub type PolicyResult<T> = Result<T, PolicyError>;

/// Result type for forwarder calls.
pub type ForwarderResult<T> = Result<T, ForwarderError>;

/// Result type for generator operations.
pub type GeneratorResult<T> = Result<T, GeneratorError>;

/// Errors raised while turning policy records into an evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("policy type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("malformed policy data: {0}")]
    Malformed(String),
}

/// Errors reported by an email forwarding service. Every variant names the
/// service that produced it.
#[derive(Debug, Error)]
pub enum ForwarderError {
    #[error("{forwarder}: an API token is required")]
    MissingToken { forwarder: Forwarder },

    #[error("{forwarder}: the API token was rejected")]
    InvalidToken { forwarder: Forwarder },

    #[error("{forwarder}: request failed with status {status}: {message}")]
    Rejected {
        forwarder: Forwarder,
        status: u16,
        message: String,
    },

    #[error("{forwarder}: a domain is required")]
    MissingDomain { forwarder: Forwarder },

    #[error("{forwarder}: a server URL is required")]
    MissingUrl { forwarder: Forwarder },

    #[error("{forwarder}: no masked email account is available")]
    MissingAccountId { forwarder: Forwarder },

    #[error("{forwarder}: unexpected response: {message}")]
    Malformed {
        forwarder: Forwarder,
        message: String,
    },

    #[error("{forwarder}: HTTP error: {source}")]
    Http {
        forwarder: Forwarder,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl ForwarderError {
    /// The service the error came from, when there is one.
    pub fn forwarder(&self) -> Option<Forwarder> {
        match self {
            Self::MissingToken { forwarder }
            | Self::InvalidToken { forwarder }
            | Self::Rejected { forwarder, .. }
            | Self::MissingDomain { forwarder }
            | Self::MissingUrl { forwarder }
            | Self::MissingAccountId { forwarder }
            | Self::Malformed { forwarder, .. }
            | Self::Http { forwarder, .. } => Some(*forwarder),
            Self::Client(_) => None,
        }
    }
}

/// Errors that can occur while generating or persisting credentials.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Forwarder(#[from] ForwarderError),

    #[error("state error: {0}")]
    State(#[from] StateError),

    #[error("at least one character set must be enabled")]
    NoCharacterSet,

    #[error("word list is empty")]
    EmptyWordList,

    #[error("invalid configuration: {0}")]
    Config(String),
}
