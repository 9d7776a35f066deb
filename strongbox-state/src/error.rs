//! State error types.

use strongbox_crypto::EncryptorError;
use strongbox_types::UserId;
use thiserror::Error;

/// Result type for state operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors raised by state stores.
///
/// Cloneable so one failure can be delivered to every subscriber of a
/// shared stream.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("no key available for user {0}")]
    KeyUnavailable(UserId),

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("cannot classify value: {0}")]
    Classification(String),

    #[error("state stream closed")]
    Closed,
}

impl From<serde_json::Error> for StateError {
    fn from(e: serde_json::Error) -> Self {
        StateError::Serialization(e.to_string())
    }
}

impl From<rusqlite::Error> for StateError {
    fn from(e: rusqlite::Error) -> Self {
        StateError::Storage(e.to_string())
    }
}

impl From<EncryptorError> for StateError {
    fn from(e: EncryptorError) -> Self {
        match e {
            EncryptorError::Unavailable(user) => StateError::KeyUnavailable(user),
            EncryptorError::Crypto(msg) => StateError::Crypto(msg),
        }
    }
}
