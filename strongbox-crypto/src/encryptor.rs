//! Per-user encryption seam used by the state layer.
//!
//! State code never touches key material directly. It hands plaintext bytes
//! to a [`UserEncryptor`] together with the owning user's id and gets back an
//! opaque sealed string.

use strongbox_types::UserId;
use thiserror::Error;
use tokio::sync::watch;

pub type EncryptorResult<T> = Result<T, EncryptorError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncryptorError {
    /// The user's key is not loaded (locked or logged out).
    #[error("no key available for user {0}")]
    Unavailable(UserId),

    #[error("crypto error: {0}")]
    Crypto(String),
}

pub trait UserEncryptor: Send + Sync {
    fn encrypt_bytes(&self, user_id: &UserId, plaintext: &[u8]) -> EncryptorResult<String>;

    fn decrypt_bytes(&self, user_id: &UserId, sealed: &str) -> EncryptorResult<Vec<u8>>;

    fn is_available(&self, user_id: &UserId) -> bool;

    /// Emits `true` while the user's key is loaded.
    fn watch_available(&self, user_id: &UserId) -> watch::Receiver<bool>;
}
