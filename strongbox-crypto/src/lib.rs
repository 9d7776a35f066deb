//! Encryption layer for Strongbox.
//!
//! Provides:
//! - Argon2id key derivation from a user's password
//! - ChaCha20-Poly1305 authenticated encryption, sealed as base64 strings
//! - [`KeyService`], the in-memory registry of unlocked user keys, exposed
//!   to the state layer through the [`UserEncryptor`] trait
//! - [`EntropySource`], the uniform random-number primitive behind every
//!   generated credential

mod cipher;
pub mod encryptor;
mod entropy;
mod error;
mod key;
mod key_service;

pub use cipher::{
    EncryptedData, NONCE_SIZE, TAG_SIZE, decrypt, decrypt_string, encrypt, encrypt_string,
};
pub use encryptor::{EncryptorError, EncryptorResult, UserEncryptor};
pub use entropy::{EntropySource, OsEntropy};
pub use error::{CryptoError, CryptoResult};
pub use key::{DerivedKey, KEY_SIZE, KdfParams, SALT_SIZE, Salt, derive_key, generate_random_key};
pub use key_service::KeyService;
