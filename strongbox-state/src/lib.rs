//! Per-user reactive state for Strongbox.
//!
//! # Architecture
//!
//! - [`StateProvider`] owns every live `(user, key)` slot and the storage
//!   backend behind them. Reads are [`StateStream`]s over a watch channel;
//!   writes are serialized per slot.
//! - [`SecretState`] layers field-level classification and per-item
//!   encryption on top of a plain slot, sharing one decrypted cache among
//!   subscribers.
//! - [`BufferedState`] fronts any [`ActiveState`] with a buffer that is
//!   rolled over into it at most once, gated by a dependency.

mod buffered;
mod classifier;
pub mod config;
mod error;
mod key_definition;
mod provider;
mod secret_key;
mod secret_state;
pub mod storage;
mod stream;

pub use buffered::{BufferedKeyDefinition, BufferedState, Truthy};
pub use classifier::{Classified, SecretClassifier};
pub use config::{DEFAULT_CLEANUP_DELAY, StateConfig};
pub use error::{StateError, StateResult};
pub use key_definition::{ClearEvent, StateLocation, StateValue, StorageKey, UserKeyDefinition};
pub use provider::{ActiveState, StateProvider, UpdateOptions, UserState};
pub use secret_key::{
    ArrayLayout, ClassifiedFormat, RecordLayout, SecretKeyDefinition, SecretKeyOptions,
    SecretLayout, ValueLayout,
};
pub use secret_state::SecretState;
pub use stream::StateStream;
