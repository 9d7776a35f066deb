//! Describes how an encrypted value is split into independently encrypted
//! items and where it is stored.

use crate::classifier::SecretClassifier;
use crate::config::DEFAULT_CLEANUP_DELAY;
use crate::key_definition::{ClearEvent, StateLocation, StateValue, UserKeyDefinition};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;
use std::time::Duration;

/// Stored form of one encrypted item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedFormat<Id> {
    pub id: Id,
    /// Sealed JSON of the item's secret fields.
    pub secret: String,
    pub disclosed: Map<String, Value>,
}

/// Maps an outer value to `(id, item)` pairs and back.
///
/// `reconstruct(deconstruct(x))` must equal `Some(x)`.
pub trait SecretLayout: Send + Sync + 'static {
    type Outer: StateValue;
    type Id: StateValue;
    type Item: StateValue;

    fn deconstruct(outer: Self::Outer) -> Vec<(Self::Id, Self::Item)>;

    fn reconstruct(items: Vec<(Self::Id, Self::Item)>) -> Option<Self::Outer>;
}

/// A single record. An empty item list means "no value".
pub struct ValueLayout<T>(PhantomData<fn() -> T>);

impl<T: StateValue> SecretLayout for ValueLayout<T> {
    type Outer = T;
    type Id = ();
    type Item = T;

    fn deconstruct(outer: T) -> Vec<((), T)> {
        vec![((), outer)]
    }

    fn reconstruct(items: Vec<((), T)>) -> Option<T> {
        items.into_iter().next().map(|(_, item)| item)
    }
}

/// A list; each element is encrypted separately under its index.
pub struct ArrayLayout<T>(PhantomData<fn() -> T>);

impl<T: StateValue> SecretLayout for ArrayLayout<T> {
    type Outer = Vec<T>;
    type Id = usize;
    type Item = T;

    fn deconstruct(outer: Vec<T>) -> Vec<(usize, T)> {
        outer.into_iter().enumerate().collect()
    }

    fn reconstruct(mut items: Vec<(usize, T)>) -> Option<Vec<T>> {
        items.sort_by_key(|(index, _)| *index);
        Some(items.into_iter().map(|(_, item)| item).collect())
    }
}

/// A map; each entry is encrypted separately under its key.
pub struct RecordLayout<K, T>(PhantomData<fn() -> (K, T)>);

impl<K, T> SecretLayout for RecordLayout<K, T>
where
    K: StateValue + Eq + Hash,
    T: StateValue,
{
    type Outer = HashMap<K, T>;
    type Id = K;
    type Item = T;

    fn deconstruct(outer: HashMap<K, T>) -> Vec<(K, T)> {
        outer.into_iter().collect()
    }

    fn reconstruct(items: Vec<(K, T)>) -> Option<HashMap<K, T>> {
        Some(items.into_iter().collect())
    }
}

/// Lifecycle options for a secret key.
#[derive(Clone, Debug)]
pub struct SecretKeyOptions {
    pub clear_on: Vec<ClearEvent>,
    /// How long the decrypted cache survives without subscribers.
    pub cleanup_delay: Duration,
}

impl Default for SecretKeyOptions {
    fn default() -> Self {
        Self {
            clear_on: Vec::new(),
            cleanup_delay: DEFAULT_CLEANUP_DELAY,
        }
    }
}

pub struct SecretKeyDefinition<L: SecretLayout> {
    location: StateLocation,
    key: String,
    classifier: SecretClassifier<L::Item>,
    options: SecretKeyOptions,
    _layout: PhantomData<fn() -> L>,
}

impl<L: SecretLayout> Clone for SecretKeyDefinition<L> {
    fn clone(&self) -> Self {
        Self {
            location: self.location,
            key: self.key.clone(),
            classifier: self.classifier.clone(),
            options: self.options.clone(),
            _layout: PhantomData,
        }
    }
}

impl<T: StateValue> SecretKeyDefinition<ValueLayout<T>> {
    pub fn value(
        location: StateLocation,
        key: impl Into<String>,
        classifier: SecretClassifier<T>,
        options: SecretKeyOptions,
    ) -> Self {
        Self::with_layout(location, key, classifier, options)
    }
}

impl<T: StateValue> SecretKeyDefinition<ArrayLayout<T>> {
    pub fn array(
        location: StateLocation,
        key: impl Into<String>,
        classifier: SecretClassifier<T>,
        options: SecretKeyOptions,
    ) -> Self {
        Self::with_layout(location, key, classifier, options)
    }
}

impl<K, T> SecretKeyDefinition<RecordLayout<K, T>>
where
    K: StateValue + Eq + Hash,
    T: StateValue,
{
    pub fn record(
        location: StateLocation,
        key: impl Into<String>,
        classifier: SecretClassifier<T>,
        options: SecretKeyOptions,
    ) -> Self {
        Self::with_layout(location, key, classifier, options)
    }
}

impl<L: SecretLayout> SecretKeyDefinition<L> {
    pub fn with_layout(
        location: StateLocation,
        key: impl Into<String>,
        classifier: SecretClassifier<L::Item>,
        options: SecretKeyOptions,
    ) -> Self {
        Self {
            location,
            key: key.into(),
            classifier,
            options,
            _layout: PhantomData,
        }
    }

    pub fn classifier(&self) -> &SecretClassifier<L::Item> {
        &self.classifier
    }

    pub fn cleanup_delay(&self) -> Duration {
        self.options.cleanup_delay
    }

    pub fn deconstruct(&self, outer: L::Outer) -> Vec<(L::Id, L::Item)> {
        L::deconstruct(outer)
    }

    pub fn reconstruct(&self, items: Vec<(L::Id, L::Item)>) -> Option<L::Outer> {
        L::reconstruct(items)
    }

    /// Definition of the key holding the encrypted items.
    pub fn to_encrypted_state_key(&self) -> UserKeyDefinition<Vec<ClassifiedFormat<L::Id>>> {
        UserKeyDefinition::new(self.location, self.key.clone(), &self.options.clear_on)
    }
}
