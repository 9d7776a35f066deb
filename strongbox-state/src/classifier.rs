//! Splits a record into the fields stored in plaintext, the fields that must
//! be encrypted, and the fields that are never stored.

use crate::error::{StateError, StateResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::marker::PhantomData;

/// Result of [`SecretClassifier::classify`].
#[derive(Clone, Debug, PartialEq)]
pub struct Classified {
    pub disclosed: Map<String, Value>,
    pub secret: Map<String, Value>,
}

/// Field-level classification of records of type `P`.
///
/// Every field starts out secret. [`disclose`](Self::disclose) and
/// [`exclude`](Self::exclude) move a field into the plaintext or the dropped
/// set; a later call for the same field wins.
pub struct SecretClassifier<P> {
    disclosed: Vec<&'static str>,
    excluded: Vec<&'static str>,
    _record: PhantomData<fn() -> P>,
}

impl<P> Clone for SecretClassifier<P> {
    fn clone(&self) -> Self {
        Self {
            disclosed: self.disclosed.clone(),
            excluded: self.excluded.clone(),
            _record: PhantomData,
        }
    }
}

impl<P> fmt::Debug for SecretClassifier<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretClassifier")
            .field("disclosed", &self.disclosed)
            .field("excluded", &self.excluded)
            .finish()
    }
}

impl<P> SecretClassifier<P> {
    pub fn all_secret() -> Self {
        Self {
            disclosed: Vec::new(),
            excluded: Vec::new(),
            _record: PhantomData,
        }
    }

    pub fn disclose(mut self, field: &'static str) -> Self {
        self.excluded.retain(|f| *f != field);
        if !self.disclosed.contains(&field) {
            self.disclosed.push(field);
        }
        self
    }

    pub fn exclude(mut self, field: &'static str) -> Self {
        self.disclosed.retain(|f| *f != field);
        if !self.excluded.contains(&field) {
            self.excluded.push(field);
        }
        self
    }

    pub fn disclosed_fields(&self) -> &[&'static str] {
        &self.disclosed
    }

    pub fn excluded_fields(&self) -> &[&'static str] {
        &self.excluded
    }
}

impl<P: Serialize + DeserializeOwned> SecretClassifier<P> {
    /// Splits `value` into disclosed and secret parts. Excluded fields are
    /// dropped. The output shares nothing with the input.
    pub fn classify(&self, value: &P) -> StateResult<Classified> {
        let Value::Object(fields) = serde_json::to_value(value)? else {
            return Err(StateError::Classification(
                "only records with named fields can be classified".into(),
            ));
        };

        let mut classified = Classified {
            disclosed: Map::new(),
            secret: Map::new(),
        };
        for (name, field) in fields {
            if self.excluded.contains(&name.as_str()) {
                continue;
            }
            if self.disclosed.contains(&name.as_str()) {
                classified.disclosed.insert(name, field);
            } else {
                classified.secret.insert(name, field);
            }
        }
        Ok(classified)
    }

    /// Merges stored parts back into a record.
    ///
    /// Only allow-listed disclosed fields are read, secret fields win on
    /// conflict, and excluded fields are always dropped.
    pub fn declassify(&self, disclosed: Value, secret: Value) -> StateResult<P> {
        let mut merged = Map::new();
        if let Value::Object(disclosed) = disclosed {
            for (name, field) in disclosed {
                if self.disclosed.contains(&name.as_str()) {
                    merged.insert(name, field);
                }
            }
        }
        match secret {
            Value::Object(secret) => merged.extend(secret),
            Value::Null => {}
            other => {
                return Err(StateError::Classification(format!(
                    "secret part must be an object, found {other}"
                )));
            }
        }
        merged.retain(|name, _| !self.excluded.contains(&name.as_str()));
        Ok(serde_json::from_value(Value::Object(merged))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Serialize, serde::Deserialize)]
    struct Empty {}

    #[test]
    fn later_call_wins_for_same_field() {
        let c = SecretClassifier::<Empty>::all_secret()
            .disclose("a")
            .exclude("a");
        assert!(c.disclosed_fields().is_empty());
        assert_eq!(c.excluded_fields(), &["a"]);

        let c = c.disclose("a");
        assert_eq!(c.disclosed_fields(), &["a"]);
        assert!(c.excluded_fields().is_empty());
    }
}
