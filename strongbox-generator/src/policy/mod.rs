//! Administrator policies and the evaluators that enforce them.
//!
//! A user may belong to several organizations, each publishing its own
//! policy records. Records of one type are folded into a single effective
//! policy with [`least_privilege`], which keeps the most restrictive value
//! of every field. An evaluator built from that policy then rewrites
//! generator options so they comply.

mod passphrase;
mod password;

pub use passphrase::{PassphraseGeneratorOptionsEvaluator, PassphraseGeneratorPolicy};
pub use password::{PasswordGeneratorOptionsEvaluator, PasswordGeneratorPolicy};

use crate::error::{PolicyError, PolicyResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use strongbox_types::{OrganizationId, UserId};
use tokio::sync::watch;
use uuid::Uuid;

/// Kind of administrator policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PolicyType {
    PasswordGenerator,
    MasterPassword,
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyType::PasswordGenerator => write!(f, "PasswordGenerator"),
            PolicyType::MasterPassword => write!(f, "MasterPassword"),
        }
    }
}

/// One policy record published by an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub id: String,
    pub organization_id: OrganizationId,
    pub policy_type: PolicyType,
    pub enabled: bool,
    #[serde(default)]
    pub data: Value,
}

impl Policy {
    pub fn new(organization_id: OrganizationId, policy_type: PolicyType, data: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            organization_id,
            policy_type,
            enabled: true,
            data,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// A policy that can be folded with others of its kind.
///
/// `Default` is the disabled (least restrictive) policy and the identity of
/// [`GeneratorPolicy::combine`].
pub trait GeneratorPolicy: Clone + Default + PartialEq + DeserializeOwned + Send + Sync {
    const POLICY_TYPE: PolicyType;

    /// Field-wise most restrictive of `self` and `other`.
    fn combine(&self, other: &Self) -> Self;

    /// Decodes a record's data, rejecting records of another type.
    fn from_policy(policy: &Policy) -> PolicyResult<Self> {
        ensure_type::<Self>(policy)?;
        if policy.data.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(policy.data.clone()).map_err(|e| PolicyError::Malformed(e.to_string()))
    }
}

fn ensure_type<P: GeneratorPolicy>(policy: &Policy) -> PolicyResult<()> {
    if policy.policy_type != P::POLICY_TYPE {
        return Err(PolicyError::TypeMismatch {
            expected: P::POLICY_TYPE.to_string(),
            actual: policy.policy_type.to_string(),
        });
    }
    Ok(())
}

/// Folds every enabled record into one effective policy. Disabled records
/// are skipped; a record of another type is an error.
pub fn least_privilege<P: GeneratorPolicy>(policies: &[Policy]) -> PolicyResult<P> {
    policies.iter().try_fold(P::default(), |effective, policy| {
        ensure_type::<P>(policy)?;
        if !policy.enabled {
            return Ok(effective);
        }
        Ok(effective.combine(&P::from_policy(policy)?))
    })
}

/// Enforces an effective policy on generator options.
pub trait PolicyEvaluator<O>: Send + Sync {
    /// True when the policy constrains anything.
    fn policy_in_effect(&self) -> bool;

    /// Overwrites option values that violate the policy.
    fn apply_policy(&self, options: O) -> O;

    /// Repairs internally inconsistent options.
    fn sanitize(&self, options: O) -> O;
}

/// Evaluator for generators without a policy type. Passes options through.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicyEvaluator;

impl<O> PolicyEvaluator<O> for DefaultPolicyEvaluator {
    fn policy_in_effect(&self) -> bool {
        false
    }

    fn apply_policy(&self, options: O) -> O {
        options
    }

    fn sanitize(&self, options: O) -> O {
        options
    }
}

/// Read-only feed of the policies that apply to a user.
pub trait PolicySource: Send + Sync {
    /// Every policy record that applies to `user_id`, updated live.
    fn watch_policies(&self, user_id: &UserId) -> watch::Receiver<Vec<Policy>>;

    /// Current records of one type.
    fn policies(&self, user_id: &UserId, policy_type: PolicyType) -> Vec<Policy> {
        let rx = self.watch_policies(user_id);
        let current = rx.borrow();
        current
            .iter()
            .filter(|p| p.policy_type == policy_type)
            .cloned()
            .collect()
    }
}

/// In-memory policy source, fed by whoever syncs organization policies.
#[derive(Default)]
pub struct MemoryPolicySource {
    users: Mutex<HashMap<UserId, watch::Sender<Vec<Policy>>>>,
}

impl MemoryPolicySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the records that apply to `user_id` and notifies watchers.
    pub fn set_policies(&self, user_id: &UserId, policies: Vec<Policy>) {
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        match users.get(user_id) {
            Some(tx) => {
                tx.send_replace(policies);
            }
            None => {
                let (tx, _) = watch::channel(policies);
                users.insert(user_id.clone(), tx);
            }
        }
    }
}

impl PolicySource for MemoryPolicySource {
    fn watch_policies(&self, user_id: &UserId) -> watch::Receiver<Vec<Policy>> {
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(user_id.clone())
            .or_insert_with(|| watch::channel(Vec::new()).0)
            .subscribe()
    }
}

/// Smallest/largest permitted value of a numeric option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub min: u32,
    pub max: u32,
}

impl Boundary {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Raises the floor to a policy minimum when it is stricter.
    pub(crate) fn tighten(self, policy_min: u32) -> Self {
        if policy_min > self.min {
            Self {
                min: policy_min,
                max: self.max.max(policy_min),
            }
        } else {
            self
        }
    }

    pub fn fit(&self, value: u32) -> u32 {
        value.clamp(self.min, self.max)
    }
}
