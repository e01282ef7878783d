//! voter identity records.
//!
//! an identity is created exactly once, when an address registers, and is
//! never mutated or deleted afterwards.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Address;

/// sequential identifier handed back to a successful registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegistrationId(pub u64);

impl From<u64> for RegistrationId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// opaque registration profile supplied by the presentation layer.
///
/// the ledger never interprets the contents (name, contact details, ...);
/// it is stored and hashed into the registration audit entry as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile(serde_json::Value);

impl Profile {
    /// an empty profile.
    pub fn empty() -> Self {
        Self(serde_json::Value::Null)
    }

    /// the raw json value.
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

impl From<serde_json::Value> for Profile {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// a registered identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// registration number, unique across the ledger
    pub registration_id: RegistrationId,

    /// the registered address (globally unique, immutable)
    pub address: Address,

    /// when the registration was accepted
    pub registered_at: DateTime<Utc>,

    /// opaque profile blob
    #[serde(default)]
    pub profile: Profile,
}
