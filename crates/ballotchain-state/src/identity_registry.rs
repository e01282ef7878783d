//! identity registry: maps an address to its one registration.
//!
//! addresses are spread over independent lock shards, so registrations of
//! unrelated addresses do not wait on each other (apart from the short
//! audit append). the check-then-insert for one address runs under its
//! shard's write lock, which makes registration idempotent-rejecting even
//! under concurrent retries.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::{Arc, Mutex, RwLock};

use ballotchain_audit::{AuditLog, AuditPayload};
use ballotchain_types::{Address, Identity, Profile, RegistrationId};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{Committed, Error, Result};

type Shard = RwLock<HashMap<Address, Identity>>;

/// registry of every identity allowed to vote.
pub struct IdentityRegistry {
    shards: Vec<Shard>,
    /// last registration id handed out. held across the audit append so an
    /// id is only consumed by a committed registration.
    last_id: Mutex<u64>,
    audit: Arc<AuditLog>,
}

impl IdentityRegistry {
    /// create an empty registry with `shards` lock shards (at least one).
    pub fn new(audit: Arc<AuditLog>, shards: usize) -> Self {
        let shards = (0..shards.max(1)).map(|_| RwLock::new(HashMap::new())).collect();
        Self {
            shards,
            last_id: Mutex::new(0),
            audit,
        }
    }

    /// rebuild a registry from persisted identities.
    pub(crate) fn restore(
        audit: Arc<AuditLog>,
        shards: usize,
        identities: Vec<Identity>,
    ) -> Result<Self> {
        let registry = Self::new(audit, shards);
        let mut last = 0;
        for identity in identities {
            last = last.max(identity.registration_id.0);
            let mut shard = registry.shard(&identity.address).write().expect("registry lock poisoned");
            if shard.contains_key(&identity.address) {
                return Err(Error::Snapshot(format!(
                    "address registered twice: {}",
                    identity.address
                )));
            }
            shard.insert(identity.address.clone(), identity);
        }
        *registry.last_id.lock().expect("registry counter poisoned") = last;
        Ok(registry)
    }

    fn shard(&self, address: &Address) -> &Shard {
        let mut hasher = DefaultHasher::new();
        address.hash(&mut hasher);
        let index = (hasher.finish() % self.shards.len() as u64) as usize;
        &self.shards[index]
    }

    /// register `address`. fails with [`Error::AlreadyRegistered`] if it is
    /// already present; the existing record is left untouched.
    pub fn register(
        &self,
        address: &Address,
        profile: Profile,
        now: DateTime<Utc>,
    ) -> Result<Committed<RegistrationId>> {
        let mut shard = self.shard(address).write().expect("registry lock poisoned");
        if shard.contains_key(address) {
            return Err(Error::AlreadyRegistered(address.clone()));
        }

        let mut last_id = self.last_id.lock().expect("registry counter poisoned");
        let registration_id = RegistrationId(*last_id + 1);
        let entry = self.audit.append(
            address,
            AuditPayload::Registration {
                registration_id,
                address: address.clone(),
                profile: profile.clone(),
            },
            now,
        )?;
        *last_id = registration_id.0;
        drop(last_id);

        shard.insert(
            address.clone(),
            Identity {
                registration_id,
                address: address.clone(),
                registered_at: now,
                profile,
            },
        );
        debug!(address = %address, id = registration_id.0, "registry: registered");

        Ok(Committed {
            value: registration_id,
            entry,
        })
    }

    /// whether `address` is registered.
    pub fn is_registered(&self, address: &Address) -> bool {
        self.shard(address)
            .read()
            .expect("registry lock poisoned")
            .contains_key(address)
    }

    /// the registration record for `address`.
    pub fn get(&self, address: &Address) -> Option<Identity> {
        self.shard(address)
            .read()
            .expect("registry lock poisoned")
            .get(address)
            .cloned()
    }

    /// number of registered identities.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.read().expect("registry lock poisoned").len())
            .sum()
    }

    /// returns `true` if nobody is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// every identity, ordered by registration id.
    pub fn identities(&self) -> Vec<Identity> {
        let mut all: Vec<Identity> = self
            .shards
            .iter()
            .flat_map(|s| {
                s.read()
                    .expect("registry lock poisoned")
                    .values()
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        all.sort_by_key(|i| i.registration_id);
        all
    }
}

impl std::fmt::Debug for IdentityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityRegistry")
            .field("shards", &self.shards.len())
            .field("registered", &self.len())
            .finish()
    }
}
