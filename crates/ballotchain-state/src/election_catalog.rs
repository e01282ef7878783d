//! election catalog: definitions, ids and lifecycle.
//!
//! definitions are immutable once created. the only later write is an
//! administrative force-close, which sets `closed_at` once.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use ballotchain_audit::{AuditLog, AuditPayload};
use ballotchain_types::{
    Address, Candidate, CandidateId, Election, ElectionId, ElectionSpec, ElectionStatus,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::{Committed, Error, Result};

#[derive(Default)]
struct Catalog {
    /// creation order
    elections: Vec<Election>,
    index: HashMap<ElectionId, usize>,
    /// last numeric id handed out
    last_id: u64,
}

impl Catalog {
    fn get(&self, id: &ElectionId) -> Option<&Election> {
        self.index.get(id).map(|&i| &self.elections[i])
    }
}

/// store of election definitions.
pub struct ElectionCatalog {
    catalog: RwLock<Catalog>,
    audit: Arc<AuditLog>,
}

impl ElectionCatalog {
    /// create an empty catalog.
    pub fn new(audit: Arc<AuditLog>) -> Self {
        Self {
            catalog: RwLock::new(Catalog::default()),
            audit,
        }
    }

    /// rebuild a catalog from persisted elections, in creation order.
    pub(crate) fn restore(audit: Arc<AuditLog>, elections: Vec<Election>) -> Result<Self> {
        let mut catalog = Catalog::default();
        for election in elections {
            if catalog.index.contains_key(&election.id) {
                return Err(Error::Snapshot(format!(
                    "election defined twice: {}",
                    election.id
                )));
            }
            if let Ok(n) = election.id.as_str().parse::<u64>() {
                catalog.last_id = catalog.last_id.max(n);
            }
            catalog.index.insert(election.id.clone(), catalog.elections.len());
            catalog.elections.push(election);
        }
        Ok(Self {
            catalog: RwLock::new(catalog),
            audit,
        })
    }

    /// validate and store a new election.
    ///
    /// requires `start_time < end_time` and at least one candidate, every
    /// candidate having a non-blank name. candidate ids are assigned in
    /// declaration order (`c1`, `c2`, ...).
    pub fn create_election(
        &self,
        spec: ElectionSpec,
        actor: &Address,
        now: DateTime<Utc>,
    ) -> Result<Committed<ElectionId>> {
        validate(&spec)?;

        let candidates: Vec<Candidate> = spec
            .candidates
            .into_iter()
            .enumerate()
            .map(|(i, c)| Candidate {
                id: CandidateId::for_index(i),
                name: c.name.trim().to_string(),
                party: c.party.trim().to_string(),
                description: c.description,
            })
            .collect();

        let mut catalog = self.catalog.write().expect("catalog lock poisoned");
        let number = next_free_id(&catalog);
        let id = ElectionId(number.to_string());

        let entry = self.audit.append(
            actor,
            AuditPayload::ElectionCreated {
                election_id: id.clone(),
                title: spec.title.clone(),
                description: spec.description.clone(),
                start_time: spec.start_time,
                end_time: spec.end_time,
                candidates: candidates.clone(),
            },
            now,
        )?;

        let election = Election {
            id: id.clone(),
            title: spec.title,
            description: spec.description,
            start_time: spec.start_time,
            end_time: spec.end_time,
            candidates,
            created_by: actor.clone(),
            created_at: now,
            closed_at: None,
        };
        let position = catalog.elections.len();
        catalog.last_id = number;
        catalog.index.insert(id.clone(), position);
        catalog.elections.push(election);
        debug!(election_id = %id, actor = %actor, "catalog: election created");

        Ok(Committed { value: id, entry })
    }

    /// status of an election at `now`, computed fresh on every call.
    pub fn get_status(&self, id: &ElectionId, now: DateTime<Utc>) -> Result<ElectionStatus> {
        self.with_election(id, |e| e.status_at(now))
    }

    /// copy of an election definition.
    pub fn get_election(&self, id: &ElectionId) -> Result<Election> {
        self.with_election(id, Election::clone)
    }

    /// run `f` against an election while holding the catalog read lock.
    ///
    /// a force-close cannot interleave with `f`, so a decision made on the
    /// status inside `f` stays valid until it returns.
    pub fn with_election<R>(&self, id: &ElectionId, f: impl FnOnce(&Election) -> R) -> Result<R> {
        let catalog = self.catalog.read().expect("catalog lock poisoned");
        catalog
            .get(id)
            .map(f)
            .ok_or_else(|| Error::ElectionNotFound(id.clone()))
    }

    /// every election with its status at `now`, in creation order.
    pub fn list(&self, now: DateTime<Utc>) -> Vec<(Election, ElectionStatus)> {
        let catalog = self.catalog.read().expect("catalog lock poisoned");
        catalog
            .elections
            .iter()
            .map(|e| (e.clone(), e.status_at(now)))
            .collect()
    }

    /// permanently close an election that is scheduled or open.
    pub fn force_close(
        &self,
        id: &ElectionId,
        actor: &Address,
        now: DateTime<Utc>,
    ) -> Result<Committed<()>> {
        let mut catalog = self.catalog.write().expect("catalog lock poisoned");
        let index = *catalog
            .index
            .get(id)
            .ok_or_else(|| Error::ElectionNotFound(id.clone()))?;

        let status = catalog.elections[index].status_at(now);
        if status == ElectionStatus::Closed {
            return Err(Error::ElectionNotOpen {
                election_id: id.clone(),
                status,
            });
        }

        let entry = self.audit.append(
            actor,
            AuditPayload::ElectionClosed {
                election_id: id.clone(),
            },
            now,
        )?;
        catalog.elections[index].closed_at = Some(now);
        info!(election_id = %id, actor = %actor, "catalog: election force-closed");

        Ok(Committed { value: (), entry })
    }

    /// number of elections.
    pub fn len(&self) -> usize {
        self.catalog.read().expect("catalog lock poisoned").elections.len()
    }

    /// returns `true` if no election exists.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// every election definition in creation order.
    pub fn elections(&self) -> Vec<Election> {
        self.catalog
            .read()
            .expect("catalog lock poisoned")
            .elections
            .clone()
    }
}

impl std::fmt::Debug for ElectionCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElectionCatalog")
            .field("elections", &self.len())
            .finish()
    }
}

/// next numeric id not already taken (restored catalogs may hold
/// non-numeric ids).
fn next_free_id(catalog: &Catalog) -> u64 {
    let mut n = catalog.last_id + 1;
    while catalog.index.contains_key(&ElectionId(n.to_string())) {
        n += 1;
    }
    n
}

fn validate(spec: &ElectionSpec) -> Result<()> {
    if spec.start_time >= spec.end_time {
        return Err(Error::InvalidElectionSpec(
            "start time must be before end time".into(),
        ));
    }
    if spec.candidates.is_empty() {
        return Err(Error::InvalidElectionSpec(
            "at least one candidate is required".into(),
        ));
    }
    if let Some(pos) = spec.candidates.iter().position(|c| c.name.trim().is_empty()) {
        return Err(Error::InvalidElectionSpec(format!(
            "candidate {} has an empty name",
            pos + 1
        )));
    }
    Ok(())
}
