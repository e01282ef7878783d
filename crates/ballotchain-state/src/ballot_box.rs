//! ballot box: admission control and tallies.
//!
//! each election gets its own slot guarded by a mutex. the duplicate check,
//! the audit append and the ballot insert for a vote all happen while that
//! mutex is held, so for one (election, voter) pair exactly one attempt can
//! ever succeed. votes in different elections never contend on a slot.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use ballotchain_audit::{AuditLog, AuditPayload};
use ballotchain_types::{
    Address, Ballot, BallotId, CandidateId, ElectionId, ElectionStatus, TallyEntry,
};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{Committed, ElectionCatalog, Error, IdentityRegistry, Result};

/// accepted ballots of one election.
#[derive(Debug, Default)]
struct Slot {
    ballots: HashMap<Address, Ballot>,
    /// votes per candidate, indexed by declaration position
    counts: Vec<u64>,
}

impl Slot {
    fn with_candidates(n: usize) -> Self {
        Self {
            ballots: HashMap::new(),
            counts: vec![0; n],
        }
    }
}

/// per-election ballot store.
pub struct BallotBox {
    slots: RwLock<HashMap<ElectionId, Arc<Mutex<Slot>>>>,
    /// last ballot id handed out, held across the audit append
    last_id: Mutex<u64>,
    catalog: Arc<ElectionCatalog>,
    identities: Arc<IdentityRegistry>,
    audit: Arc<AuditLog>,
}

impl BallotBox {
    /// create an empty ballot box.
    pub fn new(
        catalog: Arc<ElectionCatalog>,
        identities: Arc<IdentityRegistry>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            last_id: Mutex::new(0),
            catalog,
            identities,
            audit,
        }
    }

    /// rebuild from persisted ballots, re-checking every ballot against the
    /// catalog and rejecting duplicates.
    pub(crate) fn restore(
        catalog: Arc<ElectionCatalog>,
        identities: Arc<IdentityRegistry>,
        audit: Arc<AuditLog>,
        ballots: Vec<Ballot>,
    ) -> Result<Self> {
        let ballot_box = Self::new(catalog, identities, audit);
        let mut last = 0;
        for ballot in ballots {
            let (position, candidates) = ballot_box
                .catalog
                .with_election(&ballot.election_id, |e| {
                    (e.candidate_position(&ballot.candidate_id), e.candidates.len())
                })
                .map_err(|_| {
                    Error::Snapshot(format!(
                        "ballot {} references unknown election {}",
                        ballot.id, ballot.election_id
                    ))
                })?;
            let position = position.ok_or_else(|| {
                Error::Snapshot(format!(
                    "ballot {} references unknown candidate {}",
                    ballot.id, ballot.candidate_id
                ))
            })?;

            let slot = ballot_box.slot(&ballot.election_id, candidates);
            let mut slot = slot.lock().expect("ballot slot poisoned");
            if slot.ballots.contains_key(&ballot.voter) {
                return Err(Error::Snapshot(format!(
                    "{} voted twice in election {}",
                    ballot.voter, ballot.election_id
                )));
            }
            last = last.max(ballot.id.0);
            slot.counts[position] += 1;
            slot.ballots.insert(ballot.voter.clone(), ballot);
        }
        *ballot_box.last_id.lock().expect("ballot counter poisoned") = last;
        Ok(ballot_box)
    }

    fn slot(&self, election_id: &ElectionId, candidates: usize) -> Arc<Mutex<Slot>> {
        if let Some(slot) = self
            .slots
            .read()
            .expect("ballot box lock poisoned")
            .get(election_id)
        {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write().expect("ballot box lock poisoned");
        Arc::clone(
            slots
                .entry(election_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(Slot::with_candidates(candidates)))),
        )
    }

    fn existing_slot(&self, election_id: &ElectionId) -> Option<Arc<Mutex<Slot>>> {
        self.slots
            .read()
            .expect("ballot box lock poisoned")
            .get(election_id)
            .cloned()
    }

    /// accept or reject a vote.
    ///
    /// checks run in a fixed order and the first failure wins:
    /// election exists, election is open at `now`, candidate belongs to the
    /// election, voter is registered, voter has not voted in this election.
    pub fn cast_vote(
        &self,
        election_id: &ElectionId,
        voter: &Address,
        candidate_id: &CandidateId,
        now: DateTime<Utc>,
    ) -> Result<Committed<BallotId>> {
        // the catalog read lock is held throughout, so the election cannot be
        // force-closed between the status check and the insert
        self.catalog.with_election(election_id, |election| {
            let status = election.status_at(now);
            if status != ElectionStatus::Open {
                return Err(Error::ElectionNotOpen {
                    election_id: election_id.clone(),
                    status,
                });
            }

            let position = election.candidate_position(candidate_id).ok_or_else(|| {
                Error::UnknownCandidate {
                    election_id: election_id.clone(),
                    candidate_id: candidate_id.clone(),
                }
            })?;

            if !self.identities.is_registered(voter) {
                return Err(Error::VoterNotRegistered(voter.clone()));
            }

            let slot = self.slot(election_id, election.candidates.len());
            let mut slot = slot.lock().expect("ballot slot poisoned");
            if slot.ballots.contains_key(voter) {
                return Err(Error::DuplicateVote {
                    election_id: election_id.clone(),
                    voter: voter.clone(),
                });
            }

            let mut last_id = self.last_id.lock().expect("ballot counter poisoned");
            let ballot_id = BallotId(*last_id + 1);
            let entry = self.audit.append(
                voter,
                AuditPayload::Vote {
                    election_id: election_id.clone(),
                    candidate_id: candidate_id.clone(),
                    ballot_id,
                },
                now,
            )?;
            *last_id = ballot_id.0;
            drop(last_id);

            slot.counts[position] += 1;
            slot.ballots.insert(
                voter.clone(),
                Ballot {
                    id: ballot_id,
                    election_id: election_id.clone(),
                    voter: voter.clone(),
                    candidate_id: candidate_id.clone(),
                    cast_at: now,
                },
            );
            debug!(
                election_id = %election_id,
                voter = %voter,
                ballot_id = ballot_id.0,
                "ballot box: vote accepted"
            );

            Ok(Committed {
                value: ballot_id,
                entry,
            })
        })?
    }

    /// per-candidate counts, most votes first.
    ///
    /// ties keep candidate declaration order, so the result depends only on
    /// the set of ballots and never on the order they arrived in.
    pub fn tally(&self, election_id: &ElectionId) -> Result<Vec<TallyEntry>> {
        let candidates = self
            .catalog
            .with_election(election_id, |e| e.candidates.clone())?;
        let counts = match self.existing_slot(election_id) {
            Some(slot) => slot.lock().expect("ballot slot poisoned").counts.clone(),
            None => vec![0; candidates.len()],
        };

        let mut tally: Vec<TallyEntry> = candidates
            .into_iter()
            .zip(counts)
            .map(|(c, votes)| TallyEntry {
                candidate_id: c.id,
                name: c.name,
                party: c.party,
                votes,
            })
            .collect();
        // stable sort: equal counts stay in declaration order
        tally.sort_by(|a, b| b.votes.cmp(&a.votes));
        Ok(tally)
    }

    /// whether `voter` has a ballot in the election.
    pub fn has_voted(&self, election_id: &ElectionId, voter: &Address) -> bool {
        self.existing_slot(election_id)
            .map(|slot| {
                slot.lock()
                    .expect("ballot slot poisoned")
                    .ballots
                    .contains_key(voter)
            })
            .unwrap_or(false)
    }

    /// ballots accepted in one election.
    pub fn ballot_count(&self, election_id: &ElectionId) -> u64 {
        self.existing_slot(election_id)
            .map(|slot| slot.lock().expect("ballot slot poisoned").ballots.len() as u64)
            .unwrap_or(0)
    }

    /// ballots accepted across every election.
    pub fn total_ballots(&self) -> u64 {
        let slots: Vec<_> = self
            .slots
            .read()
            .expect("ballot box lock poisoned")
            .values()
            .cloned()
            .collect();
        slots
            .iter()
            .map(|s| s.lock().expect("ballot slot poisoned").ballots.len() as u64)
            .sum()
    }

    /// every ballot, ordered by id.
    pub fn ballots(&self) -> Vec<Ballot> {
        let slots: Vec<_> = self
            .slots
            .read()
            .expect("ballot box lock poisoned")
            .values()
            .cloned()
            .collect();
        let mut all: Vec<Ballot> = slots
            .iter()
            .flat_map(|s| {
                s.lock()
                    .expect("ballot slot poisoned")
                    .ballots
                    .values()
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        all.sort_by_key(|b| b.id);
        all
    }
}

impl std::fmt::Debug for BallotBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BallotBox")
            .field("ballots", &self.total_ballots())
            .finish()
    }
}
