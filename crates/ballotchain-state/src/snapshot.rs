//! durable json image of the ledger.
//!
//! audit entries are stored verbatim, hashes included, so a restored log
//! can be verified against exactly what was written.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use ballotchain_audit::{AuditEntry, AuditPayload};
use ballotchain_types::{Address, Ballot, BallotId, Election, ElectionId, Identity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// current on-disk format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// everything needed to rebuild a [`crate::Ledger`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: u32,
    /// ordered by registration id
    pub identities: Vec<Identity>,
    /// creation order
    pub elections: Vec<Election>,
    /// ordered by ballot id
    pub ballots: Vec<Ballot>,
    pub audit: Vec<AuditEntry>,
}

impl LedgerSnapshot {
    /// check identities, elections and ballots against the audit trail.
    ///
    /// every record must be backed by exactly one audit entry and agree with
    /// it field for field, and every entry must back a record. `closed_at`
    /// must equal the time of the election's `ElectionClosed` entry, or be
    /// unset when there is none. run this only on a verified chain.
    pub fn check_against_audit(&self) -> Result<()> {
        let mut registrations: HashMap<&Address, &AuditEntry> = HashMap::new();
        let mut created: HashMap<&ElectionId, &AuditEntry> = HashMap::new();
        let mut closed: HashMap<&ElectionId, DateTime<Utc>> = HashMap::new();
        let mut votes: HashMap<BallotId, &AuditEntry> = HashMap::new();

        for entry in &self.audit {
            let duplicate = match &entry.payload {
                AuditPayload::Registration { address, .. } => {
                    registrations.insert(address, entry).is_some()
                }
                AuditPayload::ElectionCreated { election_id, .. } => {
                    created.insert(election_id, entry).is_some()
                }
                AuditPayload::ElectionClosed { election_id } => {
                    closed.insert(election_id, entry.timestamp).is_some()
                }
                AuditPayload::Vote { ballot_id, .. } => votes.insert(*ballot_id, entry).is_some(),
            };
            if duplicate {
                return Err(disagrees(format!(
                    "entry {} repeats an earlier {} event",
                    entry.sequence, entry.kind
                )));
            }
        }

        for identity in &self.identities {
            let backed = registrations.remove(&identity.address).is_some_and(|entry| {
                entry.actor == identity.address
                    && entry.timestamp == identity.registered_at
                    && matches!(
                        &entry.payload,
                        AuditPayload::Registration { registration_id, address, profile }
                            if *registration_id == identity.registration_id
                                && *address == identity.address
                                && *profile == identity.profile
                    )
            });
            if !backed {
                return Err(disagrees(format!("identity {}", identity.address)));
            }
        }
        if let Some(address) = registrations.keys().next() {
            return Err(disagrees(format!("registration of {address} is missing")));
        }

        for election in &self.elections {
            let backed = created.remove(&election.id).is_some_and(|entry| {
                entry.actor == election.created_by
                    && entry.timestamp == election.created_at
                    && matches!(
                        &entry.payload,
                        AuditPayload::ElectionCreated {
                            title,
                            description,
                            start_time,
                            end_time,
                            candidates,
                            ..
                        } if *title == election.title
                            && *description == election.description
                            && *start_time == election.start_time
                            && *end_time == election.end_time
                            && *candidates == election.candidates
                    )
            });
            if !backed || closed.remove(&election.id) != election.closed_at {
                return Err(disagrees(format!("election {}", election.id)));
            }
        }
        if let Some(id) = created.keys().chain(closed.keys()).next() {
            return Err(disagrees(format!("election {id} is missing")));
        }

        for ballot in &self.ballots {
            let backed = votes.remove(&ballot.id).is_some_and(|entry| {
                entry.actor == ballot.voter
                    && entry.timestamp == ballot.cast_at
                    && matches!(
                        &entry.payload,
                        AuditPayload::Vote { election_id, candidate_id, .. }
                            if *election_id == ballot.election_id
                                && *candidate_id == ballot.candidate_id
                    )
            });
            if !backed {
                return Err(disagrees(format!("ballot {}", ballot.id)));
            }
        }
        if let Some(id) = votes.keys().next() {
            return Err(disagrees(format!("ballot {id} is missing")));
        }

        Ok(())
    }
}

fn disagrees(what: String) -> Error {
    Error::Snapshot(format!("{what} disagrees with the audit trail"))
}

/// file-backed snapshot storage.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// read the snapshot. a missing file is `Ok(None)`.
    pub fn load(&self) -> Result<Option<LedgerSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = fs::read(&self.path)
            .map_err(|e| Error::Snapshot(format!("read {}: {e}", self.path.display())))?;
        let snapshot = serde_json::from_slice::<LedgerSnapshot>(&data)
            .map_err(|e| Error::Snapshot(format!("parse {}: {e}", self.path.display())))?;
        debug!(path = %self.path.display(), entries = snapshot.audit.len(), "snapshot loaded");
        Ok(Some(snapshot))
    }

    /// write the snapshot, replacing any previous one atomically.
    pub fn save(&self, snapshot: &LedgerSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Snapshot(format!("create {}: {e}", parent.display())))?;
        }
        let data = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| Error::Snapshot(format!("encode: {e}")))?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, data)
            .map_err(|e| Error::Snapshot(format!("write {}: {e}", tmp_path.display())))?;
        fs::rename(&tmp_path, &self.path)
            .map_err(|e| Error::Snapshot(format!("rename {}: {e}", self.path.display())))?;
        debug!(path = %self.path.display(), entries = snapshot.audit.len(), "snapshot saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> LedgerSnapshot {
        LedgerSnapshot {
            version: SNAPSHOT_VERSION,
            identities: vec![],
            elections: vec![],
            ballots: vec![],
            audit: vec![],
        }
    }

    fn voted() -> LedgerSnapshot {
        use ballotchain_types::test_utils::TestElectionBuilder;
        use ballotchain_types::{Config, Profile};
        use chrono::Duration;

        let ledger = crate::Ledger::new(Config::default());
        let now = Utc::now();
        let voter = Address::new("0xA").unwrap();
        ledger.register(&voter, Profile::empty(), now).unwrap();
        let election = ledger
            .create_election(
                &Address::new("0xADMIN").unwrap(),
                TestElectionBuilder::new("E1")
                    .with_window(now - Duration::hours(1), now + Duration::hours(1))
                    .build(),
                now,
            )
            .unwrap();
        ledger
            .cast_vote(&election, &voter, &"c1".into(), now)
            .unwrap();
        ledger.snapshot()
    }

    #[test]
    fn test_records_match_audit() {
        voted().check_against_audit().unwrap();
    }

    #[test]
    fn test_entry_without_record_is_rejected() {
        let mut snapshot = voted();
        snapshot.identities.clear();
        snapshot.ballots.clear();
        let err = snapshot.check_against_audit().unwrap_err();
        assert_eq!(err.code(), "snapshot_error");

        let mut snapshot = voted();
        snapshot.elections.clear();
        snapshot.ballots.clear();
        assert!(snapshot.check_against_audit().is_err());
    }

    #[test]
    fn test_record_without_entry_is_rejected() {
        let mut snapshot = voted();
        let mut extra = snapshot.ballots[0].clone();
        extra.id = BallotId(extra.id.0 + 1);
        snapshot.ballots.push(extra);
        assert!(snapshot.check_against_audit().is_err());
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("ledger.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_creates_parent_dirs_and_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/ledger.json");
        let store = SnapshotStore::new(&path);
        store.save(&empty()).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(store.load().unwrap().unwrap().version, SNAPSHOT_VERSION);
    }

    #[test]
    fn test_garbage_is_snapshot_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        fs::write(&path, b"not json").unwrap();
        let err = SnapshotStore::new(&path).load().unwrap_err();
        assert_eq!(err.code(), "snapshot_error");
    }
}
