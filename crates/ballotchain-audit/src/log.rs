//! the append-only audit log.

use std::collections::BTreeMap;
use std::sync::RwLock;

use ballotchain_types::{Address, ElectionId};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::{AuditEntry, AuditFilter, AuditKind, AuditPayload, AuditQuery, EntryHash, Error, Result};

struct Chain {
    entries: Vec<AuditEntry>,
    /// hash of the last entry, or genesis when empty
    head: EntryHash,
}

/// append-only, hash-chained audit log.
///
/// appends are serialized by a single write lock, which is the one global
/// critical section of the ledger. the payload digest is computed before the
/// lock is taken, so the section only covers linking and the push.
pub struct AuditLog {
    chain: RwLock<Chain>,
}

impl AuditLog {
    /// create an empty log.
    pub fn new() -> Self {
        Self {
            chain: RwLock::new(Chain {
                entries: Vec::new(),
                head: EntryHash::GENESIS,
            }),
        }
    }

    /// rebuild a log from persisted entries, exactly as stored.
    ///
    /// nothing is verified here; call [`AuditLog::check_chain`] before
    /// trusting the result.
    pub fn from_entries(entries: Vec<AuditEntry>) -> Self {
        let head = entries.last().map(AuditEntry::hash).unwrap_or(EntryHash::GENESIS);
        Self {
            chain: RwLock::new(Chain { entries, head }),
        }
    }

    /// append an entry and return it.
    ///
    /// kind and subject are taken from the payload so the header can never
    /// disagree with the content.
    pub fn append(
        &self,
        actor: &Address,
        payload: AuditPayload,
        timestamp: DateTime<Utc>,
    ) -> Result<AuditEntry> {
        let payload_hash = payload.digest()?;
        let kind = payload.kind();
        let subject = payload.subject().cloned();

        let mut chain = self.chain.write().expect("audit log lock poisoned");
        let entry = AuditEntry {
            sequence: chain.entries.len() as u64,
            kind,
            actor: actor.clone(),
            subject,
            payload,
            payload_hash,
            prev_hash: chain.head,
            timestamp,
        };
        chain.head = entry.hash();
        chain.entries.push(entry.clone());
        drop(chain);

        debug!(
            sequence = entry.sequence,
            kind = %entry.kind,
            actor = %entry.actor,
            "audit: appended"
        );
        Ok(entry)
    }

    /// hash of the newest entry, or genesis for an empty log.
    pub fn head(&self) -> EntryHash {
        self.chain.read().expect("audit log lock poisoned").head
    }

    /// number of entries.
    pub fn len(&self) -> usize {
        self.chain.read().expect("audit log lock poisoned").entries.len()
    }

    /// returns `true` if the log contains no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// entry at `sequence`.
    pub fn get(&self, sequence: u64) -> Option<AuditEntry> {
        let chain = self.chain.read().expect("audit log lock poisoned");
        usize::try_from(sequence)
            .ok()
            .and_then(|i| chain.entries.get(i))
            .cloned()
    }

    /// copy of every entry in order.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.chain
            .read()
            .expect("audit log lock poisoned")
            .entries
            .clone()
    }

    /// lazily filtered view over the log. see [`AuditQuery`].
    pub fn query(&self, filter: AuditFilter) -> AuditQuery<'_> {
        AuditQuery::new(self, filter)
    }

    /// number of entries per kind; kinds with no entries are reported as 0.
    pub fn kind_counts(&self) -> BTreeMap<AuditKind, u64> {
        let mut counts: BTreeMap<AuditKind, u64> =
            AuditKind::ALL.iter().map(|k| (*k, 0)).collect();
        let chain = self.chain.read().expect("audit log lock poisoned");
        for entry in &chain.entries {
            *counts.entry(entry.kind).or_default() += 1;
        }
        counts
    }

    /// number of vote entries recorded for an election.
    pub fn vote_count(&self, election_id: &ElectionId) -> u64 {
        let chain = self.chain.read().expect("audit log lock poisoned");
        chain
            .entries
            .iter()
            .filter(|e| e.kind == AuditKind::Vote && e.subject.as_ref() == Some(election_id))
            .count() as u64
    }

    /// recompute the chain from entry 0 and report the first bad entry.
    ///
    /// an entry is bad when its sequence number is out of place, its header
    /// disagrees with its payload, its payload no longer matches
    /// `payload_hash`, or its `prev_hash` does not match the recomputed hash
    /// of its predecessor.
    pub fn check_chain(&self) -> Result<()> {
        let chain = self.chain.read().expect("audit log lock poisoned");
        let mut expected_prev = EntryHash::GENESIS;

        for (i, entry) in chain.entries.iter().enumerate() {
            let sequence = i as u64;
            let payload_ok = entry
                .payload
                .digest()
                .map(|h| h == entry.payload_hash)
                .unwrap_or(false);

            if entry.sequence != sequence
                || !entry.is_consistent()
                || !payload_ok
                || entry.prev_hash != expected_prev
            {
                warn!(sequence, "audit: chain verification failed");
                return Err(Error::ChainCorrupted { sequence });
            }
            expected_prev = entry.hash();
        }

        Ok(())
    }

    /// `true` if the whole chain verifies.
    pub fn verify_chain(&self) -> bool {
        self.check_chain().is_ok()
    }

    #[cfg(test)]
    fn tamper<F: FnOnce(&mut AuditEntry)>(&self, sequence: usize, f: F) {
        let mut chain = self.chain.write().unwrap();
        f(&mut chain.entries[sequence]);
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("len", &self.len())
            .field("head", &self.head())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballotchain_types::{BallotId, CandidateId, Profile, RegistrationId};
    use std::sync::Arc;
    use std::thread;

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    fn registration(n: u64, address: &str) -> AuditPayload {
        AuditPayload::Registration {
            registration_id: RegistrationId(n),
            address: addr(address),
            profile: Profile::empty(),
        }
    }

    fn vote(election: &str, candidate: &str) -> AuditPayload {
        AuditPayload::Vote {
            election_id: ElectionId::from(election),
            candidate_id: CandidateId::from(candidate),
            ballot_id: BallotId(1),
        }
    }

    fn populated() -> AuditLog {
        let log = AuditLog::new();
        let now = Utc::now();
        log.append(&addr("0xA"), registration(1, "0xA"), now).unwrap();
        log.append(&addr("0xB"), registration(2, "0xB"), now).unwrap();
        log.append(&addr("0xA"), vote("1", "c1"), now).unwrap();
        log.append(&addr("0xB"), vote("1", "c2"), now).unwrap();
        log
    }

    #[test]
    fn test_sequence_is_gapless_and_chained() {
        let log = populated();
        let entries = log.entries();

        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].prev_hash, EntryHash::GENESIS);
        for (i, entry) in entries.iter().enumerate() {
            assert_eq!(entry.sequence, i as u64);
            if i > 0 {
                assert_eq!(entry.prev_hash, entries[i - 1].hash());
            }
        }
        assert_eq!(log.head(), entries[3].hash());
    }

    #[test]
    fn test_empty_log_verifies() {
        let log = AuditLog::new();
        assert!(log.is_empty());
        assert!(log.verify_chain());
        assert_eq!(log.head(), EntryHash::GENESIS);
        assert!(log.get(0).is_none());
    }

    #[test]
    fn test_untouched_log_verifies() {
        assert!(populated().verify_chain());
    }

    #[test]
    fn test_altered_payload_detected() {
        let log = populated();
        log.tamper(2, |e| {
            e.payload = vote("1", "c2");
        });
        assert!(!log.verify_chain());
        assert!(matches!(
            log.check_chain(),
            Err(Error::ChainCorrupted { sequence: 2 })
        ));
    }

    #[test]
    fn test_altered_payload_hash_detected() {
        let log = populated();
        log.tamper(1, |e| e.payload_hash = EntryHash::digest(b"forged"));
        assert!(matches!(
            log.check_chain(),
            Err(Error::ChainCorrupted { sequence: 1 })
        ));
    }

    #[test]
    fn test_altered_prev_hash_detected() {
        let log = populated();
        log.tamper(3, |e| e.prev_hash = EntryHash::GENESIS);
        assert!(matches!(
            log.check_chain(),
            Err(Error::ChainCorrupted { sequence: 3 })
        ));
    }

    #[test]
    fn test_rewritten_payload_with_fresh_hash_breaks_next_link() {
        // a forger who also recomputes payload_hash still breaks the successor
        let log = populated();
        log.tamper(2, |e| {
            e.payload = vote("1", "c2");
            e.payload_hash = e.payload.digest().unwrap();
        });
        assert!(matches!(
            log.check_chain(),
            Err(Error::ChainCorrupted { sequence: 3 })
        ));
    }

    #[test]
    fn test_altered_actor_detected() {
        let log = populated();
        log.tamper(0, |e| e.actor = addr("0xEVE"));
        assert!(matches!(
            log.check_chain(),
            Err(Error::ChainCorrupted { sequence: 1 })
        ));
    }

    #[test]
    fn test_from_entries_resumes_chain() {
        let log = populated();
        let restored = AuditLog::from_entries(log.entries());
        assert!(restored.verify_chain());
        assert_eq!(restored.head(), log.head());

        let next = restored
            .append(&addr("0xC"), registration(3, "0xC"), Utc::now())
            .unwrap();
        assert_eq!(next.sequence, 4);
        assert_eq!(next.prev_hash, log.head());
        assert!(restored.verify_chain());
    }

    #[test]
    fn test_kind_counts_and_vote_count() {
        let log = populated();
        let counts = log.kind_counts();
        assert_eq!(counts[&AuditKind::Registration], 2);
        assert_eq!(counts[&AuditKind::Vote], 2);
        assert_eq!(counts[&AuditKind::ElectionCreated], 0);
        assert_eq!(log.vote_count(&ElectionId::from("1")), 2);
        assert_eq!(log.vote_count(&ElectionId::from("2")), 0);
    }

    #[test]
    fn test_concurrent_appends_stay_gapless() {
        let log = Arc::new(AuditLog::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    for i in 0..25 {
                        let a = format!("0x{t}-{i}");
                        log.append(&addr(&a), registration(0, &a), Utc::now())
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(log.len(), 200);
        assert!(log.verify_chain());
    }
}
