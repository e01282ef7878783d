//! filtered, restartable iteration over the audit log.
//!
//! an [`AuditQuery`] holds no cursor: every call to [`AuditQuery::iter`]
//! re-runs the filter against the log as it is at that moment. each
//! iterator is bounded by the log length observed when it was created, so
//! it always terminates even while other callers keep appending.

use serde::{Deserialize, Serialize};

use crate::{AuditEntry, AuditKind, AuditLog};

/// search criteria. empty criteria match everything.
///
/// text criteria are case-insensitive substring matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditFilter {
    /// accepted kinds; empty accepts every kind
    pub kind_in: Vec<AuditKind>,
    /// substring of the actor address
    pub address_contains: Option<String>,
    /// substring of the entry hash, payload hash or prev hash (hex)
    pub hash_contains: Option<String>,
}

impl AuditFilter {
    /// filter matching every entry.
    pub fn all() -> Self {
        Self::default()
    }

    /// restrict to the given kinds.
    pub fn kinds(mut self, kinds: impl IntoIterator<Item = AuditKind>) -> Self {
        self.kind_in = kinds.into_iter().collect();
        self
    }

    /// restrict to actors whose address contains `needle`.
    pub fn address(mut self, needle: impl Into<String>) -> Self {
        self.address_contains = Some(needle.into());
        self
    }

    /// restrict to entries with a hash containing `needle`.
    pub fn hash(mut self, needle: impl Into<String>) -> Self {
        self.hash_contains = Some(needle.into());
        self
    }

    /// whether `entry` satisfies every criterion.
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if !self.kind_in.is_empty() && !self.kind_in.contains(&entry.kind) {
            return false;
        }

        if let Some(needle) = non_empty(&self.address_contains) {
            if !entry.actor.as_str().to_lowercase().contains(&needle) {
                return false;
            }
        }

        if let Some(needle) = non_empty(&self.hash_contains) {
            let needle = needle.trim_start_matches("0x");
            let hit = [entry.hash(), entry.payload_hash, entry.prev_hash]
                .iter()
                .any(|h| h.to_hex().contains(needle));
            if !hit {
                return false;
            }
        }

        true
    }
}

fn non_empty(s: &Option<String>) -> Option<String> {
    s.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

/// a filter bound to a log.
#[derive(Debug)]
pub struct AuditQuery<'a> {
    log: &'a AuditLog,
    filter: AuditFilter,
}

impl<'a> AuditQuery<'a> {
    pub(crate) fn new(log: &'a AuditLog, filter: AuditFilter) -> Self {
        Self { log, filter }
    }

    /// the filter this query applies.
    pub fn filter(&self) -> &AuditFilter {
        &self.filter
    }

    /// start a fresh pass over the log.
    pub fn iter(&self) -> AuditIter<'_> {
        AuditIter {
            log: self.log,
            filter: &self.filter,
            next: 0,
            end: self.log.len() as u64,
        }
    }
}

impl<'q> IntoIterator for &'q AuditQuery<'_> {
    type Item = AuditEntry;
    type IntoIter = AuditIter<'q>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// one pass of an [`AuditQuery`].
#[derive(Debug)]
pub struct AuditIter<'a> {
    log: &'a AuditLog,
    filter: &'a AuditFilter,
    next: u64,
    end: u64,
}

impl Iterator for AuditIter<'_> {
    type Item = AuditEntry;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.end {
            let entry = self.log.get(self.next)?;
            self.next += 1;
            if self.filter.matches(&entry) {
                return Some(entry);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some((self.end - self.next) as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballotchain_types::{
        Address, BallotId, CandidateId, ElectionId, Profile, RegistrationId,
    };
    use chrono::Utc;

    use crate::AuditPayload;

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    fn log() -> AuditLog {
        let log = AuditLog::new();
        let now = Utc::now();
        for (n, a) in ["0xAbCdEf01", "0x1234aaaa", "0xfeedbeef"].iter().enumerate() {
            log.append(
                &addr(a),
                AuditPayload::Registration {
                    registration_id: RegistrationId(n as u64 + 1),
                    address: addr(a),
                    profile: Profile::empty(),
                },
                now,
            )
            .unwrap();
        }
        log.append(
            &addr("0xAbCdEf01"),
            AuditPayload::Vote {
                election_id: ElectionId::from("1"),
                candidate_id: CandidateId::from("c1"),
                ballot_id: BallotId(1),
            },
            now,
        )
        .unwrap();
        log
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let log = log();
        assert_eq!(log.query(AuditFilter::all()).iter().count(), 4);
    }

    #[test]
    fn test_filter_by_kind() {
        let log = log();
        let votes: Vec<_> = log
            .query(AuditFilter::all().kinds([AuditKind::Vote]))
            .iter()
            .collect();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].sequence, 3);
    }

    #[test]
    fn test_filter_by_address_is_case_insensitive() {
        let log = log();
        let query = log.query(AuditFilter::all().address("abcdef"));
        assert_eq!(query.iter().count(), 2);
    }

    #[test]
    fn test_filter_by_hash_prefix() {
        let log = log();
        let target = log.get(2).unwrap().hash().to_hex();
        let query = log.query(AuditFilter::all().hash(format!("0x{}", &target[..16])));
        let hits: Vec<_> = query.iter().collect();
        // matches entry 2 by its own hash and entry 3 by prev_hash
        assert_eq!(
            hits.iter().map(|e| e.sequence).collect::<Vec<_>>(),
            vec![2, 3]
        );
    }

    #[test]
    fn test_query_is_restartable_and_sees_new_entries() {
        let log = log();
        let query = log.query(AuditFilter::all().kinds([AuditKind::Registration]));
        assert_eq!(query.iter().count(), 3);
        assert_eq!(query.iter().count(), 3);

        log.append(
            &addr("0x99"),
            AuditPayload::Registration {
                registration_id: RegistrationId(4),
                address: addr("0x99"),
                profile: Profile::empty(),
            },
            Utc::now(),
        )
        .unwrap();

        assert_eq!((&query).into_iter().count(), 4);
    }

    #[test]
    fn test_iterator_is_bounded_at_creation() {
        let log = log();
        let query = log.query(AuditFilter::all());
        let mut iter = query.iter();
        assert!(iter.next().is_some());

        log.append(
            &addr("0x77"),
            AuditPayload::Registration {
                registration_id: RegistrationId(5),
                address: addr("0x77"),
                profile: Profile::empty(),
            },
            Utc::now(),
        )
        .unwrap();

        // 3 remaining from the first 4, the new entry is not visited
        assert_eq!(iter.count(), 3);
    }
}
