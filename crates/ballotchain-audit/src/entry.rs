//! audit entry types and their canonical hashing.

use std::fmt;
use std::str::FromStr;

use ballotchain_types::{
    Address, BallotId, Candidate, CandidateId, ElectionId, Profile, RegistrationId,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{EntryHash, Error, Result};

/// domain separation tags, bumped if the encoding ever changes.
const PAYLOAD_DOMAIN: &[u8] = b"ballotchain/audit-payload/v1";
const ENTRY_DOMAIN: &[u8] = b"ballotchain/audit-entry/v1";

/// category of a recorded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    /// an identity registered
    Registration,
    /// a ballot was accepted
    Vote,
    /// an election was created
    ElectionCreated,
    /// an election was force-closed by an administrator
    ElectionClosed,
}

impl AuditKind {
    /// every kind, in declaration order.
    pub const ALL: [AuditKind; 4] = [
        AuditKind::Registration,
        AuditKind::Vote,
        AuditKind::ElectionCreated,
        AuditKind::ElectionClosed,
    ];

    /// stable wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditKind::Registration => "registration",
            AuditKind::Vote => "vote",
            AuditKind::ElectionCreated => "election_created",
            AuditKind::ElectionClosed => "election_closed",
        }
    }
}

impl fmt::Display for AuditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "registration" => Ok(AuditKind::Registration),
            "vote" => Ok(AuditKind::Vote),
            "election_created" | "election" => Ok(AuditKind::ElectionCreated),
            "election_closed" => Ok(AuditKind::ElectionClosed),
            other => Err(format!("unknown audit kind: {other}")),
        }
    }
}

/// semantic content of an entry. `payload_hash` is computed over this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditPayload {
    Registration {
        registration_id: RegistrationId,
        address: Address,
        #[serde(default)]
        profile: Profile,
    },
    Vote {
        election_id: ElectionId,
        candidate_id: CandidateId,
        ballot_id: BallotId,
    },
    ElectionCreated {
        election_id: ElectionId,
        title: String,
        #[serde(default)]
        description: String,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        candidates: Vec<Candidate>,
    },
    ElectionClosed {
        election_id: ElectionId,
    },
}

impl AuditPayload {
    /// the kind of event this payload describes.
    pub fn kind(&self) -> AuditKind {
        match self {
            AuditPayload::Registration { .. } => AuditKind::Registration,
            AuditPayload::Vote { .. } => AuditKind::Vote,
            AuditPayload::ElectionCreated { .. } => AuditKind::ElectionCreated,
            AuditPayload::ElectionClosed { .. } => AuditKind::ElectionClosed,
        }
    }

    /// election the event concerns, if any.
    pub fn subject(&self) -> Option<&ElectionId> {
        match self {
            AuditPayload::Registration { .. } => None,
            AuditPayload::Vote { election_id, .. }
            | AuditPayload::ElectionCreated { election_id, .. }
            | AuditPayload::ElectionClosed { election_id } => Some(election_id),
        }
    }

    /// SHA-256 over the canonical json encoding of the payload.
    ///
    /// struct fields serialize in declaration order and profile maps are
    /// sorted, so equal payloads always hash equally.
    pub fn digest(&self) -> Result<EntryHash> {
        let json = serde_json::to_vec(self).map_err(|e| Error::Encoding(e.to_string()))?;
        let mut hasher = Sha256::new();
        hasher.update(PAYLOAD_DOMAIN);
        hasher.update(&json);
        Ok(EntryHash::from(<[u8; 32]>::from(hasher.finalize())))
    }
}

/// a single, immutable record in the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// position in the log, starting at 0, gapless
    pub sequence: u64,

    pub kind: AuditKind,

    /// identity that performed the operation
    pub actor: Address,

    /// election the event concerns, if any
    pub subject: Option<ElectionId>,

    pub payload: AuditPayload,

    /// digest of `payload`
    pub payload_hash: EntryHash,

    /// hash of the previous entry, or [`EntryHash::GENESIS`] for entry 0
    pub prev_hash: EntryHash,

    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    /// hash of this entry, which the next entry stores as its `prev_hash`.
    ///
    /// covers every header field and the payload through `payload_hash`.
    /// variable-length fields are length-prefixed.
    pub fn hash(&self) -> EntryHash {
        let mut hasher = Sha256::new();
        hasher.update(ENTRY_DOMAIN);
        hasher.update(self.sequence.to_be_bytes());
        put_str(&mut hasher, self.kind.as_str());
        put_str(&mut hasher, self.actor.as_str());
        match &self.subject {
            Some(id) => {
                hasher.update([1u8]);
                put_str(&mut hasher, id.as_str());
            }
            None => hasher.update([0u8]),
        }
        hasher.update(self.payload_hash.as_bytes());
        hasher.update(self.prev_hash.as_bytes());
        put_str(
            &mut hasher,
            &self.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
        );
        EntryHash::from(<[u8; 32]>::from(hasher.finalize()))
    }

    /// whether header fields agree with the payload.
    pub fn is_consistent(&self) -> bool {
        self.kind == self.payload.kind() && self.subject.as_ref() == self.payload.subject()
    }
}

fn put_str(hasher: &mut Sha256, s: &str) {
    hasher.update((s.len() as u64).to_be_bytes());
    hasher.update(s.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(candidate: &str) -> AuditPayload {
        AuditPayload::Vote {
            election_id: ElectionId::from("1"),
            candidate_id: CandidateId::from(candidate),
            ballot_id: BallotId(1),
        }
    }

    #[test]
    fn test_payload_digest_is_deterministic() {
        assert_eq!(vote("c1").digest().unwrap(), vote("c1").digest().unwrap());
        assert_ne!(vote("c1").digest().unwrap(), vote("c2").digest().unwrap());
    }

    #[test]
    fn test_profile_key_order_does_not_change_digest() {
        let a: serde_json::Value = serde_json::from_str(r#"{"name":"A","email":"a@x"}"#).unwrap();
        let b: serde_json::Value = serde_json::from_str(r#"{"email":"a@x","name":"A"}"#).unwrap();
        let payload = |v: serde_json::Value| AuditPayload::Registration {
            registration_id: RegistrationId(1),
            address: Address::new("0xA").unwrap(),
            profile: Profile::from(v),
        };
        assert_eq!(
            payload(a).digest().unwrap(),
            payload(b).digest().unwrap()
        );
    }

    #[test]
    fn test_kind_and_subject_follow_payload() {
        let p = vote("c1");
        assert_eq!(p.kind(), AuditKind::Vote);
        assert_eq!(p.subject(), Some(&ElectionId::from("1")));

        let reg = AuditPayload::Registration {
            registration_id: RegistrationId(1),
            address: Address::new("0xA").unwrap(),
            profile: Profile::empty(),
        };
        assert_eq!(reg.kind(), AuditKind::Registration);
        assert_eq!(reg.subject(), None);
    }

    #[test]
    fn test_entry_hash_covers_every_field() {
        let payload = vote("c1");
        let entry = AuditEntry {
            sequence: 3,
            kind: AuditKind::Vote,
            actor: Address::new("0xA").unwrap(),
            subject: Some(ElectionId::from("1")),
            payload_hash: payload.digest().unwrap(),
            payload,
            prev_hash: EntryHash::GENESIS,
            timestamp: Utc::now(),
        };
        let base = entry.hash();

        let mut e = entry.clone();
        e.sequence = 4;
        assert_ne!(e.hash(), base);

        let mut e = entry.clone();
        e.actor = Address::new("0xB").unwrap();
        assert_ne!(e.hash(), base);

        let mut e = entry.clone();
        e.subject = None;
        assert_ne!(e.hash(), base);

        let mut e = entry.clone();
        e.prev_hash = EntryHash::digest(b"x");
        assert_ne!(e.hash(), base);

        let mut e = entry.clone();
        e.timestamp += chrono::Duration::nanoseconds(1);
        assert_ne!(e.hash(), base);
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("vote".parse::<AuditKind>().unwrap(), AuditKind::Vote);
        assert_eq!("Registration".parse::<AuditKind>().unwrap(), AuditKind::Registration);
        assert_eq!("election".parse::<AuditKind>().unwrap(), AuditKind::ElectionCreated);
        assert!("gas".parse::<AuditKind>().is_err());
    }

    #[test]
    fn test_payload_wire_format_is_tagged() {
        let json = serde_json::to_value(vote("c1")).unwrap();
        assert_eq!(json["type"], "vote");
        assert_eq!(json["candidate_id"], "c1");
    }
}
