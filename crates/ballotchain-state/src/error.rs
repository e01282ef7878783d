//! ledger error types
//!
//! every rejected operation maps to exactly one variant, and every variant
//! has a stable [`Error::code`] the presentation layer can key messages on.

use ballotchain_types::{Address, CandidateId, ElectionId, ElectionStatus};
use thiserror::Error;

/// errors that can occur in ledger operations
#[derive(Debug, Error)]
pub enum Error {
    /// registration retried for an existing address
    #[error("address already registered: {0}")]
    AlreadyRegistered(Address),

    /// malformed election definition
    #[error("invalid election spec: {0}")]
    InvalidElectionSpec(String),

    /// no election with this id
    #[error("election not found: {0}")]
    ElectionNotFound(ElectionId),

    /// candidate is not part of the election
    #[error("unknown candidate {candidate_id} in election {election_id}")]
    UnknownCandidate {
        election_id: ElectionId,
        candidate_id: CandidateId,
    },

    /// vote (or close) attempted outside the open window
    #[error("election {election_id} is not open (status: {status})")]
    ElectionNotOpen {
        election_id: ElectionId,
        status: ElectionStatus,
    },

    /// voter has no registration
    #[error("voter not registered: {0}")]
    VoterNotRegistered(Address),

    /// second vote for the same (election, voter)
    #[error("{voter} has already voted in election {election_id}")]
    DuplicateVote {
        election_id: ElectionId,
        voter: Address,
    },

    /// audit log failed verification; stop writing and alert
    #[error("audit chain corrupted at sequence {sequence}")]
    AuditChainCorrupted { sequence: u64 },

    /// audit entry could not be produced
    #[error("audit error: {0}")]
    Audit(String),

    /// durable store could not be read or written
    #[error("snapshot error: {0}")]
    Snapshot(String),
}

impl Error {
    /// stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Error::AlreadyRegistered(_) => "already_registered",
            Error::InvalidElectionSpec(_) => "invalid_election_spec",
            Error::ElectionNotFound(_) => "election_not_found",
            Error::UnknownCandidate { .. } => "unknown_candidate",
            Error::ElectionNotOpen { .. } => "election_not_open",
            Error::VoterNotRegistered(_) => "voter_not_registered",
            Error::DuplicateVote { .. } => "duplicate_vote",
            Error::AuditChainCorrupted { .. } => "audit_chain_corrupted",
            Error::Audit(_) => "audit_error",
            Error::Snapshot(_) => "snapshot_error",
        }
    }
}

impl From<ballotchain_audit::Error> for Error {
    fn from(err: ballotchain_audit::Error) -> Self {
        match err {
            ballotchain_audit::Error::ChainCorrupted { sequence } => {
                Error::AuditChainCorrupted { sequence }
            }
            other => Error::Audit(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_corruption_converts() {
        let err: Error = ballotchain_audit::Error::ChainCorrupted { sequence: 7 }.into();
        assert!(matches!(err, Error::AuditChainCorrupted { sequence: 7 }));
        assert_eq!(err.code(), "audit_chain_corrupted");
    }

    #[test]
    fn test_duplicate_vote_message() {
        let err = Error::DuplicateVote {
            election_id: ElectionId::from("1"),
            voter: Address::new("0xA").unwrap(),
        };
        assert_eq!(err.to_string(), "0xA has already voted in election 1");
        assert_eq!(err.code(), "duplicate_vote");
    }
}
