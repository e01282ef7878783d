//! accepted ballots, tallies and ledger-wide statistics.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, CandidateId, ElectionId};

/// unique identifier for an accepted ballot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BallotId(pub u64);

impl From<u64> for BallotId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for BallotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// one accepted vote. at most one exists per (election, voter) and it is
/// never updated or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub id: BallotId,
    pub election_id: ElectionId,
    pub voter: Address,
    pub candidate_id: CandidateId,
    pub cast_at: DateTime<Utc>,
}

/// per-candidate vote count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyEntry {
    pub candidate_id: CandidateId,
    pub name: String,
    pub party: String,
    pub votes: u64,
}

/// aggregate numbers across the whole ledger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LedgerStats {
    /// registered identities
    pub total_registered: u64,
    /// accepted ballots across every election
    pub total_ballots: u64,
    /// elections ever created
    pub total_elections: u64,
    /// `total_ballots / total_registered`, or 0 with no registrations
    pub turnout: f64,
}

impl LedgerStats {
    /// build stats, deriving turnout from the two counters.
    pub fn new(total_registered: u64, total_ballots: u64, total_elections: u64) -> Self {
        let turnout = if total_registered == 0 {
            0.0
        } else {
            total_ballots as f64 / total_registered as f64
        };
        Self {
            total_registered,
            total_ballots,
            total_elections,
            turnout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turnout_zero_without_registrations() {
        let stats = LedgerStats::new(0, 0, 3);
        assert_eq!(stats.turnout, 0.0);
    }

    #[test]
    fn test_turnout_ratio() {
        let stats = LedgerStats::new(4, 3, 1);
        assert!((stats.turnout - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_turnout_can_exceed_one_across_elections() {
        // one voter, two elections
        let stats = LedgerStats::new(1, 2, 2);
        assert!((stats.turnout - 2.0).abs() < f64::EPSILON);
    }
}
