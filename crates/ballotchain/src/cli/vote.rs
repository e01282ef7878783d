//! the `vote` subcommand - cast a ballot

use ballotchain_state::Ledger;
use ballotchain_types::{Address, CandidateId, ElectionId};
use chrono::Utc;
use clap::Args;
use color_eyre::eyre::Result;

use super::{Session, rejected};

/// cast a vote
#[derive(Args, Debug)]
pub struct VoteCommand {
    /// election id
    election: ElectionId,

    /// wallet address of the voter
    voter: Address,

    /// candidate id (`c1`) or candidate name
    candidate: String,
}

impl VoteCommand {
    /// run the vote command
    pub fn run(self, session: &Session) -> Result<()> {
        let ledger = session.ledger();
        let candidate = resolve_candidate(ledger, &self.election, &self.candidate);
        let ballot = ledger
            .cast_vote(&self.election, &self.voter, &candidate, Utc::now())
            .map_err(rejected)?;
        session.save()?;

        println!(
            "Accepted ballot {} from {} for {} in election {}",
            ballot, self.voter, candidate, self.election
        );
        Ok(())
    }
}

/// map a candidate argument to an id. ids win over names; names match
/// case-insensitively. anything else is passed through for the ledger to
/// reject.
fn resolve_candidate(ledger: &Ledger, election: &ElectionId, arg: &str) -> CandidateId {
    let Ok(election) = ledger.election(election) else {
        return CandidateId::from(arg);
    };
    election
        .candidates
        .iter()
        .find(|c| c.id.as_str() == arg)
        .or_else(|| {
            election
                .candidates
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(arg.trim()))
        })
        .map(|c| c.id.clone())
        .unwrap_or_else(|| CandidateId::from(arg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::tests::session_in;
    use ballotchain_types::test_utils::TestElectionBuilder;
    use ballotchain_types::Profile;

    fn vote(election: &ElectionId, voter: &str, candidate: &str) -> VoteCommand {
        VoteCommand {
            election: election.clone(),
            voter: Address::new(voter).unwrap(),
            candidate: candidate.to_string(),
        }
    }

    fn prepared(dir: &tempfile::TempDir) -> ElectionId {
        let session = session_in(dir);
        let now = Utc::now();
        session
            .ledger()
            .register(&Address::new("0xA").unwrap(), Profile::empty(), now)
            .unwrap();
        let id = session
            .ledger()
            .create_election(
                &Address::new("0xADMIN").unwrap(),
                TestElectionBuilder::new("E1")
                    .with_candidates(["Alice", "Bob"])
                    .build(),
                now,
            )
            .unwrap();
        session.save().unwrap();
        id
    }

    #[test]
    fn test_vote_by_name_then_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let election = prepared(&dir);

        vote(&election, "0xA", "bob").run(&session_in(&dir)).unwrap();

        let session = session_in(&dir);
        let tally = session.ledger().results(&election).unwrap();
        assert_eq!(tally[0].name, "Bob");
        assert_eq!(tally[0].votes, 1);

        let err = vote(&election, "0xA", "c1").run(&session).unwrap_err();
        assert!(err.to_string().contains("duplicate_vote"));
    }

    #[test]
    fn test_unknown_candidate_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let election = prepared(&dir);
        let err = vote(&election, "0xA", "Carol")
            .run(&session_in(&dir))
            .unwrap_err();
        assert!(err.to_string().contains("unknown_candidate"));
    }

    #[test]
    fn test_unregistered_voter() {
        let dir = tempfile::tempdir().unwrap();
        let election = prepared(&dir);
        let err = vote(&election, "0xB", "c1")
            .run(&session_in(&dir))
            .unwrap_err();
        assert!(err.to_string().contains("voter_not_registered"));
    }
}
