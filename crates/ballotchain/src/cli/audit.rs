//! the `audit` subcommand - inspect and verify the audit trail

use ballotchain_audit::{AuditEntry, AuditFilter, AuditKind, AuditPayload};
use clap::{Args, Subcommand};
use color_eyre::eyre::{Result, bail};
use tracing::warn;

use super::{Session, rejected};

/// inspect and verify the audit trail
#[derive(Subcommand, Debug)]
pub enum AuditCommand {
    /// list audit entries, optionally filtered
    Trail(TrailArgs),

    /// verify the hash chain and reconcile every election's tally
    Verify,
}

/// list audit entries, optionally filtered
#[derive(Args, Debug)]
pub struct TrailArgs {
    /// only entries of this kind (registration, vote, election_created,
    /// election_closed); repeatable
    #[arg(long = "kind")]
    kinds: Vec<AuditKind>,

    /// only entries whose actor address contains this text
    #[arg(long)]
    address: Option<String>,

    /// only entries with a hash containing this hex text
    #[arg(long)]
    hash: Option<String>,

    /// show at most this many entries, newest last
    #[arg(long)]
    limit: Option<usize>,

    /// output format (table, json)
    #[arg(short, long, default_value = "table")]
    output: String,
}

impl TrailArgs {
    fn filter(&self) -> AuditFilter {
        AuditFilter {
            kind_in: self.kinds.clone(),
            address_contains: self.address.clone(),
            hash_contains: self.hash.clone(),
        }
    }
}

impl AuditCommand {
    /// run the audit command
    pub fn run(self, session: &Session) -> Result<()> {
        match self {
            AuditCommand::Trail(args) => trail(session, args),
            AuditCommand::Verify => verify(session),
        }
    }
}

fn trail(session: &Session, args: TrailArgs) -> Result<()> {
    let query = session.ledger().audit_trail(args.filter());
    let mut entries: Vec<AuditEntry> = query.iter().collect();
    if let Some(limit) = args.limit {
        let skip = entries.len().saturating_sub(limit);
        entries.drain(..skip);
    }

    if args.output == "json" {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No audit entries found.");
        return Ok(());
    }

    println!(
        "{:<6} {:<18} {:<24} {:<20} {:<18} {}",
        "SEQ", "KIND", "ACTOR", "TIME", "HASH", "DETAIL"
    );
    println!("{}", "-".repeat(110));
    for entry in &entries {
        let hash = entry.hash().to_hex();
        println!(
            "{:<6} {:<18} {:<24} {:<20} {:<18} {}",
            entry.sequence,
            entry.kind,
            entry.actor,
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            &hash[..16],
            detail(&entry.payload),
        );
    }
    Ok(())
}

/// one-line summary of a payload.
fn detail(payload: &AuditPayload) -> String {
    match payload {
        AuditPayload::Registration {
            registration_id, ..
        } => format!("registration {registration_id}"),
        AuditPayload::Vote {
            election_id,
            candidate_id,
            ballot_id,
        } => format!("ballot {ballot_id}: {candidate_id} in election {election_id}"),
        AuditPayload::ElectionCreated {
            election_id,
            title,
            candidates,
            ..
        } => format!(
            "election {election_id} \"{title}\" with {} candidates",
            candidates.len()
        ),
        AuditPayload::ElectionClosed { election_id } => format!("election {election_id} closed"),
    }
}

fn verify(session: &Session) -> Result<()> {
    let ledger = session.ledger();
    ledger.verify_audit_chain().map_err(rejected)?;

    let mut mismatched = Vec::new();
    for (election, _) in ledger.elections(chrono::Utc::now()) {
        if !ledger.reconcile(&election.id).map_err(rejected)? {
            warn!(election_id = %election.id, "tally does not reconcile");
            mismatched.push(election.id);
        }
    }
    if !mismatched.is_empty() {
        let ids: Vec<String> = mismatched.iter().map(ToString::to_string).collect();
        bail!("tallies do not match the audit trail for elections: {}", ids.join(", "));
    }

    let log = ledger.audit_log();
    println!("Audit chain OK: {} entries, head {}", log.len(), log.head());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::tests::session_in;
    use ballotchain_state::SnapshotStore;
    use ballotchain_types::test_utils::TestElectionBuilder;
    use ballotchain_types::{Address, CandidateId, Config, Profile};
    use chrono::Utc;

    fn populated(dir: &tempfile::TempDir) {
        let session = session_in(dir);
        let ledger = session.ledger();
        let now = Utc::now();
        let voter = Address::new("0xA").unwrap();
        ledger.register(&voter, Profile::empty(), now).unwrap();
        let election = ledger
            .create_election(
                &Address::new("0xADMIN").unwrap(),
                TestElectionBuilder::new("E1").build(),
                now,
            )
            .unwrap();
        ledger
            .cast_vote(&election, &voter, &CandidateId::for_index(0), now)
            .unwrap();
        session.save().unwrap();
    }

    fn trail_args() -> TrailArgs {
        TrailArgs {
            kinds: vec![],
            address: None,
            hash: None,
            limit: None,
            output: "table".into(),
        }
    }

    #[test]
    fn test_verify_clean_ledger() {
        let dir = tempfile::tempdir().unwrap();
        populated(&dir);
        AuditCommand::Verify.run(&session_in(&dir)).unwrap();
    }

    #[test]
    fn test_trail_filters() {
        let dir = tempfile::tempdir().unwrap();
        populated(&dir);
        let session = session_in(&dir);

        let args = TrailArgs {
            kinds: vec!["vote".parse().unwrap()],
            ..trail_args()
        };
        let entries: Vec<_> = session.ledger().audit_trail(args.filter()).iter().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, AuditKind::Vote);

        AuditCommand::Trail(TrailArgs {
            limit: Some(1),
            output: "json".into(),
            ..trail_args()
        })
        .run(&session)
        .unwrap();
    }

    #[test]
    fn test_verify_detects_tampering() {
        let dir = tempfile::tempdir().unwrap();
        populated(&dir);

        let store = SnapshotStore::new(dir.path().join("ledger.json"));
        let mut snapshot = store.load().unwrap().unwrap();
        snapshot.audit[0].actor = Address::new("0xMALLORY").unwrap();
        store.save(&snapshot).unwrap();

        // a verifying load refuses the file outright
        let config = Config {
            snapshot_path: store.path().to_path_buf(),
            ..Config::default()
        };
        assert!(Session::open(config.clone()).is_err());

        let session = Session::open(Config {
            verify_on_load: false,
            ..config
        })
        .unwrap();
        let err = AuditCommand::Verify.run(&session).unwrap_err();
        assert!(err.to_string().contains("audit_chain_corrupted"));
    }
}
