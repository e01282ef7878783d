//! the `stats` subcommand - ledger-wide statistics

use ballotchain_audit::AuditKind;
use chrono::Utc;
use clap::Args;
use color_eyre::eyre::Result;
use serde_json::json;

use super::Session;

/// show ledger-wide statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// output format (table, json)
    #[arg(short, long, default_value = "table")]
    output: String,
}

impl StatsCommand {
    /// run the stats command
    pub fn run(self, session: &Session) -> Result<()> {
        let ledger = session.ledger();
        let stats = ledger.stats();
        let active = ledger.active_elections(Utc::now()).len();
        let summary = ledger.audit_summary();

        if self.output == "json" {
            let value = json!({
                "stats": stats,
                "active_elections": active,
                "audit": summary
                    .iter()
                    .map(|(kind, count)| (kind.as_str(), count))
                    .collect::<std::collections::BTreeMap<_, _>>(),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
            return Ok(());
        }

        let count = |kind: AuditKind| summary.get(&kind).copied().unwrap_or(0);
        println!("Registered voters: {}", stats.total_registered);
        println!("Elections:         {} ({} active)", stats.total_elections, active);
        println!("Ballots cast:      {}", stats.total_ballots);
        println!("Turnout:           {:.1}%", stats.turnout * 100.0);
        println!(
            "Audit entries:     {} registrations, {} elections, {} votes, {} closures",
            count(AuditKind::Registration),
            count(AuditKind::ElectionCreated),
            count(AuditKind::Vote),
            count(AuditKind::ElectionClosed),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::tests::session_in;

    #[test]
    fn test_stats_on_empty_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_in(&dir);
        for output in ["table", "json"] {
            StatsCommand {
                output: output.into(),
            }
            .run(&session)
            .unwrap();
        }
        assert_eq!(session.ledger().stats().turnout, 0.0);
    }
}
