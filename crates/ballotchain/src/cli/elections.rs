//! the `elections` subcommand - manage elections

use ballotchain_types::{Address, CandidateSpec, Election, ElectionId, ElectionSpec, ElectionStatus};
use chrono::{DateTime, Duration, Utc};
use clap::{Args, Subcommand};
use color_eyre::eyre::Result;
use serde::Serialize;

use super::{Session, rejected};

/// manage elections
#[derive(Subcommand, Debug)]
pub enum ElectionsCommand {
    /// create a new election
    Create(CreateArgs),

    /// list all elections
    List(ListArgs),

    /// show one election
    Show(ShowArgs),

    /// close an election before its end time
    Close(CloseArgs),

    /// show the tally of an election
    Results(ResultsArgs),
}

/// create a new election
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// address of the administrator creating the election
    #[arg(long)]
    actor: Address,

    /// election title
    #[arg(long)]
    title: String,

    /// election description
    #[arg(long, default_value = "")]
    description: String,

    /// voting opens (rfc3339, `now`, or an offset like `+1h`)
    #[arg(long, value_parser = parse_time)]
    start: DateTime<Utc>,

    /// voting closes (rfc3339, `now`, or an offset like `+1h`)
    #[arg(long, value_parser = parse_time)]
    end: DateTime<Utc>,

    /// candidate as NAME[:PARTY[:DESCRIPTION]], repeat for each candidate
    #[arg(long = "candidate", value_parser = parse_candidate)]
    candidates: Vec<CandidateSpec>,
}

/// list all elections
#[derive(Args, Debug)]
pub struct ListArgs {
    /// only show elections open right now
    #[arg(long, default_value_t = false)]
    active: bool,

    /// output format (table, json)
    #[arg(short, long, default_value = "table")]
    output: String,
}

/// show one election
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// election id
    election: ElectionId,

    /// output format (table, json)
    #[arg(short, long, default_value = "table")]
    output: String,
}

/// close an election before its end time
#[derive(Args, Debug)]
pub struct CloseArgs {
    /// election id
    election: ElectionId,

    /// address of the administrator closing the election
    #[arg(long)]
    actor: Address,
}

/// show the tally of an election
#[derive(Args, Debug)]
pub struct ResultsArgs {
    /// election id
    election: ElectionId,

    /// output format (table, json)
    #[arg(short, long, default_value = "table")]
    output: String,
}

/// an election with its status, for json output.
#[derive(Serialize)]
struct ElectionView<'a> {
    #[serde(flatten)]
    election: &'a Election,
    status: ElectionStatus,
}

impl ElectionsCommand {
    /// run the elections command
    pub fn run(self, session: &Session) -> Result<()> {
        match self {
            ElectionsCommand::Create(args) => create(session, args),
            ElectionsCommand::List(args) => list(session, args),
            ElectionsCommand::Show(args) => show(session, args),
            ElectionsCommand::Close(args) => close(session, args),
            ElectionsCommand::Results(args) => results(session, args),
        }
    }
}

fn create(session: &Session, args: CreateArgs) -> Result<()> {
    let spec = ElectionSpec {
        title: args.title,
        description: args.description,
        start_time: args.start,
        end_time: args.end,
        candidates: args.candidates,
    };
    let id = session
        .ledger()
        .create_election(&args.actor, spec, Utc::now())
        .map_err(rejected)?;
    session.save()?;

    let election = session.ledger().election(&id).map_err(rejected)?;
    println!("Created election {}: {}", id, election.title);
    for candidate in &election.candidates {
        println!("  {:<4} {}", candidate.id, candidate.name);
    }
    Ok(())
}

fn list(session: &Session, args: ListArgs) -> Result<()> {
    let elections: Vec<(Election, ElectionStatus)> = session
        .ledger()
        .elections(Utc::now())
        .into_iter()
        .filter(|(_, status)| !args.active || *status == ElectionStatus::Open)
        .collect();

    if args.output == "json" {
        let views: Vec<ElectionView<'_>> = elections
            .iter()
            .map(|(election, status)| ElectionView {
                election,
                status: *status,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    if elections.is_empty() {
        println!("No elections found.");
        return Ok(());
    }

    println!(
        "{:<6} {:<30} {:<10} {:<20} {:<20}",
        "ID", "TITLE", "STATUS", "START", "END"
    );
    println!("{}", "-".repeat(90));
    for (election, status) in elections {
        println!(
            "{:<6} {:<30} {:<10} {:<20} {:<20}",
            election.id,
            election.title,
            status,
            election.start_time.format("%Y-%m-%d %H:%M"),
            election.end_time.format("%Y-%m-%d %H:%M"),
        );
    }
    Ok(())
}

fn show(session: &Session, args: ShowArgs) -> Result<()> {
    let ledger = session.ledger();
    let election = ledger.election(&args.election).map_err(rejected)?;
    let status = election.status_at(Utc::now());

    if args.output == "json" {
        let view = ElectionView {
            election: &election,
            status,
        };
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("Election {}: {}", election.id, election.title);
    if !election.description.is_empty() {
        println!("  {}", election.description);
    }
    println!("  Status:     {}", status);
    println!("  Start:      {}", election.start_time.to_rfc3339());
    println!("  End:        {}", election.end_time.to_rfc3339());
    if let Some(closed_at) = election.closed_at {
        println!("  Closed at:  {}", closed_at.to_rfc3339());
    }
    println!("  Created by: {}", election.created_by);
    println!("  Candidates:");
    for candidate in &election.candidates {
        let party = if candidate.party.is_empty() {
            String::new()
        } else {
            format!(" ({})", candidate.party)
        };
        println!("    {:<4} {}{}", candidate.id, candidate.name, party);
    }
    Ok(())
}

fn close(session: &Session, args: CloseArgs) -> Result<()> {
    session
        .ledger()
        .close_election(&args.election, &args.actor, Utc::now())
        .map_err(rejected)?;
    session.save()?;

    println!("Closed election {}", args.election);
    Ok(())
}

fn results(session: &Session, args: ResultsArgs) -> Result<()> {
    let ledger = session.ledger();
    let tally = ledger.results(&args.election).map_err(rejected)?;

    if args.output == "json" {
        println!("{}", serde_json::to_string_pretty(&tally)?);
        return Ok(());
    }

    let total: u64 = tally.iter().map(|t| t.votes).sum();
    println!(
        "{:<6} {:<6} {:<25} {:<20} {:>8}",
        "RANK", "ID", "CANDIDATE", "PARTY", "VOTES"
    );
    println!("{}", "-".repeat(69));
    for (rank, entry) in tally.iter().enumerate() {
        println!(
            "{:<6} {:<6} {:<25} {:<20} {:>8}",
            rank + 1,
            entry.candidate_id,
            entry.name,
            if entry.party.is_empty() { "-" } else { entry.party.as_str() },
            entry.votes,
        );
    }
    println!("Total votes: {}", total);
    if !ledger.reconcile(&args.election).map_err(rejected)? {
        println!("WARNING: tally does not match the audit trail");
    }
    Ok(())
}

/// parse `now`, a signed offset from now (`+90m`, `-1h`, `+2d`, `+30s`) or
/// an rfc3339 timestamp.
fn parse_time(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("now") {
        return Ok(Utc::now());
    }

    if let Some(sign) = s.chars().next().filter(|c| *c == '+' || *c == '-') {
        let body = &s[1..];
        let split = body.char_indices().last().map_or(0, |(i, _)| i);
        let (amount, unit) = body.split_at(split);
        let amount: i64 = amount
            .parse()
            .map_err(|_| format!("invalid time offset: {s}"))?;
        let offset = match unit {
            "s" => Duration::seconds(amount),
            "m" => Duration::minutes(amount),
            "h" => Duration::hours(amount),
            "d" => Duration::days(amount),
            _ => return Err(format!("invalid time offset unit in {s} (use s, m, h or d)")),
        };
        return Ok(if sign == '+' {
            Utc::now() + offset
        } else {
            Utc::now() - offset
        });
    }

    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp {s}: {e}"))
}

/// parse `NAME[:PARTY[:DESCRIPTION]]`.
fn parse_candidate(s: &str) -> std::result::Result<CandidateSpec, String> {
    let mut parts = s.splitn(3, ':');
    let name = parts.next().unwrap_or_default();
    if name.trim().is_empty() {
        return Err(format!("candidate needs a name: {s:?}"));
    }
    let mut candidate = CandidateSpec::new(name);
    if let Some(party) = parts.next() {
        candidate = candidate.with_party(party);
    }
    if let Some(description) = parts.next() {
        candidate = candidate.with_description(description);
    }
    Ok(candidate)
}
