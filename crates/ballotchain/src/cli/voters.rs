//! the `voters` subcommand - manage registered voters

use ballotchain_types::{Address, Profile};
use chrono::Utc;
use clap::{Args, Subcommand};
use color_eyre::eyre::{Context, Result};

use super::{Session, rejected};

/// manage registered voters
#[derive(Subcommand, Debug)]
pub enum VotersCommand {
    /// register a voter address
    Register(RegisterArgs),

    /// check whether an address is registered
    Check(CheckArgs),

    /// list registered voters
    List(ListArgs),
}

/// register a voter address
#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// wallet address of the voter
    address: Address,

    /// profile attributes as a json object
    #[arg(long)]
    profile: Option<String>,
}

/// check whether an address is registered
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// wallet address to look up
    address: Address,

    /// output format (table, json)
    #[arg(short, long, default_value = "table")]
    output: String,
}

/// list registered voters
#[derive(Args, Debug)]
pub struct ListArgs {
    /// output format (table, json)
    #[arg(short, long, default_value = "table")]
    output: String,
}

impl VotersCommand {
    /// run the voters command
    pub fn run(self, session: &Session) -> Result<()> {
        match self {
            VotersCommand::Register(args) => register(session, args),
            VotersCommand::Check(args) => check(session, args),
            VotersCommand::List(args) => list(session, args),
        }
    }
}

fn register(session: &Session, args: RegisterArgs) -> Result<()> {
    let profile = match args.profile {
        Some(json) => {
            let value: serde_json::Value =
                serde_json::from_str(&json).context("--profile is not valid json")?;
            Profile::from(value)
        }
        None => Profile::empty(),
    };

    let id = session
        .ledger()
        .register(&args.address, profile, Utc::now())
        .map_err(rejected)?;
    session.save()?;

    println!("Registered {} (registration {})", args.address, id);
    Ok(())
}

fn check(session: &Session, args: CheckArgs) -> Result<()> {
    let identity = session.ledger().identity(&args.address);

    if args.output == "json" {
        println!("{}", serde_json::to_string_pretty(&identity)?);
        return Ok(());
    }

    match identity {
        Some(identity) => {
            println!("{} is registered:", identity.address);
            println!("  Registration: {}", identity.registration_id);
            println!("  Registered:   {}", identity.registered_at.to_rfc3339());
            if !identity.profile.as_value().is_null() {
                println!("  Profile:      {}", identity.profile.as_value());
            }
        }
        None => println!("{} is not registered", args.address),
    }
    Ok(())
}

fn list(session: &Session, args: ListArgs) -> Result<()> {
    let identities = session.ledger().identities();

    if args.output == "json" {
        println!("{}", serde_json::to_string_pretty(&identities)?);
        return Ok(());
    }

    if identities.is_empty() {
        println!("No voters registered.");
        return Ok(());
    }

    println!("{:<6} {:<44} {:<26}", "ID", "ADDRESS", "REGISTERED");
    println!("{}", "-".repeat(76));
    for identity in identities {
        println!(
            "{:<6} {:<44} {:<26}",
            identity.registration_id,
            identity.address,
            identity.registered_at.format("%Y-%m-%d %H:%M:%S UTC"),
        );
    }
    Ok(())
}
