//! ballotchain - election ledger command-line tool

use ballotchain::cli::{Cli, Command, Session, SnapshotLock, init_tracing};
use clap::Parser;
use color_eyre::eyre::Result;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = cli.ledger.into_config()?;
    init_tracing(&config.log_level)?;

    // held until the command returns, covering load and save
    let mut lock = SnapshotLock::open(&config.snapshot_path)?;
    let _guard = lock.acquire()?;
    let session = Session::open(config)?;

    match cli.command {
        Command::Voters(cmd) => cmd.run(&session),
        Command::Elections(cmd) => cmd.run(&session),
        Command::Vote(cmd) => cmd.run(&session),
        Command::Stats(cmd) => cmd.run(&session),
        Command::Audit(cmd) => cmd.run(&session),
    }
}
