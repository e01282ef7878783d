//! cli subcommands for ballotchain.
//!
//! - `ballotchain voters register <address>` - register a voter
//! - `ballotchain elections create --title ... --candidate X` - define an election
//! - `ballotchain vote <election> <voter> <candidate>` - cast a ballot
//! - `ballotchain audit verify` - check the audit chain
//! - etc.

mod audit;
mod elections;
mod stats;
mod vote;
mod voters;

pub use audit::AuditCommand;
pub use elections::ElectionsCommand;
pub use stats::StatsCommand;
pub use vote::VoteCommand;
pub use voters::VotersCommand;

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ballotchain_audit::TracingSink;
use ballotchain_state::{Ledger, SnapshotStore};
use ballotchain_types::Config;
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Context, Report, Result};
use tracing::{Level, debug, info};
use tracing_subscriber::FmtSubscriber;

/// default config file search paths (in order of priority).
const CONFIG_SEARCH_PATHS: &[&str] = &[
    "/etc/ballotchain/config.toml",
    "~/.config/ballotchain/config.toml",
    "./ballotchain.toml",
];

/// ballotchain - tamper-evident election ledger
#[derive(Parser, Debug)]
#[command(name = "ballotchain")]
#[command(about = "Tamper-evident election ledger", long_about = None)]
#[command(version)]
pub struct Cli {
    /// ledger location and configuration
    #[command(flatten)]
    pub ledger: LedgerArgs,

    /// command to run
    #[command(subcommand)]
    pub command: Command,
}

/// top-level commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// manage registered voters
    #[command(subcommand)]
    Voters(VotersCommand),

    /// manage elections
    #[command(subcommand)]
    Elections(ElectionsCommand),

    /// cast a vote
    Vote(VoteCommand),

    /// show ledger-wide statistics
    Stats(StatsCommand),

    /// inspect and verify the audit trail
    #[command(subcommand)]
    Audit(AuditCommand),
}

/// options shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct LedgerArgs {
    /// path to config file (toml format)
    #[arg(short, long, env = "BALLOTCHAIN_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// path to the ledger snapshot
    #[arg(long, env = "BALLOTCHAIN_SNAPSHOT", global = true)]
    pub snapshot: Option<PathBuf>,

    /// log level
    #[arg(long, env = "BALLOTCHAIN_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// load the snapshot without verifying the audit chain
    #[arg(long, default_value_t = false, global = true)]
    pub no_verify: bool,
}

impl LedgerArgs {
    /// find and load config file, returning none if no config file is found.
    fn load_config_file(config_path: Option<&PathBuf>) -> Result<Option<Config>> {
        // if explicit path provided, it must exist
        if let Some(path) = config_path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file: {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("failed to parse config file: {:?}", path))?;
            return Ok(Some(config));
        }

        // search default paths
        for path_str in CONFIG_SEARCH_PATHS {
            let Some(path) = expand_home(path_str) else {
                continue;
            };
            if path.exists() {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config file: {:?}", path))?;
                let config: Config = toml::from_str(&content)
                    .with_context(|| format!("failed to parse config file: {:?}", path))?;
                return Ok(Some(config));
            }
        }

        Ok(None)
    }

    /// merge cli arguments with the config file, if any.
    ///
    /// priority order: defaults -> config file -> cli flags
    pub fn into_config(self) -> Result<Config> {
        let mut config = match Self::load_config_file(self.config.as_ref())? {
            Some(file_config) => file_config,
            None => Config::default(),
        };

        // cli overrides (only if explicitly set)
        if let Some(snapshot) = self.snapshot {
            config.snapshot_path = snapshot;
        }
        if let Some(log_level) = self.log_level {
            config.log_level = log_level;
        }
        if self.no_verify {
            config.verify_on_load = false;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

/// resolve a leading `~/` against `$HOME`.
fn expand_home(path: &str) -> Option<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => std::env::var_os("HOME").map(|home| PathBuf::from(home).join(rest)),
        None => Some(PathBuf::from(path)),
    }
}

/// install the global tracing subscriber. logs go to stderr so json output
/// on stdout stays parseable.
pub fn init_tracing(log_level: &str) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// advisory lock file next to the snapshot (`<snapshot>.lock`).
///
/// a cli run holds it from load to save, so concurrent runs against the
/// same snapshot take turns instead of saving over each other.
pub struct SnapshotLock {
    lock: fd_lock::RwLock<File>,
    path: PathBuf,
}

impl SnapshotLock {
    /// open (creating if needed) the lock file for `snapshot`.
    pub fn open(snapshot: &Path) -> Result<Self> {
        let mut name = snapshot.as_os_str().to_owned();
        name.push(".lock");
        let path = PathBuf::from(name);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {:?}", parent))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .with_context(|| format!("failed to open lock file: {:?}", path))?;
        Ok(Self {
            lock: fd_lock::RwLock::new(file),
            path,
        })
    }

    /// block until this run holds the lock exclusively.
    pub fn acquire(&mut self) -> Result<fd_lock::RwLockWriteGuard<'_, File>> {
        debug!(path = ?self.path, "waiting for snapshot lock");
        let path = &self.path;
        self.lock
            .write()
            .with_context(|| format!("failed to lock snapshot: {:?}", path))
    }

    /// take the lock if nobody else holds it.
    pub fn try_acquire(&mut self) -> Result<Option<fd_lock::RwLockWriteGuard<'_, File>>> {
        let path = &self.path;
        match self.lock.try_write() {
            Ok(guard) => Ok(Some(guard)),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to lock snapshot: {:?}", path)),
        }
    }
}

impl std::fmt::Debug for SnapshotLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotLock").field("path", &self.path).finish()
    }
}

/// a loaded ledger and the store it came from.
///
/// open it while holding the [`SnapshotLock`] and keep the lock until the
/// last [`Session::save`].
pub struct Session {
    ledger: Ledger,
    store: SnapshotStore,
}

impl Session {
    /// load the ledger from `config.snapshot_path`, or start an empty one.
    pub fn open(config: Config) -> Result<Self> {
        let store = SnapshotStore::new(config.snapshot_path.clone());
        let ledger = match store.load().map_err(rejected)? {
            Some(snapshot) => {
                info!(path = %store.path().display(), "loading ledger");
                Ledger::restore(snapshot, config).map_err(rejected)?
            }
            None => {
                debug!(path = %store.path().display(), "no snapshot, starting empty ledger");
                Ledger::new(config)
            }
        };

        Ok(Self {
            ledger: ledger.with_sink(Arc::new(TracingSink)),
            store,
        })
    }

    /// the loaded ledger.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// persist the current ledger state.
    pub fn save(&self) -> Result<()> {
        self.store
            .save(&self.ledger.snapshot())
            .with_context(|| format!("failed to save ledger to {:?}", self.store.path()))
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("path", &self.store.path())
            .field("ledger", &self.ledger)
            .finish()
    }
}

/// turn a ledger error into a report that carries its stable code.
pub(crate) fn rejected(err: ballotchain_state::Error) -> Report {
    let code = err.code();
    Report::new(err).wrap_err(format!("rejected ({code})"))
}
