//! configuration types for ballotchain

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::Error;

/// main configuration for ballotchain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// where the ledger snapshot is persisted.
    pub snapshot_path: PathBuf,

    /// log level: trace, debug, info, warn or error.
    pub log_level: String,

    /// verify the audit chain when restoring a snapshot.
    pub verify_on_load: bool,

    /// number of lock shards in the identity registry.
    pub registry_shards: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("./ballotchain.json"),
            log_level: "info".to_string(),
            verify_on_load: true,
            registry_shards: 16,
        }
    }
}

impl Config {
    /// check values that serde alone cannot constrain.
    pub fn validate(&self) -> Result<(), Error> {
        if self.registry_shards == 0 {
            return Err(Error::Config("registry_shards must be at least 1".into()));
        }
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => Err(Error::Config(format!("unknown log level: {other}"))),
        }
    }
}
