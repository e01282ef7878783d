//! append-only audit trail for the ballotchain ledger.
//!
//! every accepted state change (registration, vote, election creation or
//! close) is recorded as an [`AuditEntry`]. entries are numbered without
//! gaps and each one commits to its predecessor through `prev_hash`, so a
//! retroactive edit anywhere in the log is caught by
//! [`AuditLog::verify_chain`].
//!
//! - [`entry_hash`]: 32-byte SHA-256 digest type
//! - [`entry`]: entry, kind and payload types plus canonical hashing
//! - [`log`]: the log itself
//! - [`query`]: restartable filtered iteration
//! - [`sink`]: hook for publishing committed entries to an external ledger

pub mod entry;
pub mod entry_hash;
pub mod error;
pub mod log;
pub mod query;
pub mod sink;

pub use entry::{AuditEntry, AuditKind, AuditPayload};
pub use entry_hash::{ENTRY_HASH_LEN, EntryHash};
pub use error::Error;
pub use log::AuditLog;
pub use query::{AuditFilter, AuditIter, AuditQuery};
pub use sink::{AuditSink, NoopSink, TracingSink};

/// result type for audit operations.
pub type Result<T> = std::result::Result<T, Error>;
