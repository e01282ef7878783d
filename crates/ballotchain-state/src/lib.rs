//! state management for ballotchain
//!
//! the ledger core: who is registered, which elections exist, which ballots
//! were accepted, and the audit trail recording all of it.
//!
//! - [`IdentityRegistry`]: one-shot address registration
//! - [`ElectionCatalog`]: election definitions and their time-derived status
//! - [`BallotBox`]: one-vote-per-voter admission control and tallies
//! - [`Ledger`]: the single entry point that sequences the components
//! - [`SnapshotStore`]: durable json image of the whole ledger
//!
//! every component writes its audit events through the shared
//! [`ballotchain_audit::AuditLog`]; none of them owns a log of its own.

mod ballot_box;
mod election_catalog;
mod error;
mod identity_registry;
mod ledger;
mod snapshot;

pub use ballot_box::BallotBox;
pub use election_catalog::ElectionCatalog;
pub use error::Error;
pub use identity_registry::IdentityRegistry;
pub use ledger::Ledger;
pub use snapshot::{LedgerSnapshot, SNAPSHOT_VERSION, SnapshotStore};

use ballotchain_audit::AuditEntry;

/// result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// an accepted mutation: its result and the audit entry that recorded it.
#[derive(Debug, Clone)]
pub struct Committed<T> {
    pub value: T,
    pub entry: AuditEntry,
}
