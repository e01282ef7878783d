//! core types for ballotchain - a single-authority election ledger.
//!
//! this crate provides the plain data structures shared by every other crate:
//! - [`address`]: opaque voter / actor identifiers supplied by the wallet layer
//! - [`identity`]: voter registration records
//! - [`election`]: election definitions, candidates and lifecycle status
//! - [`ballot`]: accepted votes, tallies and ledger statistics
//! - [`config`]: application configuration

mod address;
mod ballot;
mod config;
mod election;
mod error;
mod identity;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use address::{Address, MAX_ADDRESS_LEN};
pub use ballot::{Ballot, BallotId, LedgerStats, TallyEntry};
pub use config::Config;
pub use election::{
    Candidate, CandidateId, CandidateSpec, Election, ElectionId, ElectionSpec, ElectionStatus,
};
pub use error::Error;
pub use identity::{Identity, Profile, RegistrationId};

/// result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;
