//! ballotchain library - command-line front end for the election ledger.
//!
//! every invocation loads the ledger snapshot, runs one command against it
//! and, for commands that change state, writes the snapshot back.
//! - [`cli`]: argument parsing, configuration and the subcommands

#![warn(missing_docs)]

/// command-line interface implementation
pub mod cli;
