//! publishing committed entries to an external collaborator.
//!
//! the ledger itself is a single-authority store. a replicated log or a
//! public chain that anchors the audit trail plugs in here: the ledger calls
//! every registered sink once per committed entry, in sequence order per
//! caller.

use tracing::debug;

use crate::AuditEntry;

/// receiver for committed audit entries.
pub trait AuditSink: Send + Sync {
    /// called after `entry` has been durably linked into the chain.
    fn publish(&self, entry: &AuditEntry);
}

/// sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl AuditSink for NoopSink {
    fn publish(&self, _entry: &AuditEntry) {}
}

/// sink that forwards entries to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn publish(&self, entry: &AuditEntry) {
        debug!(
            sequence = entry.sequence,
            kind = %entry.kind,
            actor = %entry.actor,
            subject = entry.subject.as_ref().map(|s| s.as_str()),
            hash = %entry.hash(),
            "audit entry committed"
        );
    }
}
