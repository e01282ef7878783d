//! the ledger facade.
//!
//! [`Ledger`] owns every component and is the only thing callers talk to.
//! it does no business validation of its own: it sequences the component
//! calls, hands committed audit entries to the registered sinks and logs
//! the outcome.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use ballotchain_audit::{AuditFilter, AuditKind, AuditLog, AuditQuery, AuditSink};
use ballotchain_types::{
    Address, BallotId, CandidateId, Config, Election, ElectionId, ElectionSpec, ElectionStatus,
    Identity, LedgerStats, Profile, RegistrationId, TallyEntry,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::{
    BallotBox, Committed, ElectionCatalog, Error, IdentityRegistry, LedgerSnapshot, Result,
    SNAPSHOT_VERSION,
};

/// the election ledger.
///
/// all methods are thread-safe. share it behind an `Arc` between callers.
pub struct Ledger {
    config: Config,
    audit: Arc<AuditLog>,
    identities: Arc<IdentityRegistry>,
    catalog: Arc<ElectionCatalog>,
    ballots: BallotBox,
    sinks: Vec<Arc<dyn AuditSink>>,
    /// mutations hold this shared; [`Ledger::snapshot`] holds it exclusively
    gate: RwLock<()>,
}

impl Ledger {
    /// create an empty ledger.
    pub fn new(config: Config) -> Self {
        let audit = Arc::new(AuditLog::new());
        let identities = Arc::new(IdentityRegistry::new(
            Arc::clone(&audit),
            config.registry_shards,
        ));
        let catalog = Arc::new(ElectionCatalog::new(Arc::clone(&audit)));
        let ballots = BallotBox::new(
            Arc::clone(&catalog),
            Arc::clone(&identities),
            Arc::clone(&audit),
        );
        Self {
            config,
            audit,
            identities,
            catalog,
            ballots,
            sinks: Vec::new(),
            gate: RwLock::new(()),
        }
    }

    /// rebuild a ledger from a snapshot.
    ///
    /// with `verify_on_load` set the audit chain is verified first, then
    /// every identity, election and ballot is matched against the entry that
    /// recorded it. see [`LedgerSnapshot::check_against_audit`].
    pub fn restore(snapshot: LedgerSnapshot, config: Config) -> Result<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::Snapshot(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                snapshot.version
            )));
        }

        if config.verify_on_load {
            AuditLog::from_entries(snapshot.audit.clone()).check_chain()?;
            snapshot.check_against_audit()?;
        }
        let audit = Arc::new(AuditLog::from_entries(snapshot.audit));
        let identities = Arc::new(IdentityRegistry::restore(
            Arc::clone(&audit),
            config.registry_shards,
            snapshot.identities,
        )?);
        let catalog = Arc::new(ElectionCatalog::restore(
            Arc::clone(&audit),
            snapshot.elections,
        )?);
        let ballots = BallotBox::restore(
            Arc::clone(&catalog),
            Arc::clone(&identities),
            Arc::clone(&audit),
            snapshot.ballots,
        )?;

        let ledger = Self {
            config,
            audit,
            identities,
            catalog,
            ballots,
            sinks: Vec::new(),
            gate: RwLock::new(()),
        };

        info!(
            identities = ledger.identities.len(),
            elections = ledger.catalog.len(),
            ballots = ledger.ballots.total_ballots(),
            audit_entries = ledger.audit.len(),
            "ledger restored"
        );
        Ok(ledger)
    }

    /// add a sink that receives every entry committed from now on.
    pub fn with_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// get current configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// publish an accepted mutation, or log why it was refused.
    fn commit<T>(&self, op: &'static str, result: Result<Committed<T>>) -> Result<T> {
        match result {
            Ok(Committed { value, entry }) => {
                for sink in &self.sinks {
                    sink.publish(&entry);
                }
                debug!(op, sequence = entry.sequence, "ledger: committed");
                Ok(value)
            }
            Err(err) => {
                debug!(op, code = err.code(), error = %err, "ledger: rejected");
                Err(err)
            }
        }
    }

    fn enter(&self) -> std::sync::RwLockReadGuard<'_, ()> {
        self.gate.read().expect("ledger gate poisoned")
    }

    // identities

    /// register an address. see [`IdentityRegistry::register`].
    pub fn register(
        &self,
        address: &Address,
        profile: Profile,
        now: DateTime<Utc>,
    ) -> Result<RegistrationId> {
        let _gate = self.enter();
        self.commit("register", self.identities.register(address, profile, now))
    }

    /// whether `address` is registered.
    pub fn is_registered(&self, address: &Address) -> bool {
        self.identities.is_registered(address)
    }

    /// the registration record of `address`.
    pub fn identity(&self, address: &Address) -> Option<Identity> {
        self.identities.get(address)
    }

    /// every registered identity, ordered by registration id.
    pub fn identities(&self) -> Vec<Identity> {
        self.identities.identities()
    }

    // elections

    /// create an election on behalf of `actor`.
    ///
    /// the actor is recorded in the audit trail. deciding whether it may
    /// create elections at all is up to the caller.
    pub fn create_election(
        &self,
        actor: &Address,
        spec: ElectionSpec,
        now: DateTime<Utc>,
    ) -> Result<ElectionId> {
        let _gate = self.enter();
        self.commit(
            "create_election",
            self.catalog.create_election(spec, actor, now),
        )
    }

    /// election definition by id.
    pub fn election(&self, id: &ElectionId) -> Result<Election> {
        self.catalog.get_election(id)
    }

    /// status of an election at `now`.
    pub fn election_status(&self, id: &ElectionId, now: DateTime<Utc>) -> Result<ElectionStatus> {
        self.catalog.get_status(id, now)
    }

    /// every election with its status at `now`, in creation order.
    pub fn elections(&self, now: DateTime<Utc>) -> Vec<(Election, ElectionStatus)> {
        self.catalog.list(now)
    }

    /// elections accepting votes at `now`.
    pub fn active_elections(&self, now: DateTime<Utc>) -> Vec<Election> {
        self.catalog
            .list(now)
            .into_iter()
            .filter(|(_, status)| *status == ElectionStatus::Open)
            .map(|(election, _)| election)
            .collect()
    }

    /// force-close an election. see [`ElectionCatalog::force_close`].
    pub fn close_election(
        &self,
        id: &ElectionId,
        actor: &Address,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let _gate = self.enter();
        self.commit("close_election", self.catalog.force_close(id, actor, now))
    }

    // ballots

    /// cast a vote. see [`BallotBox::cast_vote`] for the checks and their
    /// order.
    pub fn cast_vote(
        &self,
        election_id: &ElectionId,
        voter: &Address,
        candidate_id: &CandidateId,
        now: DateTime<Utc>,
    ) -> Result<BallotId> {
        let _gate = self.enter();
        self.commit(
            "cast_vote",
            self.ballots.cast_vote(election_id, voter, candidate_id, now),
        )
    }

    /// whether `voter` already voted in the election.
    pub fn has_voted(&self, election_id: &ElectionId, voter: &Address) -> bool {
        self.ballots.has_voted(election_id, voter)
    }

    /// ordered tally with candidate names and parties.
    pub fn results(&self, election_id: &ElectionId) -> Result<Vec<TallyEntry>> {
        self.ballots.tally(election_id)
    }

    /// aggregate counters across the ledger.
    pub fn stats(&self) -> LedgerStats {
        LedgerStats::new(
            self.identities.len() as u64,
            self.ballots.total_ballots(),
            self.catalog.len() as u64,
        )
    }

    // audit

    /// lazy, restartable view of the audit trail.
    pub fn audit_trail(&self, filter: AuditFilter) -> AuditQuery<'_> {
        self.audit.query(filter)
    }

    /// number of audit entries per kind.
    pub fn audit_summary(&self) -> BTreeMap<AuditKind, u64> {
        self.audit.kind_counts()
    }

    /// verify the whole audit chain.
    ///
    /// a failure means the log can no longer be trusted. callers should stop
    /// writing and alert; the ledger itself keeps running.
    pub fn verify_audit_chain(&self) -> Result<()> {
        self.audit.check_chain().map_err(Error::from)
    }

    /// cross-check an election's ballots against its vote entries.
    ///
    /// returns `true` when the tally total, the number of stored ballots and
    /// the number of vote entries in the audit trail all agree.
    pub fn reconcile(&self, election_id: &ElectionId) -> Result<bool> {
        let tallied: u64 = self.ballots.tally(election_id)?.iter().map(|t| t.votes).sum();
        let stored = self.ballots.ballot_count(election_id);
        let audited = self.audit.vote_count(election_id);
        if tallied != stored || stored != audited {
            warn!(
                election_id = %election_id,
                tallied,
                stored,
                audited,
                "ledger: tally does not reconcile"
            );
            return Ok(false);
        }
        Ok(true)
    }

    /// the underlying audit log.
    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    // persistence

    /// consistent image of the whole ledger.
    ///
    /// waits for in-flight mutations to finish and holds new ones off until
    /// the image is taken.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let _gate = self.gate.write().expect("ledger gate poisoned");
        LedgerSnapshot {
            version: SNAPSHOT_VERSION,
            identities: self.identities.identities(),
            elections: self.catalog.elections(),
            ballots: self.ballots.ballots(),
            audit: self.audit.entries(),
        }
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("identities", &self.identities)
            .field("catalog", &self.catalog)
            .field("ballots", &self.ballots)
            .field("audit", &self.audit)
            .field("sinks", &self.sinks.len())
            .finish()
    }
}
