//! The per-transaction context.
//!
//! Composes the footprint ([`RwSet`]), the reclamation sets, and the
//! deferred trigger queue under one lifecycle-managed object. The executor
//! opens a context at transaction begin, routes every tuple access through
//! it, and the transaction manager resolves it at commit or abort.
//!
//! A context is single-writer: only the worker named by `thread_id` at
//! construction may invoke mutating operations, though the transaction
//! manager may hand the whole context to another thread. It is not a
//! synchronization primitive and takes no locks.

use granite_types::{CommitId, EpochId, IsolationLevel, ResultStatus, TupleSlot, TxnId};

use crate::gc::{GcObjectSet, GcSet};
use crate::rw_set::{AccessKind, RwSet};
use crate::triggers::{TriggerData, TriggerSet};

/// Single source of truth for what one transaction has touched.
#[derive(Debug)]
pub struct TransactionContext {
    txn_id: TxnId,
    read_id: CommitId,
    commit_id: CommitId,
    epoch_id: EpochId,
    thread_id: u64,
    isolation: IsolationLevel,
    result: ResultStatus,
    rw_set: RwSet,
    gc_set: GcSet,
    gc_object_set: GcObjectSet,
    on_commit_triggers: Option<TriggerSet>,
}

impl TransactionContext {
    /// Open a context whose commit id has not been assigned yet.
    ///
    /// The commit phase installs the real id later via
    /// [`set_commit_id`](Self::set_commit_id).
    #[must_use]
    pub fn new(thread_id: u64, isolation: IsolationLevel, read_id: CommitId) -> Self {
        Self::with_commit_id(thread_id, isolation, read_id, CommitId::INVALID)
    }

    /// Open a context with the commit id already known.
    #[must_use]
    pub fn with_commit_id(
        thread_id: u64,
        isolation: IsolationLevel,
        read_id: CommitId,
        commit_id: CommitId,
    ) -> Self {
        let context = Self {
            txn_id: TxnId::from(commit_id),
            read_id,
            commit_id,
            epoch_id: EpochId::from_read_id(read_id),
            thread_id,
            isolation,
            result: ResultStatus::default(),
            rw_set: RwSet::new(),
            gc_set: GcSet::new(),
            gc_object_set: GcObjectSet::new(),
            on_commit_triggers: None,
        };
        tracing::debug!(
            txn_id = %context.txn_id,
            read_id = %context.read_id,
            epoch_id = %context.epoch_id,
            thread_id,
            isolation = %context.isolation,
            "transaction context opened"
        );
        context
    }

    // -----------------------------------------------------------------------
    // Identity and flags
    // -----------------------------------------------------------------------

    #[inline]
    #[must_use]
    pub fn txn_id(&self) -> TxnId {
        self.txn_id
    }

    /// Snapshot timestamp assigned at begin.
    #[inline]
    #[must_use]
    pub fn read_id(&self) -> CommitId {
        self.read_id
    }

    /// Serialization timestamp, or [`CommitId::INVALID`] before commit phase.
    #[inline]
    #[must_use]
    pub fn commit_id(&self) -> CommitId {
        self.commit_id
    }

    #[inline]
    #[must_use]
    pub fn epoch_id(&self) -> EpochId {
        self.epoch_id
    }

    /// Worker binding chosen at begin. Advisory; never enforced here.
    #[inline]
    #[must_use]
    pub fn thread_id(&self) -> u64 {
        self.thread_id
    }

    #[inline]
    #[must_use]
    pub fn isolation_level(&self) -> IsolationLevel {
        self.isolation
    }

    #[inline]
    #[must_use]
    pub fn result(&self) -> ResultStatus {
        self.result
    }

    /// Whether an already-read tuple was later promoted to a write.
    #[inline]
    #[must_use]
    pub fn is_written(&self) -> bool {
        self.rw_set.is_written()
    }

    /// Number of tuples currently in the `Insert` classification.
    #[inline]
    #[must_use]
    pub fn insert_count(&self) -> usize {
        self.rw_set.insert_count()
    }

    /// Whether commit may skip the write path entirely.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        !self.rw_set.is_written() && self.rw_set.insert_count() == 0
    }

    /// Install the serialization timestamp chosen at commit phase.
    ///
    /// The transaction id mirrors the commit id from here on.
    ///
    /// # Panics
    ///
    /// If `commit_id` is the reserved sentinel.
    pub fn set_commit_id(&mut self, commit_id: CommitId) {
        assert!(
            commit_id.is_valid(),
            "commit phase may not assign the unassigned-commit-id sentinel"
        );
        self.commit_id = commit_id;
        self.txn_id = TxnId::from(commit_id);
        tracing::debug!(txn_id = %self.txn_id, commit_id = %self.commit_id, "commit id assigned");
    }

    /// Record the resolution outcome. The transaction manager is the sole
    /// legitimate caller.
    pub fn set_result(&mut self, result: ResultStatus) {
        self.result = result;
        tracing::debug!(txn_id = %self.txn_id, result = %result, "transaction result set");
    }

    // -----------------------------------------------------------------------
    // Footprint recording
    // -----------------------------------------------------------------------

    /// Record that this transaction observed the value at `slot`.
    pub fn record_read(&mut self, slot: TupleSlot) {
        self.rw_set.record_read(slot);
    }

    /// Record that this transaction observed `slot` and holds it for a
    /// prospective write.
    pub fn record_read_own(&mut self, slot: TupleSlot) {
        self.rw_set.record_read_own(slot);
    }

    /// Record that this transaction replaced the version at `slot`.
    pub fn record_update(&mut self, slot: TupleSlot) {
        self.rw_set.record_update(slot);
    }

    /// Record that this transaction created a brand-new version at `slot`.
    pub fn record_insert(&mut self, slot: TupleSlot) {
        self.rw_set.record_insert(slot);
    }

    /// Record that this transaction tombstoned the version at `slot`.
    ///
    /// Returns `true` iff the tombstone elides this transaction's own
    /// insert, in which case the caller may reclaim the new version
    /// immediately.
    pub fn record_delete(&mut self, slot: TupleSlot) -> bool {
        self.rw_set.record_delete(slot)
    }

    /// Current classification for `slot`, if this transaction touched it.
    #[must_use]
    pub fn classification(&self, slot: TupleSlot) -> Option<AccessKind> {
        self.rw_set.classification(slot)
    }

    /// Whether `slot` appears in the footprint.
    #[must_use]
    pub fn is_in_rw_set(&self, slot: TupleSlot) -> bool {
        self.rw_set.contains(slot)
    }

    /// The full footprint, for commit validation to walk directly.
    #[must_use]
    pub fn rw_set(&self) -> &RwSet {
        &self.rw_set
    }

    // -----------------------------------------------------------------------
    // GC bookkeeping
    // -----------------------------------------------------------------------

    /// Tuple versions scheduled for reclamation.
    #[must_use]
    pub fn gc_set(&self) -> &GcSet {
        &self.gc_set
    }

    /// Mutable access for the executor's append path.
    pub fn gc_set_mut(&mut self) -> &mut GcSet {
        &mut self.gc_set
    }

    /// Catalog objects scheduled for drop.
    #[must_use]
    pub fn gc_object_set(&self) -> &GcObjectSet {
        &self.gc_object_set
    }

    /// Mutable access for the executor's append path.
    pub fn gc_object_set_mut(&mut self) -> &mut GcObjectSet {
        &mut self.gc_object_set
    }

    /// Whether no tuple versions are scheduled for reclamation.
    #[must_use]
    pub fn gc_set_is_empty(&self) -> bool {
        self.gc_set.is_empty()
    }

    /// Whether no catalog objects are scheduled for drop.
    #[must_use]
    pub fn gc_object_set_is_empty(&self) -> bool {
        self.gc_object_set.is_empty()
    }

    /// Hand both reclamation sets to the collector, leaving this context
    /// with empty ones. Called at commit/abort resolution, right before the
    /// context is destroyed.
    pub fn take_gc_sets(&mut self) -> (GcSet, GcObjectSet) {
        (
            std::mem::take(&mut self.gc_set),
            std::mem::take(&mut self.gc_object_set),
        )
    }

    // -----------------------------------------------------------------------
    // Deferred triggers
    // -----------------------------------------------------------------------

    /// Queue a trigger payload to fire at commit.
    ///
    /// The queue is allocated on first use.
    pub fn add_on_commit(&mut self, trigger: TriggerData) {
        self.on_commit_triggers
            .get_or_insert_with(TriggerSet::new)
            .push(trigger);
    }

    /// Whether any trigger payloads are queued.
    #[must_use]
    pub fn has_on_commit_triggers(&self) -> bool {
        self.on_commit_triggers
            .as_ref()
            .is_some_and(|set| !set.is_empty())
    }

    /// Fire every queued trigger in insertion order; no-op when none were
    /// ever queued. Does not drain the queue.
    pub fn fire_on_commit(&self) {
        if let Some(triggers) = &self.on_commit_triggers {
            tracing::debug!(
                txn_id = %self.txn_id,
                count = triggers.len(),
                "firing commit triggers"
            );
            triggers.fire_all();
        }
    }

    // -----------------------------------------------------------------------
    // Diagnostics
    // -----------------------------------------------------------------------

    /// One-line descriptor for operator logs. Content is diagnostic, not
    /// contractual.
    #[must_use]
    pub fn describe(&self) -> String {
        format!(
            "txn @{:p} id={} read_id={} commit_id={} result={}",
            self as *const Self, self.txn_id, self.read_id, self.commit_id, self.result
        )
    }
}
