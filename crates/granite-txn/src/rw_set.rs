//! Per-tuple access classification and the legal transition lattice.
//!
//! A transaction keeps exactly one [`AccessKind`] entry per tuple slot it has
//! touched. The recording operations move an entry along a fixed lattice:
//! reads may upgrade to owned reads and then to writes, an insert may only
//! land on a fresh slot, and `Delete` / `InsertDelete` are terminal. An
//! attempt to record anything on a terminally classified slot is an executor
//! protocol violation and panics; silently ignoring it would let a
//! tombstoned tuple be observed again inside the same transaction.

use std::collections::HashMap;
use std::collections::hash_map;

use granite_types::TupleSlot;

// ---------------------------------------------------------------------------
// AccessKind
// ---------------------------------------------------------------------------

/// What this transaction has done so far to one tuple slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum AccessKind {
    /// Value observed; no intent to modify.
    Read,
    /// Value observed and locked for a prospective write.
    ReadOwn,
    /// An existing version was replaced by a new one.
    Update,
    /// A version was created that did not exist before this transaction.
    Insert,
    /// An existing version was tombstoned.
    Delete,
    /// Inserted and deleted within this transaction; never visible outside it.
    InsertDelete,
}

impl AccessKind {
    /// Whether this classification modifies the database.
    #[inline]
    #[must_use]
    pub const fn is_write_class(self) -> bool {
        matches!(
            self,
            Self::Update | Self::Insert | Self::Delete | Self::InsertDelete
        )
    }

    /// Terminal classifications admit no further recording on their slot.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delete | Self::InsertDelete)
    }
}

// ---------------------------------------------------------------------------
// RwSet
// ---------------------------------------------------------------------------

/// The transaction's footprint: at most one [`AccessKind`] per slot.
///
/// Alongside the map it maintains two derived facts the commit path needs
/// without a scan: the number of entries currently classified `Insert`, and
/// a latch that trips the first time an already-read slot is promoted to a
/// write classification. The latch never clears.
#[derive(Debug, Default)]
pub struct RwSet {
    entries: HashMap<TupleSlot, AccessKind>,
    insert_count: usize,
    wrote_after_read: bool,
}

/// Executor protocol violation: a recording operation reached a slot in a
/// terminal classification (or re-inserted into an occupied slot).
#[cold]
#[inline(never)]
fn illegal_transition(op: &str, slot: TupleSlot, current: AccessKind) -> ! {
    panic!("illegal {op} on slot {slot}: already {current:?} in this transaction");
}

impl RwSet {
    /// Create an empty footprint.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current classification for `slot`, if this transaction has touched it.
    #[inline]
    #[must_use]
    pub fn classification(&self, slot: TupleSlot) -> Option<AccessKind> {
        self.entries.get(&slot).copied()
    }

    /// Whether `slot` appears in the footprint at all.
    #[inline]
    #[must_use]
    pub fn contains(&self, slot: TupleSlot) -> bool {
        self.entries.contains_key(&slot)
    }

    /// Number of slots touched.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the transaction has touched nothing.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries currently classified exactly [`AccessKind::Insert`].
    #[inline]
    #[must_use]
    pub fn insert_count(&self) -> usize {
        self.insert_count
    }

    /// Whether a read-classified slot was later promoted to a write.
    #[inline]
    #[must_use]
    pub fn is_written(&self) -> bool {
        self.wrote_after_read
    }

    /// Iterate over the footprint in unspecified order.
    pub fn iter(&self) -> hash_map::Iter<'_, TupleSlot, AccessKind> {
        self.entries.iter()
    }

    /// Record that the transaction observed the value at `slot`.
    ///
    /// # Panics
    ///
    /// If `slot` is terminally classified.
    pub fn record_read(&mut self, slot: TupleSlot) {
        match self.classification(slot) {
            None => {
                self.entries.insert(slot, AccessKind::Read);
            }
            Some(
                AccessKind::Read | AccessKind::ReadOwn | AccessKind::Update | AccessKind::Insert,
            ) => {}
            Some(current) => illegal_transition("read", slot, current),
        }
    }

    /// Record that the transaction observed `slot` and holds it for a
    /// prospective write.
    ///
    /// # Panics
    ///
    /// If `slot` is terminally classified.
    pub fn record_read_own(&mut self, slot: TupleSlot) {
        match self.classification(slot) {
            None | Some(AccessKind::Read) => {
                self.entries.insert(slot, AccessKind::ReadOwn);
            }
            Some(AccessKind::ReadOwn | AccessKind::Update | AccessKind::Insert) => {}
            Some(current) => illegal_transition("read-own", slot, current),
        }
    }

    /// Record that the transaction replaced the version at `slot`.
    ///
    /// # Panics
    ///
    /// If `slot` is terminally classified.
    pub fn record_update(&mut self, slot: TupleSlot) {
        match self.classification(slot) {
            None => {
                self.entries.insert(slot, AccessKind::Update);
            }
            Some(AccessKind::Read | AccessKind::ReadOwn) => {
                self.entries.insert(slot, AccessKind::Update);
                self.wrote_after_read = true;
            }
            Some(AccessKind::Update | AccessKind::Insert) => {}
            Some(current) => illegal_transition("update", slot, current),
        }
    }

    /// Record that the transaction created a brand-new version at `slot`.
    ///
    /// Inserts are keyed by fresh slots allocated by the storage layer, so
    /// the only legal prior classification is none at all.
    ///
    /// # Panics
    ///
    /// If `slot` already appears in the footprint.
    pub fn record_insert(&mut self, slot: TupleSlot) {
        match self.classification(slot) {
            None => {
                self.entries.insert(slot, AccessKind::Insert);
                self.insert_count += 1;
            }
            Some(current) => illegal_transition("insert", slot, current),
        }
    }

    /// Record that the transaction tombstoned the version at `slot`.
    ///
    /// Returns `true` iff the slot held this transaction's own insert, which
    /// is thereby fully elided: the caller may reclaim the new version
    /// immediately instead of waiting for commit resolution.
    ///
    /// # Panics
    ///
    /// If `slot` is already terminally classified.
    pub fn record_delete(&mut self, slot: TupleSlot) -> bool {
        match self.classification(slot) {
            None | Some(AccessKind::Update) => {
                self.entries.insert(slot, AccessKind::Delete);
                false
            }
            Some(AccessKind::Read | AccessKind::ReadOwn) => {
                self.entries.insert(slot, AccessKind::Delete);
                self.wrote_after_read = true;
                false
            }
            Some(AccessKind::Insert) => {
                self.entries.insert(slot, AccessKind::InsertDelete);
                self.insert_count -= 1;
                true
            }
            Some(current) => illegal_transition("delete", slot, current),
        }
    }
}

impl<'a> IntoIterator for &'a RwSet {
    type Item = (&'a TupleSlot, &'a AccessKind);
    type IntoIter = hash_map::Iter<'a, TupleSlot, AccessKind>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: TupleSlot = TupleSlot::new(1, 0);
    const B: TupleSlot = TupleSlot::new(1, 1);

    /// Apply the recording operation named by `op` to `slot`.
    fn apply(set: &mut RwSet, op: &str, slot: TupleSlot) {
        match op {
            "read" => set.record_read(slot),
            "read_own" => set.record_read_own(slot),
            "update" => set.record_update(slot),
            "insert" => set.record_insert(slot),
            "delete" => {
                set.record_delete(slot);
            }
            other => panic!("unknown op {other}"),
        }
    }

    /// Drive a fresh footprint into the given classification via legal ops.
    fn seeded(kind: Option<AccessKind>) -> RwSet {
        let mut set = RwSet::new();
        match kind {
            None => {}
            Some(AccessKind::Read) => set.record_read(A),
            Some(AccessKind::ReadOwn) => set.record_read_own(A),
            Some(AccessKind::Update) => set.record_update(A),
            Some(AccessKind::Insert) => set.record_insert(A),
            Some(AccessKind::Delete) => {
                set.record_delete(A);
            }
            Some(AccessKind::InsertDelete) => {
                set.record_insert(A);
                set.record_delete(A);
            }
        }
        assert_eq!(set.classification(A), kind, "seeding failed");
        set
    }

    // -- Lattice completeness: every legal (current, op) cell --

    #[test]
    fn test_every_legal_transition_lands_where_the_lattice_says() {
        use AccessKind::{Insert, InsertDelete, Read, ReadOwn, Update};

        // (current, op, expected classification afterwards)
        let cells: &[(Option<AccessKind>, &str, AccessKind)] = &[
            (None, "read", Read),
            (None, "read_own", ReadOwn),
            (None, "update", Update),
            (None, "insert", Insert),
            (None, "delete", AccessKind::Delete),
            (Some(Read), "read", Read),
            (Some(Read), "read_own", ReadOwn),
            (Some(Read), "update", Update),
            (Some(Read), "delete", AccessKind::Delete),
            (Some(ReadOwn), "read", ReadOwn),
            (Some(ReadOwn), "read_own", ReadOwn),
            (Some(ReadOwn), "update", Update),
            (Some(ReadOwn), "delete", AccessKind::Delete),
            (Some(Update), "read", Update),
            (Some(Update), "read_own", Update),
            (Some(Update), "update", Update),
            (Some(Update), "delete", AccessKind::Delete),
            (Some(Insert), "read", Insert),
            (Some(Insert), "read_own", Insert),
            (Some(Insert), "update", Insert),
            (Some(Insert), "delete", InsertDelete),
        ];

        for &(current, op, expected) in cells {
            let mut set = seeded(current);
            apply(&mut set, op, A);
            assert_eq!(
                set.classification(A),
                Some(expected),
                "{current:?} --{op}--> expected {expected:?}"
            );
            assert_eq!(set.len(), 1, "footprint holds one entry per slot");
        }
    }

    #[test]
    fn test_insert_count_tracks_live_inserts_only() {
        let mut set = RwSet::new();
        set.record_insert(A);
        set.record_insert(B);
        assert_eq!(set.insert_count(), 2);

        set.record_delete(A);
        assert_eq!(set.insert_count(), 1, "elided insert leaves the count");
        assert_eq!(set.classification(A), Some(AccessKind::InsertDelete));

        let live = set
            .iter()
            .filter(|(_, kind)| **kind == AccessKind::Insert)
            .count();
        assert_eq!(set.insert_count(), live);
    }

    #[test]
    fn test_write_latch_trips_only_on_read_then_write() {
        // A blind update never latches: nothing was read first.
        let mut set = RwSet::new();
        set.record_update(A);
        assert!(!set.is_written());

        // Read then update latches.
        let mut set = RwSet::new();
        set.record_read(A);
        set.record_update(A);
        assert!(set.is_written());

        // Owned read then delete latches.
        let mut set = RwSet::new();
        set.record_read_own(A);
        set.record_delete(A);
        assert!(set.is_written());

        // Insert then delete is elision, not a write-after-read.
        let mut set = RwSet::new();
        set.record_insert(A);
        set.record_delete(A);
        assert!(!set.is_written());
    }

    #[test]
    fn test_write_latch_is_monotone() {
        let mut set = RwSet::new();
        set.record_read(A);
        set.record_update(A);
        assert!(set.is_written());

        // Subsequent reads and no-op re-records must not clear the latch.
        set.record_read(A);
        set.record_read(B);
        set.record_update(A);
        assert!(set.is_written());
    }

    #[test]
    fn test_delete_returns_true_only_for_elided_insert() {
        let mut set = RwSet::new();
        set.record_insert(A);
        assert!(set.record_delete(A), "insert -> delete elides the version");

        let mut set = RwSet::new();
        set.record_read(A);
        assert!(!set.record_delete(A));

        let mut set = RwSet::new();
        set.record_update(A);
        assert!(!set.record_delete(A));

        let mut set = RwSet::new();
        assert!(!set.record_delete(A), "blind delete of an existing version");
    }

    #[test]
    fn test_repeated_reads_are_idempotent() {
        let mut set = RwSet::new();
        set.record_read(A);
        set.record_read(A);
        set.record_read(A);
        assert_eq!(set.classification(A), Some(AccessKind::Read));
        assert_eq!(set.len(), 1);
        assert!(!set.is_written());
        assert_eq!(set.insert_count(), 0);
    }

    #[test]
    fn test_read_own_does_not_downgrade_a_write() {
        let mut set = RwSet::new();
        set.record_update(A);
        set.record_read_own(A);
        assert_eq!(set.classification(A), Some(AccessKind::Update));
    }

    #[test]
    fn test_classification_absent_for_untouched_slot() {
        let set = RwSet::new();
        assert_eq!(set.classification(A), None);
        assert!(!set.contains(A));
        assert!(set.is_empty());
    }

    // -- Terminal stickiness: every op panics on both terminal states --

    #[test]
    #[should_panic(expected = "illegal read")]
    fn test_read_after_delete_panics() {
        let mut set = seeded(Some(AccessKind::Delete));
        set.record_read(A);
    }

    #[test]
    #[should_panic(expected = "illegal read")]
    fn test_read_after_insert_delete_panics() {
        let mut set = seeded(Some(AccessKind::InsertDelete));
        set.record_read(A);
    }

    #[test]
    #[should_panic(expected = "illegal read-own")]
    fn test_read_own_after_delete_panics() {
        let mut set = seeded(Some(AccessKind::Delete));
        set.record_read_own(A);
    }

    #[test]
    #[should_panic(expected = "illegal read-own")]
    fn test_read_own_after_insert_delete_panics() {
        let mut set = seeded(Some(AccessKind::InsertDelete));
        set.record_read_own(A);
    }

    #[test]
    #[should_panic(expected = "illegal update")]
    fn test_update_after_delete_panics() {
        let mut set = seeded(Some(AccessKind::Delete));
        set.record_update(A);
    }

    #[test]
    #[should_panic(expected = "illegal update")]
    fn test_update_after_insert_delete_panics() {
        let mut set = seeded(Some(AccessKind::InsertDelete));
        set.record_update(A);
    }

    #[test]
    #[should_panic(expected = "illegal delete")]
    fn test_double_delete_panics() {
        let mut set = seeded(Some(AccessKind::Delete));
        set.record_delete(A);
    }

    #[test]
    #[should_panic(expected = "illegal delete")]
    fn test_delete_after_insert_delete_panics() {
        let mut set = seeded(Some(AccessKind::InsertDelete));
        set.record_delete(A);
    }

    // -- Insert requires a fresh slot --

    #[test]
    #[should_panic(expected = "illegal insert")]
    fn test_insert_over_read_panics() {
        let mut set = seeded(Some(AccessKind::Read));
        set.record_insert(A);
    }

    #[test]
    #[should_panic(expected = "illegal insert")]
    fn test_insert_over_read_own_panics() {
        let mut set = seeded(Some(AccessKind::ReadOwn));
        set.record_insert(A);
    }

    #[test]
    #[should_panic(expected = "illegal insert")]
    fn test_insert_over_update_panics() {
        let mut set = seeded(Some(AccessKind::Update));
        set.record_insert(A);
    }

    #[test]
    #[should_panic(expected = "illegal insert")]
    fn test_double_insert_panics() {
        let mut set = seeded(Some(AccessKind::Insert));
        set.record_insert(A);
    }

    #[test]
    #[should_panic(expected = "illegal insert")]
    fn test_insert_over_delete_panics() {
        let mut set = seeded(Some(AccessKind::Delete));
        set.record_insert(A);
    }

    #[test]
    #[should_panic(expected = "illegal insert")]
    fn test_insert_over_insert_delete_panics() {
        let mut set = seeded(Some(AccessKind::InsertDelete));
        set.record_insert(A);
    }

    // -- AccessKind helpers --

    #[test]
    fn test_write_class_and_terminal_partitions() {
        use AccessKind::*;

        for kind in [Read, ReadOwn] {
            assert!(!kind.is_write_class(), "{kind:?} is read-class");
            assert!(!kind.is_terminal());
        }
        for kind in [Update, Insert, Delete, InsertDelete] {
            assert!(kind.is_write_class(), "{kind:?} is write-class");
        }
        for kind in [Delete, InsertDelete] {
            assert!(kind.is_terminal(), "{kind:?} is terminal");
        }
        for kind in [Read, ReadOwn, Update, Insert] {
            assert!(!kind.is_terminal(), "{kind:?} admits further recording");
        }
    }
}
