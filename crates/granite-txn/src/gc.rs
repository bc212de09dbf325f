//! Deferred reclamation bookkeeping.
//!
//! The executor appends here whenever a tuple version or a catalog object
//! becomes garbage; the sets ride along with the transaction so that commit
//! and abort hand cleanup to the collector atomically with the state that
//! produced it. On abort the same sets drive rollback cleanup. The
//! transaction core itself never populates them during recording.

use std::collections::HashMap;
use std::collections::hash_map;

use granite_types::{DatabaseOid, IndexOid, TableOid, TupleSlot};
use smallvec::SmallVec;

// ---------------------------------------------------------------------------
// GcVersionKind
// ---------------------------------------------------------------------------

/// Why a tuple version is scheduled for reclamation.
///
/// `Commit*` kinds reclaim versions superseded by a committed transaction;
/// `Abort*` kinds undo versions the transaction itself created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum GcVersionKind {
    /// Old version superseded by a committed update.
    CommitUpdate,
    /// Version tombstoned by a committed delete.
    CommitDelete,
    /// Version both inserted and deleted by the committing transaction.
    CommitInsDel,
    /// New version discarded by an aborted update.
    AbortUpdate,
    /// Tombstone discarded by an aborted delete.
    AbortDelete,
    /// Version created by an aborted insert.
    AbortInsert,
    /// Version both inserted and deleted by the aborting transaction.
    AbortInsDel,
    /// Version whose index entries must be purged before the slot is reused.
    TombstoneIndexPurge,
}

// ---------------------------------------------------------------------------
// GcSet
// ---------------------------------------------------------------------------

/// Tuple versions scheduled for reclamation, grouped by owning table.
///
/// Last write wins per slot: re-adding a slot under the same table replaces
/// its reclamation kind.
#[derive(Debug, Default)]
pub struct GcSet {
    tables: HashMap<TableOid, HashMap<TupleSlot, GcVersionKind>>,
}

impl GcSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule the version at `slot` in `table` for reclamation.
    pub fn insert(&mut self, table: TableOid, slot: TupleSlot, kind: GcVersionKind) {
        self.tables.entry(table).or_default().insert(slot, kind);
    }

    /// Versions scheduled for one table, if any.
    #[must_use]
    pub fn table(&self, table: TableOid) -> Option<&HashMap<TupleSlot, GcVersionKind>> {
        self.tables.get(&table)
    }

    /// Whether nothing is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.values().all(HashMap::is_empty)
    }

    /// Total number of versions scheduled across all tables.
    #[must_use]
    pub fn version_count(&self) -> usize {
        self.tables.values().map(HashMap::len).sum()
    }

    /// Iterate per-table in unspecified order.
    pub fn iter(&self) -> hash_map::Iter<'_, TableOid, HashMap<TupleSlot, GcVersionKind>> {
        self.tables.iter()
    }
}

impl<'a> IntoIterator for &'a GcSet {
    type Item = (&'a TableOid, &'a HashMap<TupleSlot, GcVersionKind>);
    type IntoIter = hash_map::Iter<'a, TableOid, HashMap<TupleSlot, GcVersionKind>>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.iter()
    }
}

// ---------------------------------------------------------------------------
// GcObjectSet
// ---------------------------------------------------------------------------

/// A catalog object scheduled for physical drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct GcObject {
    pub database: DatabaseOid,
    pub table: TableOid,
    pub index: IndexOid,
}

impl GcObject {
    #[must_use]
    pub const fn new(database: DatabaseOid, table: TableOid, index: IndexOid) -> Self {
        Self {
            database,
            table,
            index,
        }
    }
}

/// Catalog objects queued for drop at commit/abort resolution.
///
/// Kept in insertion order; dropping a table and then one of its indexes is
/// replayed by the collector in that order. Most transactions drop nothing,
/// a DDL batch drops a handful, so the backing store is inline up to four
/// entries.
#[derive(Debug, Default)]
pub struct GcObjectSet {
    objects: SmallVec<[GcObject; 4]>,
}

impl GcObjectSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `object` for drop.
    pub fn push(&mut self, object: GcObject) {
        self.objects.push(object);
    }

    /// Number of objects queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, GcObject> {
        self.objects.iter()
    }
}

impl<'a> IntoIterator for &'a GcObjectSet {
    type Item = &'a GcObject;
    type IntoIter = std::slice::Iter<'a, GcObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(offset: u32) -> TupleSlot {
        TupleSlot::new(3, offset)
    }

    #[test]
    fn test_gc_set_groups_by_table() {
        let orders = TableOid::new(10);
        let lines = TableOid::new(11);

        let mut set = GcSet::new();
        set.insert(orders, slot(0), GcVersionKind::CommitUpdate);
        set.insert(orders, slot(1), GcVersionKind::CommitDelete);
        set.insert(lines, slot(0), GcVersionKind::AbortInsert);

        assert_eq!(set.version_count(), 3);
        assert_eq!(set.table(orders).map(HashMap::len), Some(2));
        assert_eq!(
            set.table(lines).and_then(|m| m.get(&slot(0))).copied(),
            Some(GcVersionKind::AbortInsert)
        );
        assert!(set.table(TableOid::new(99)).is_none());
    }

    #[test]
    fn test_gc_set_last_write_wins_per_slot() {
        let table = TableOid::new(10);
        let mut set = GcSet::new();
        set.insert(table, slot(0), GcVersionKind::CommitUpdate);
        set.insert(table, slot(0), GcVersionKind::TombstoneIndexPurge);

        assert_eq!(set.version_count(), 1);
        assert_eq!(
            set.table(table).and_then(|m| m.get(&slot(0))).copied(),
            Some(GcVersionKind::TombstoneIndexPurge)
        );
    }

    #[test]
    fn test_gc_set_empty() {
        let set = GcSet::new();
        assert!(set.is_empty());
        assert_eq!(set.version_count(), 0);
        assert_eq!(set.iter().count(), 0);
    }

    #[test]
    fn test_gc_object_set_preserves_insertion_order() {
        let mut set = GcObjectSet::new();
        let drop_a = GcObject::new(DatabaseOid::new(1), TableOid::new(10), IndexOid::new(100));
        let drop_b = GcObject::new(DatabaseOid::new(1), TableOid::new(10), IndexOid::new(101));
        let drop_c = GcObject::new(DatabaseOid::new(1), TableOid::new(11), IndexOid::new(102));

        set.push(drop_a);
        set.push(drop_b);
        set.push(drop_c);

        let order: Vec<GcObject> = set.iter().copied().collect();
        assert_eq!(order, vec![drop_a, drop_b, drop_c]);
        assert_eq!(set.len(), 3);
        assert!(!set.is_empty());
    }
}
