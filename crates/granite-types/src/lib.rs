//! Foundation types for the granite engine.
//!
//! This crate defines the cross-cutting identifier types referenced by the
//! concurrency-control layer: tuple-slot pointers, catalog object ids, the
//! transaction timestamp trio, isolation levels, and result status codes.
//! Everything here is a plain value; behavior lives in the crates that
//! consume these types.

use std::fmt;

use thiserror::Error;

// ---------------------------------------------------------------------------
// TupleSlot
// ---------------------------------------------------------------------------

/// Physical location of one tuple version: block id plus slot offset.
///
/// Handed out by the storage layer. The transaction core never dereferences
/// a slot; it only uses it as a value-equatable, hashable map key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct TupleSlot {
    block: u32,
    offset: u32,
}

impl TupleSlot {
    /// Sentinel for "no location". Never produced by the storage layer.
    pub const INVALID: Self = Self {
        block: u32::MAX,
        offset: u32::MAX,
    };

    /// Create a slot pointer from a block id and an offset within the block.
    #[inline]
    #[must_use]
    pub const fn new(block: u32, offset: u32) -> Self {
        Self { block, offset }
    }

    /// Block id of the slot.
    #[inline]
    #[must_use]
    pub const fn block(self) -> u32 {
        self.block
    }

    /// Offset of the slot within its block.
    #[inline]
    #[must_use]
    pub const fn offset(self) -> u32 {
        self.offset
    }

    /// Whether this is a real location rather than [`TupleSlot::INVALID`].
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.block != u32::MAX || self.offset != u32::MAX
    }
}

impl fmt::Display for TupleSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.block, self.offset)
    }
}

// ---------------------------------------------------------------------------
// Catalog object ids
// ---------------------------------------------------------------------------

/// Database object id assigned by the catalog.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct DatabaseOid(u32);

impl DatabaseOid {
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DatabaseOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "db#{}", self.0)
    }
}

/// Table object id assigned by the catalog.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct TableOid(u32);

impl TableOid {
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TableOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table#{}", self.0)
    }
}

/// Index object id assigned by the catalog.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct IndexOid(u32);

impl IndexOid {
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for IndexOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "index#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CommitId / TxnId
// ---------------------------------------------------------------------------

/// A commit-clock timestamp.
///
/// The same 64-bit clock supplies both the snapshot timestamp handed out at
/// transaction begin (the read id) and the serialization timestamp assigned
/// at commit phase. [`CommitId::INVALID`] (`u64::MAX`) is the reserved "not
/// yet assigned" sentinel; the transaction manager never allocates it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct CommitId(u64);

impl CommitId {
    /// The "not yet assigned" sentinel.
    pub const INVALID: Self = Self(u64::MAX);

    /// Largest raw value a legitimate id may carry.
    pub const MAX_VALID: u64 = u64::MAX - 1;

    /// Construct a `CommitId` if `raw` is not the reserved sentinel.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Option<Self> {
        if raw > Self::MAX_VALID {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Get the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Whether this id has been assigned, i.e. is not the sentinel.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 <= Self::MAX_VALID
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "cid#{}", self.0)
        } else {
            f.write_str("cid#unassigned")
        }
    }
}

impl TryFrom<u64> for CommitId {
    type Error = InvalidCommitId;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidCommitId { raw: value })
    }
}

/// Error returned when a raw value collides with the commit-id sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("raw value {raw:#x} is the reserved commit-id sentinel")]
pub struct InvalidCommitId {
    raw: u64,
}

/// The identity other transactions use to recognize this one.
///
/// Mirrors the commit id: unassigned until the commit phase installs a
/// serialization timestamp, then equal to it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct TxnId(u64);

impl TxnId {
    /// Identity of a transaction whose commit id is still unassigned.
    pub const INVALID: Self = Self(u64::MAX);

    /// Get the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Whether this id mirrors an assigned commit id.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != u64::MAX
    }
}

impl From<CommitId> for TxnId {
    fn from(cid: CommitId) -> Self {
        Self(cid.get())
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "txn#{}", self.0)
        } else {
            f.write_str("txn#unassigned")
        }
    }
}

// ---------------------------------------------------------------------------
// EpochId
// ---------------------------------------------------------------------------

/// Coarse time bucket used by the garbage collector.
///
/// Derived from the high 32 bits of the snapshot timestamp, so all
/// transactions that began in the same epoch share one value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct EpochId(u64);

impl EpochId {
    /// Derive the epoch from a snapshot timestamp.
    #[inline]
    #[must_use]
    pub const fn from_read_id(read_id: CommitId) -> Self {
        Self(read_id.get() >> 32)
    }

    /// Get the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EpochId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "epoch#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// IsolationLevel / ResultStatus
// ---------------------------------------------------------------------------

/// Isolation level a transaction runs under.
///
/// The tracking core records the level verbatim; enforcement happens in the
/// protocol implementations above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum IsolationLevel {
    Serializable,
    Snapshot,
    RepeatableReads,
    ReadCommitted,
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serializable => f.write_str("SERIALIZABLE"),
            Self::Snapshot => f.write_str("SNAPSHOT"),
            Self::RepeatableReads => f.write_str("REPEATABLE_READS"),
            Self::ReadCommitted => f.write_str("READ_COMMITTED"),
        }
    }
}

/// Outcome of a transaction, set by the transaction manager at resolution.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ResultStatus {
    /// Still on the commit path (the initial value) or committed.
    #[default]
    Success,
    /// Commit validation failed.
    Failure,
    /// Externally aborted.
    Aborted,
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("SUCCESS"),
            Self::Failure => f.write_str("FAILURE"),
            Self::Aborted => f.write_str("ABORTED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tuple_slot_value_semantics() {
        let a = TupleSlot::new(7, 3);
        let b = TupleSlot::new(7, 3);
        assert_eq!(a, b);
        assert_eq!(a.block(), 7);
        assert_eq!(a.offset(), 3);
        assert_eq!(a.to_string(), "(7, 3)");
    }

    #[test]
    fn test_tuple_slot_invalid_sentinel() {
        assert!(!TupleSlot::INVALID.is_valid());
        assert!(TupleSlot::new(0, 0).is_valid());
        // A real block with a maxed offset is still a valid location.
        assert!(TupleSlot::new(1, u32::MAX).is_valid());
    }

    #[test]
    fn test_commit_id_rejects_sentinel() {
        assert_eq!(CommitId::new(u64::MAX), None);
        assert!(CommitId::try_from(u64::MAX).is_err());
        let cid = CommitId::new(CommitId::MAX_VALID).expect("largest legitimate id");
        assert!(cid.is_valid());
    }

    #[test]
    fn test_commit_id_display() {
        let cid = CommitId::new(42).unwrap();
        assert_eq!(cid.to_string(), "cid#42");
        assert_eq!(CommitId::INVALID.to_string(), "cid#unassigned");
    }

    #[test]
    fn test_txn_id_mirrors_commit_id() {
        let cid = CommitId::new(99).unwrap();
        let txn = TxnId::from(cid);
        assert_eq!(txn.get(), 99);
        assert!(txn.is_valid());
        assert!(!TxnId::from(CommitId::INVALID).is_valid());
    }

    #[test]
    fn test_epoch_id_is_high_half_of_read_id() {
        let read_id = CommitId::new(0x0000_00A5_0000_0001).unwrap();
        assert_eq!(EpochId::from_read_id(read_id).get(), 0xA5);

        let low_only = CommitId::new(0xFFFF_FFFF).unwrap();
        assert_eq!(EpochId::from_read_id(low_only).get(), 0);
    }

    #[test]
    fn test_result_status_display_and_default() {
        assert_eq!(ResultStatus::default(), ResultStatus::Success);
        assert_eq!(ResultStatus::Aborted.to_string(), "ABORTED");
        assert_eq!(IsolationLevel::Snapshot.to_string(), "SNAPSHOT");
    }
}
