//! Commit-deferred trigger queue.
//!
//! Write paths enqueue [`TriggerData`] payloads on the owning transaction;
//! the commit path fires them in insertion order. The queue is allocated
//! lazily because the vast majority of transactions never arm a trigger.
//!
//! Firing does not drain the queue. The transaction manager destroys the
//! context right after commit resolution, so a fired queue is never
//! observed again.

use granite_types::TupleSlot;

// ---------------------------------------------------------------------------
// TriggerEvent / TriggerData
// ---------------------------------------------------------------------------

/// Row event that armed the trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TriggerEvent {
    AfterInsert,
    AfterUpdate,
    AfterDelete,
}

/// One queued trigger payload.
///
/// The hook is a plain function pointer rather than a boxed closure; the
/// trigger evaluator owns all interpretation, the core only carries the
/// payload to the commit point and calls back.
#[derive(Debug, Clone)]
pub struct TriggerData {
    name: String,
    event: TriggerEvent,
    slot: TupleSlot,
    hook: fn(&TriggerData),
}

impl TriggerData {
    /// Package a payload for deferral.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        event: TriggerEvent,
        slot: TupleSlot,
        hook: fn(&TriggerData),
    ) -> Self {
        Self {
            name: name.into(),
            event,
            slot,
            hook,
        }
    }

    /// Name of the trigger as declared in the catalog.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The row event that armed this payload.
    #[must_use]
    pub fn event(&self) -> TriggerEvent {
        self.event
    }

    /// The row the event happened on.
    #[must_use]
    pub fn slot(&self) -> TupleSlot {
        self.slot
    }

    /// Invoke the execution hook.
    pub fn fire(&self) {
        (self.hook)(self);
    }
}

// ---------------------------------------------------------------------------
// TriggerSet
// ---------------------------------------------------------------------------

/// Ordered queue of commit-deferred triggers.
#[derive(Debug, Default)]
pub struct TriggerSet {
    queued: Vec<TriggerData>,
}

impl TriggerSet {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a payload; it fires after everything queued before it.
    pub fn push(&mut self, trigger: TriggerData) {
        self.queued.push(trigger);
    }

    /// Number of payloads queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queued.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    /// Fire every payload in insertion order. Does not drain.
    pub fn fire_all(&self) {
        for trigger in &self.queued {
            trigger.fire();
        }
    }
}
