//! Correlation registry
//!
//! Process-wide keyed storage correlating inbound dispatch calls to
//! suspended pipeline runs. Two maps live side by side:
//!
//! - *edit slots*: the orchestrator parks here waiting for a
//!   human-edited prompt; a dispatch call resolves the slot.
//! - *event slots*: a dispatch call parks here waiting for the next
//!   workflow event; the orchestrator resolves the slot when it
//!   reaches its next suspension point or terminates.
//!
//! Each slot is a `oneshot` channel: single resolution, single
//! consumer. The registry is an injected struct, never a global;
//! handlers and the orchestrator share it through `Arc`.

use crate::pipeline::types::{PipelineEvent, PipelineId, Stage};
use crate::pipeline::PipelineError;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::oneshot;

/// Outcome delivered to a waiting dispatch call: the next event, or
/// the error message of a failed run
pub type EventOutcome = Result<PipelineEvent, String>;

struct EditSlot {
    tx: oneshot::Sender<String>,
    stage: Stage,
}

struct EventSlot {
    tx: oneshot::Sender<EventOutcome>,
    stage: Stage,
}

/// Registry of pending slots, keyed by pipeline id
///
/// At most one unresolved slot of each kind exists per id. Creating a
/// slot for an id replaces any previous one; the replaced sender is
/// dropped, which wakes its receiver with a recv error instead of
/// leaking it.
#[derive(Default)]
pub struct PipelineRegistry {
    edits: Mutex<HashMap<PipelineId, EditSlot>>,
    events: Mutex<HashMap<PipelineId, EventSlot>>,
}

impl PipelineRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an edit slot for `id`, expecting a human edit at `stage`
    ///
    /// Returns the receiver the orchestrator awaits on. Replaces any
    /// previous edit slot for the same id.
    pub fn create_edit_slot(&self, id: &PipelineId, stage: Stage) -> oneshot::Receiver<String> {
        let (tx, rx) = oneshot::channel();
        let mut edits = self.edits.lock().expect("edit slot map poisoned");
        if edits.insert(id.clone(), EditSlot { tx, stage }).is_some() {
            tracing::warn!(pipeline_id = %id, "Replaced an unresolved edit slot");
        }
        rx
    }

    /// Resolve the edit slot for `id` with the edited text
    ///
    /// The caller claims the stage it satisfies; a slot waiting at a
    /// different stage is a protocol error and the slot is left
    /// untouched.
    pub fn resolve_edit(
        &self,
        id: &PipelineId,
        claimed: Stage,
        text: String,
    ) -> Result<(), PipelineError> {
        let mut edits = self.edits.lock().expect("edit slot map poisoned");
        let expected = match edits.get(id) {
            Some(slot) => slot.stage,
            None => return Err(PipelineError::NoPendingEdit(id.clone())),
        };
        if expected != claimed {
            return Err(PipelineError::StageMismatch {
                id: id.clone(),
                expected,
                claimed,
            });
        }
        let slot = edits.remove(id).ok_or_else(|| PipelineError::NoPendingEdit(id.clone()))?;
        slot.tx
            .send(text)
            .map_err(|_| PipelineError::EditAbandoned(id.clone()))
    }

    /// Create an event slot for `id`
    ///
    /// Returns the receiver the dispatch call awaits on. `stage`
    /// records the stage the caller believes the pipeline is at.
    /// Replaces any previous event slot for the same id.
    pub fn create_event_slot(
        &self,
        id: &PipelineId,
        stage: Stage,
    ) -> oneshot::Receiver<EventOutcome> {
        let (tx, rx) = oneshot::channel();
        let mut events = self.events.lock().expect("event slot map poisoned");
        if events.insert(id.clone(), EventSlot { tx, stage }).is_some() {
            tracing::warn!(pipeline_id = %id, "Replaced an unresolved event slot");
        }
        rx
    }

    /// Remove the event slot for `id` without resolving it
    ///
    /// Used to back out when a dispatch call fails after creating its
    /// slot. Returns true if a slot existed.
    pub fn remove_event_slot(&self, id: &PipelineId) -> bool {
        let mut events = self.events.lock().expect("event slot map poisoned");
        events.remove(id).is_some()
    }

    /// Deliver `event` to whatever dispatch call is waiting on its id
    ///
    /// A stage difference between the slot and the event is logged as
    /// a protocol warning but the event is still delivered: the
    /// reported stage routinely names the *next* stage as a hint, not
    /// the stage the waiter registered at.
    pub fn deliver_event(&self, event: PipelineEvent) -> Result<(), PipelineError> {
        let mut events = self.events.lock().expect("event slot map poisoned");
        let slot = events
            .remove(&event.id)
            .ok_or_else(|| PipelineError::NoEventWaiter(event.id.clone()))?;
        if slot.stage != event.stage {
            tracing::warn!(
                pipeline_id = %event.id,
                slot_stage = %slot.stage,
                event_stage = %event.stage,
                "Event stage differs from the waiting slot's stage"
            );
        }
        let id = event.id.clone();
        slot.tx
            .send(Ok(event))
            .map_err(|_| PipelineError::EventNotDelivered(id))
    }

    /// Fail the pending event slot for `id` with an error message
    ///
    /// Called when the orchestrator run dies, so the dispatch call
    /// waiting on it surfaces the failure instead of hanging. Returns
    /// true if a waiter was failed.
    pub fn fail_event(&self, id: &PipelineId, error: String) -> bool {
        let mut events = self.events.lock().expect("event slot map poisoned");
        match events.remove(id) {
            Some(slot) => slot.tx.send(Err(error)).is_ok(),
            None => false,
        }
    }

    /// Stage the pending edit slot for `id` expects, if one exists
    pub fn pending_edit_stage(&self, id: &PipelineId) -> Option<Stage> {
        let edits = self.edits.lock().expect("edit slot map poisoned");
        edits.get(id).map(|slot| slot.stage)
    }
}
