// crates/sync-engine/src/live.rs
//! Merges push-channel messages into the entity store

use crate::store::EntityStore;
use carlot_core::PushMessage;

/// What the adapter did with a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveOutcome {
    /// The payload was upserted
    Merged,
    /// The message kind is not merged (deletions)
    Ignored,
}

/// Applies push messages to the entity store
///
/// Messages are merged in arrival order; a later message for the same id
/// replaces the earlier one regardless of its content. The adapter never
/// touches the pending queue or the temporary id allocator.
#[derive(Debug, Default)]
pub struct LiveUpdateAdapter {
    merged: u64,
    ignored: u64,
}

impl LiveUpdateAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_message(&mut self, store: &mut EntityStore, message: PushMessage) -> LiveOutcome {
        match message {
            PushMessage::Created(vehicle) | PushMessage::Updated(vehicle) => {
                log::debug!(
                    "Merging pushed vehicle {}",
                    vehicle.id.as_ref().map(|id| id.to_string()).unwrap_or_default()
                );
                store.upsert(vehicle);
                self.merged += 1;
                LiveOutcome::Merged
            }
            // Deletions are not propagated to the store.
            PushMessage::Deleted { id } => {
                log::debug!("Ignoring pushed deletion of {}", id);
                self.ignored += 1;
                LiveOutcome::Ignored
            }
        }
    }

    /// Number of messages merged so far
    pub fn merged_count(&self) -> u64 {
        self.merged
    }

    /// Number of messages ignored so far
    pub fn ignored_count(&self) -> u64 {
        self.ignored
    }
}
