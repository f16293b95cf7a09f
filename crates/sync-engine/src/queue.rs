// crates/sync-engine/src/queue.rs
//! Pending-mutation queue for changes made while offline

use carlot_core::{Vehicle, VehicleId};
use chrono::{DateTime, Utc};

/// What replaying a queued record against the remote store means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// The record has no server id yet
    Create,
    /// The record already exists remotely
    Update,
}

/// A record waiting to be replayed against the remote store
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMutation {
    pub vehicle: Vehicle,
    pub queued_at: DateTime<Utc>,
}

impl PendingMutation {
    pub fn new(vehicle: Vehicle) -> Self {
        Self {
            vehicle,
            queued_at: Utc::now(),
        }
    }

    /// Create for placeholder ids, update for server ids
    pub fn kind(&self) -> MutationKind {
        match self.vehicle.id {
            Some(VehicleId::Server(_)) => MutationKind::Update,
            Some(VehicleId::Temporary(_)) | None => MutationKind::Create,
        }
    }

    pub fn id(&self) -> Option<&VehicleId> {
        self.vehicle.id.as_ref()
    }
}

/// Unsynced records in the order they were first queued
///
/// Queuing an id that is already pending replaces the earlier entry in place,
/// so each id is replayed once with its latest content.
#[derive(Debug, Default)]
pub struct PendingQueue {
    entries: Vec<PendingMutation>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a record, replacing a pending entry with the same id
    pub fn enqueue(&mut self, vehicle: Vehicle) {
        let mutation = PendingMutation::new(vehicle);
        match self.position(mutation.id()) {
            Some(index) => self.entries[index] = mutation,
            None => self.entries.push(mutation),
        }
    }

    /// Puts back an entry that failed to replay, keeping its original timestamp
    pub fn requeue(&mut self, mutation: PendingMutation) {
        match self.position(mutation.id()) {
            Some(index) => self.entries[index] = mutation,
            None => self.entries.push(mutation),
        }
    }

    /// Removes and returns every entry, oldest first
    pub fn drain(&mut self) -> Vec<PendingMutation> {
        std::mem::take(&mut self.entries)
    }

    /// Drops the entry for the given id
    pub fn remove(&mut self, id: &VehicleId) -> Option<PendingMutation> {
        self.position(Some(id)).map(|index| self.entries.remove(index))
    }

    pub fn contains(&self, id: &VehicleId) -> bool {
        self.position(Some(id)).is_some()
    }

    pub fn entries(&self) -> &[PendingMutation] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn position(&self, id: Option<&VehicleId>) -> Option<usize> {
        id.and_then(|id| self.entries.iter().position(|entry| entry.id() == Some(id)))
    }
}
