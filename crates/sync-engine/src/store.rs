// crates/sync-engine/src/store.rs
//! Entity store: the single in-memory view of known vehicles

use carlot_core::{Vehicle, VehicleId};
use std::sync::Arc;
use tokio::sync::watch;

/// Immutable view of the store contents handed to observers
pub type Snapshot = Arc<[Vehicle]>;

/// Ordered id → vehicle mapping observed by the rendering layer
///
/// Invariant: no two vehicles share an id, and every stored vehicle has one.
/// Every mutation publishes a fresh [`Snapshot`] to subscribers.
pub struct EntityStore {
    vehicles: Vec<Vehicle>,
    observers: watch::Sender<Snapshot>,
}

impl EntityStore {
    /// Creates an empty store
    pub fn new() -> Self {
        let (observers, _) = watch::channel(Snapshot::from(Vec::new()));
        Self {
            vehicles: Vec::new(),
            observers,
        }
    }

    /// Subscribes to snapshots published after each mutation
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.observers.subscribe()
    }

    /// Returns the latest published snapshot
    pub fn snapshot(&self) -> Snapshot {
        self.observers.borrow().clone()
    }

    /// Returns the vehicles in display order
    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Looks up a vehicle by id
    pub fn get(&self, id: &VehicleId) -> Option<&Vehicle> {
        self.position(id).map(|index| &self.vehicles[index])
    }

    pub fn contains(&self, id: &VehicleId) -> bool {
        self.position(id).is_some()
    }

    /// Inserts at the front, or replaces in place when the id is known
    ///
    /// Returns true if the vehicle was newly inserted.
    pub fn upsert(&mut self, vehicle: Vehicle) -> bool {
        let inserted = self.put(vehicle, Placement::Front);
        self.notify();
        inserted
    }

    /// Merges a fetched page: unknown ids are appended, known ids replaced in place
    ///
    /// Returns the number of newly inserted vehicles.
    pub fn merge_page(&mut self, page: Vec<Vehicle>) -> usize {
        let mut inserted = 0;
        for vehicle in page {
            if self.put(vehicle, Placement::Back) {
                inserted += 1;
            }
        }
        self.notify();
        inserted
    }

    /// Resets the contents to the given ordered set
    ///
    /// Later duplicates replace earlier ones in place.
    pub fn replace_all(&mut self, vehicles: Vec<Vehicle>) {
        self.vehicles.clear();
        for vehicle in vehicles {
            self.put(vehicle, Placement::Back);
        }
        self.notify();
    }

    /// Swaps a placeholder for its confirmed record
    ///
    /// The confirmed record takes the placeholder's position. If the
    /// confirmed id is already present (e.g. a push message arrived first),
    /// that entry is replaced and the placeholder dropped.
    pub fn reconcile(&mut self, placeholder: &VehicleId, confirmed: Vehicle) {
        let Some(confirmed_id) = confirmed.id.clone() else {
            log::warn!("Ignoring reconciliation of {} with an id-less record", placeholder);
            return;
        };

        match (self.position(placeholder), self.position(&confirmed_id)) {
            (Some(index), None) => self.vehicles[index] = confirmed,
            (Some(index), Some(existing)) if index != existing => {
                self.vehicles[existing] = confirmed;
                self.vehicles.remove(index);
            }
            _ => {
                self.put(confirmed, Placement::Front);
            }
        }
        self.notify();
    }

    /// Removes a vehicle by id
    pub fn remove(&mut self, id: &VehicleId) -> Option<Vehicle> {
        let removed = self.position(id).map(|index| self.vehicles.remove(index));
        if removed.is_some() {
            self.notify();
        }
        removed
    }

    /// Keeps only vehicles matching the predicate, returning how many were dropped
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&Vehicle) -> bool,
    {
        let before = self.vehicles.len();
        self.vehicles.retain(|vehicle| keep(vehicle));
        let dropped = before - self.vehicles.len();
        if dropped > 0 {
            self.notify();
        }
        dropped
    }

    /// Discards everything
    pub fn clear(&mut self) {
        self.vehicles.clear();
        self.notify();
    }

    fn position(&self, id: &VehicleId) -> Option<usize> {
        self.vehicles
            .iter()
            .position(|vehicle| vehicle.id.as_ref() == Some(id))
    }

    fn put(&mut self, vehicle: Vehicle, placement: Placement) -> bool {
        let Some(id) = vehicle.id.as_ref() else {
            log::warn!("Ignoring vehicle without id ({} {})", vehicle.brand, vehicle.model);
            return false;
        };

        match self.position(id) {
            Some(index) => {
                self.vehicles[index] = vehicle;
                false
            }
            None => {
                match placement {
                    Placement::Front => self.vehicles.insert(0, vehicle),
                    Placement::Back => self.vehicles.push(vehicle),
                }
                true
            }
        }
    }

    fn notify(&self) {
        self.observers.send_replace(Snapshot::from(self.vehicles.clone()));
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
enum Placement {
    Front,
    Back,
}
