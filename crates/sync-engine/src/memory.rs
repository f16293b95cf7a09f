// crates/sync-engine/src/memory.rs
//! In-process remote store
//!
//! Keeps one collection per owner, assigns server ids on create and
//! broadcasts `created`/`updated` messages through a [`PushHub`]. Used by
//! tests, demos and the CLI's offline mode.

use crate::hub::PushHub;
use async_trait::async_trait;
use carlot_core::{GatewayError, GatewayResult, PushMessage, RemoteGateway, Vehicle, VehicleId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct Collections {
    /// token -> owner
    sessions: HashMap<String, String>,
    /// owner -> vehicles in insertion order
    vehicles: HashMap<String, Vec<Vehicle>>,
}

/// Remote store living in memory
#[derive(Clone)]
pub struct MemoryRemote {
    inner: Arc<Mutex<Collections>>,
    hub: Arc<PushHub>,
    offline: Arc<AtomicBool>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::with_hub(Arc::new(PushHub::new()))
    }

    pub fn with_hub(hub: Arc<PushHub>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Collections::default())),
            hub,
            offline: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn hub(&self) -> &Arc<PushHub> {
        &self.hub
    }

    /// Grants `token` access to `owner`'s collection
    pub fn authorize(&self, token: impl Into<String>, owner: impl Into<String>) {
        self.lock().sessions.insert(token.into(), owner.into());
    }

    pub fn revoke(&self, token: &str) {
        self.lock().sessions.remove(token);
    }

    /// Makes every call fail with a transport error while set
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Inserts records directly, assigning ids to id-less ones
    pub fn seed(&self, owner: &str, vehicles: impl IntoIterator<Item = Vehicle>) {
        let mut inner = self.lock();
        let collection = inner.vehicles.entry(owner.to_string()).or_default();
        for mut vehicle in vehicles {
            if vehicle.id.is_none() {
                vehicle.id = Some(new_id());
            }
            collection.push(vehicle);
        }
    }

    /// Number of records stored for `owner`
    pub fn len_for(&self, owner: &str) -> usize {
        self.lock().vehicles.get(owner).map_or(0, Vec::len)
    }

    /// Copy of `owner`'s collection
    pub fn vehicles_for(&self, owner: &str) -> Vec<Vehicle> {
        self.lock().vehicles.get(owner).cloned().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, Collections> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn owner_of(&self, token: &str) -> GatewayResult<String> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("remote store unreachable".to_string()));
        }
        self.lock()
            .sessions
            .get(token)
            .cloned()
            .ok_or(GatewayError::Unauthorized)
    }

    fn insert(&self, owner: &str, vehicle: &Vehicle) -> Vehicle {
        let mut stored = vehicle.clone();
        stored.id = Some(new_id());
        self.lock()
            .vehicles
            .entry(owner.to_string())
            .or_default()
            .push(stored.clone());

        self.hub.broadcast(owner, &PushMessage::Created(stored.clone()));
        stored
    }
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

fn new_id() -> VehicleId {
    VehicleId::server(Uuid::new_v4().simple().to_string())
}

#[async_trait]
impl RemoteGateway for MemoryRemote {
    async fn list(&self, token: &str, offset: usize, page_size: usize) -> GatewayResult<Vec<Vehicle>> {
        let owner = self.owner_of(token)?;
        let inner = self.lock();
        let page = inner
            .vehicles
            .get(&owner)
            .map(|vehicles| vehicles.iter().skip(offset).take(page_size).cloned().collect())
            .unwrap_or_default();
        Ok(page)
    }

    async fn create(&self, token: &str, vehicle: &Vehicle) -> GatewayResult<Vehicle> {
        let owner = self.owner_of(token)?;
        Ok(self.insert(&owner, vehicle))
    }

    async fn update(&self, token: &str, id: &str, vehicle: &Vehicle) -> GatewayResult<Vehicle> {
        let owner = self.owner_of(token)?;

        let body_id = match vehicle.id.as_ref() {
            None => return Ok(self.insert(&owner, vehicle)),
            Some(body_id) => body_id,
        };
        if body_id.as_server() != Some(id) {
            return Err(GatewayError::rejected(400, "Param id and body id should be the same"));
        }

        let updated = {
            let mut inner = self.lock();
            let slot = inner
                .vehicles
                .get_mut(&owner)
                .and_then(|vehicles| vehicles.iter_mut().find(|stored| stored.id.as_ref() == Some(body_id)));
            match slot {
                Some(stored) => {
                    *stored = vehicle.clone();
                    stored.clone()
                }
                None => return Err(GatewayError::rejected(405, "Resource no longer exists")),
            }
        };

        self.hub.broadcast(&owner, &PushMessage::Updated(updated.clone()));
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote() -> MemoryRemote {
        let remote = MemoryRemote::new();
        remote.authorize("token-a", "alice");
        remote.authorize("token-b", "bob");
        remote
    }

    #[tokio::test]
    async fn test_create_assigns_server_id_and_broadcasts() {
        let remote = remote();
        let mut subscription = remote.hub().subscribe("alice");

        let created = remote
            .create("token-a", &Vehicle::new("BMW", "E90", 2006))
            .await
            .unwrap();

        assert!(matches!(created.id, Some(VehicleId::Server(_))));
        assert_eq!(subscription.recv().await, Some(PushMessage::Created(created)));
        assert_eq!(remote.len_for("alice"), 1);
        assert_eq!(remote.len_for("bob"), 0);
    }

    #[tokio::test]
    async fn test_list_pages_per_owner() {
        let remote = remote();
        remote.seed("alice", (0..20).map(|i| Vehicle::new("BMW", format!("m{}", i), 2000)));
        remote.seed("bob", vec![Vehicle::new("Audi", "A4", 2008)]);

        let first = remote.list("token-a", 0, 15).await.unwrap();
        let second = remote.list("token-a", 15, 15).await.unwrap();

        assert_eq!(first.len(), 15);
        assert_eq!(second.len(), 5);
        assert_eq!(second[0].model, "m15");
        assert_eq!(remote.list("token-b", 0, 15).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_token_is_unauthorized() {
        let remote = remote();
        remote.revoke("token-a");
        assert_eq!(
            remote.list("token-a", 0, 15).await,
            Err(GatewayError::Unauthorized)
        );
    }

    #[tokio::test]
    async fn test_update_rules() {
        let remote = remote();
        let created = remote
            .create("token-a", &Vehicle::new("BMW", "E90", 2006))
            .await
            .unwrap();
        let id = created.id.clone().unwrap().to_string();

        let mut edited = created.clone();
        edited.year = 2009;
        assert_eq!(remote.update("token-a", &id, &edited).await.unwrap().year, 2009);

        let mismatch = remote.update("token-a", "other", &edited).await;
        assert!(matches!(mismatch, Err(GatewayError::Rejected { status: 400, .. })));

        let gone = edited.clone().with_id(VehicleId::server("gone"));
        let missing = remote.update("token-a", "gone", &gone).await;
        assert!(matches!(missing, Err(GatewayError::Rejected { status: 405, .. })));

        // No body id: stored as a new record
        let fresh = remote
            .update("token-a", "ignored", &Vehicle::new("Opel", "Astra", 2010))
            .await
            .unwrap();
        assert!(fresh.id.is_some());
        assert_eq!(remote.len_for("alice"), 2);
    }

    #[tokio::test]
    async fn test_offline_fails_with_transport_error() {
        let remote = remote();
        remote.set_offline(true);
        let result = remote.create("token-a", &Vehicle::new("BMW", "E90", 2006)).await;
        assert!(result.unwrap_err().is_transport());
    }
}
