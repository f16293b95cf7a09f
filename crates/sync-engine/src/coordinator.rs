// crates/sync-engine/src/coordinator.rs
//! Synchronization coordinator

use crate::cursor::{PageCursor, PAGE_SIZE};
use crate::error::{SyncError, SyncResult};
use crate::live::{LiveOutcome, LiveUpdateAdapter};
use crate::queue::PendingQueue;
use crate::state::{SyncStatus, Transition};
use crate::store::{EntityStore, Snapshot};
use crate::temp_id::TempIdAllocator;
use carlot_core::{GatewayError, GatewayResult, PushMessage, RemoteGateway, Vehicle, VehicleId};
use chrono::Utc;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Configuration for the coordinator
#[derive(Clone, Default)]
pub struct SyncConfig {
    /// Session credential passed to every remote call
    pub token: Option<String>,
    /// Connectivity at start-up
    pub connected: bool,
}

impl SyncConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            connected: false,
        }
    }

    pub fn connected(mut self, connected: bool) -> Self {
        self.connected = connected;
        self
    }
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("connected", &self.connected)
            .finish()
    }
}

/// Cooperative cancellation flag for an in-flight fetch
///
/// Canceling does not abort the remote call; its response is discarded
/// when it arrives.
#[derive(Debug, Clone, Default)]
pub struct FetchCancellation(Arc<AtomicBool>);

impl FetchCancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A queued record that could not be replayed
#[derive(Debug, Clone, PartialEq)]
pub struct FlushFailure {
    pub vehicle: Vehicle,
    pub error: GatewayError,
}

/// Outcome of one flush pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlushReport {
    /// Server-confirmed records, in replay order
    pub synced: Vec<Vehicle>,
    /// Records left in the queue for the next reconnection
    pub failed: Vec<FlushFailure>,
    /// Placeholders removed from the store after the pass
    pub stale_removed: usize,
    /// True when the pass was not attempted (no credential)
    pub skipped: bool,
}

impl FlushReport {
    /// Returns true if every queued record was confirmed
    pub fn is_complete(&self) -> bool {
        !self.skipped && self.failed.is_empty()
    }
}

/// Owns the entity store and drives every transition into it
///
/// All methods take `&mut self`: intents, connectivity changes and push
/// messages are applied one at a time, so temporary id allocation and store
/// mutations never interleave.
pub struct SyncCoordinator {
    gateway: Arc<dyn RemoteGateway>,
    token: Option<String>,
    connected: bool,
    store: EntityStore,
    queue: PendingQueue,
    allocator: TempIdAllocator,
    cursor: PageCursor,
    live: LiveUpdateAdapter,
    status: SyncStatus,
    status_tx: watch::Sender<SyncStatus>,
}

impl SyncCoordinator {
    /// Creates a coordinator with an empty store
    pub fn new(gateway: Arc<dyn RemoteGateway>, config: SyncConfig) -> Self {
        let mut status = SyncStatus::new();
        status.connected = config.connected;
        let (status_tx, _) = watch::channel(status.clone());

        Self {
            gateway,
            token: config.token,
            connected: config.connected,
            store: EntityStore::new(),
            queue: PendingQueue::new(),
            allocator: TempIdAllocator::new(),
            cursor: PageCursor::new(),
            live: LiveUpdateAdapter::new(),
            status,
            status_tx,
        }
    }

    /// Saves a vehicle
    ///
    /// Connected: the remote store is called and its answer is stored.
    /// Disconnected: the vehicle gets a temporary id if it has none, is stored
    /// and queued for the next reconnection.
    pub async fn save(&mut self, vehicle: Vehicle) -> SyncResult<Vehicle> {
        if !self.connected {
            return Ok(self.save_offline(vehicle));
        }

        let token = self.token.clone().ok_or(SyncError::AuthorizationMissing)?;
        self.transition(Transition::SaveStarted);

        let placeholder = vehicle.id.clone().filter(VehicleId::is_temporary);
        match self.push_to_remote(&token, &vehicle).await {
            Ok(saved) => {
                match placeholder {
                    Some(placeholder) => {
                        self.queue.remove(&placeholder);
                        self.store.reconcile(&placeholder, saved.clone());
                    }
                    None => {
                        if let Some(id) = vehicle.id.as_ref() {
                            self.queue.remove(id);
                        }
                        self.store.upsert(saved.clone());
                    }
                }
                log::debug!("Saved vehicle {}", describe(&saved));
                self.transition(Transition::SaveSucceeded);
                self.publish_pending();
                Ok(saved)
            }
            Err(err) => {
                log::warn!("Failed to save vehicle: {}", err);
                let err = SyncError::Save(err);
                self.transition(Transition::SaveFailed(err.clone()));
                self.transition(Transition::Settled);
                Err(err)
            }
        }
    }

    fn save_offline(&mut self, mut vehicle: Vehicle) -> Vehicle {
        self.transition(Transition::SaveStarted);

        if vehicle.id.is_none() {
            vehicle.id = Some(self.allocator.next());
        }
        log::debug!("Queued offline save of {}", describe(&vehicle));

        self.store.upsert(vehicle.clone());
        self.queue.enqueue(vehicle.clone());

        self.transition(Transition::SaveSucceeded);
        self.publish_pending();
        vehicle
    }

    /// Loads the next page of the remote collection
    ///
    /// Returns the number of records the remote store returned. Returns 0
    /// without a remote call once the collection is exhausted or while
    /// disconnected.
    pub async fn load_more(&mut self) -> SyncResult<usize> {
        self.load_more_with(&FetchCancellation::new()).await
    }

    /// Like [`load_more`](Self::load_more), discarding the response if
    /// `cancel` was triggered while the call was in flight
    pub async fn load_more_with(&mut self, cancel: &FetchCancellation) -> SyncResult<usize> {
        if self.cursor.is_exhausted() {
            return Ok(0);
        }
        if !self.connected {
            log::debug!("Skipping fetch while disconnected");
            return Ok(0);
        }
        let token = self.token.clone().ok_or(SyncError::AuthorizationMissing)?;

        let request = self.cursor.request_more();
        self.transition(Transition::FetchStarted);
        let result = self.gateway.list(&token, request.from, request.size).await;

        if cancel.is_canceled() {
            log::debug!("Discarding response of canceled fetch at offset {}", request.from);
            self.transition(Transition::FetchCanceled);
            return Err(SyncError::Canceled);
        }

        match result {
            Ok(page) => {
                let returned = page.len();
                self.store.merge_page(page);
                self.cursor.advance(returned);
                log::debug!(
                    "Fetched {} vehicles at offset {} (exhausted: {})",
                    returned,
                    request.from,
                    self.cursor.is_exhausted()
                );
                self.transition(Transition::FetchSucceeded {
                    exhausted: self.cursor.is_exhausted(),
                });
                Ok(returned)
            }
            Err(err) => Err(self.fetch_failed(err)),
        }
    }

    /// Reloads the first page, replacing the store contents
    ///
    /// Records still waiting in the pending queue are kept at the front.
    pub async fn refresh(&mut self) -> SyncResult<usize> {
        if !self.connected {
            return Ok(0);
        }
        let token = self.token.clone().ok_or(SyncError::AuthorizationMissing)?;

        self.transition(Transition::FetchStarted);
        match self.gateway.list(&token, 0, PAGE_SIZE).await {
            Ok(page) => {
                let returned = page.len();
                self.store.replace_all(page);
                for entry in self.queue.entries().iter().rev() {
                    self.store.upsert(entry.vehicle.clone());
                }
                self.cursor.reset();
                self.cursor.advance(returned);
                log::info!("Loaded {} vehicles", returned);
                self.transition(Transition::FetchSucceeded {
                    exhausted: self.cursor.is_exhausted(),
                });
                Ok(returned)
            }
            Err(err) => Err(self.fetch_failed(err)),
        }
    }

    fn fetch_failed(&mut self, err: GatewayError) -> SyncError {
        log::warn!("Failed to fetch vehicles: {}", err);
        let err = SyncError::Fetch(err);
        self.transition(Transition::FetchFailed(err.clone()));
        self.transition(Transition::Settled);
        err
    }

    /// Reacts to a connectivity signal
    ///
    /// Only transitions matter. Regaining connectivity with a non-empty queue
    /// flushes it; losing connectivity changes nothing but the flag.
    pub async fn on_connectivity_changed(&mut self, connected: bool) -> Option<FlushReport> {
        if connected == self.connected {
            return None;
        }

        self.connected = connected;
        self.transition(Transition::ConnectivityChanged(connected));
        log::info!("Connectivity {}", if connected { "regained" } else { "lost" });

        if connected && !self.queue.is_empty() {
            Some(self.flush().await)
        } else {
            None
        }
    }

    /// Replays every queued record against the remote store, one at a time
    ///
    /// Placeholders are created (their temporary id stripped), server ids are
    /// updated. Failed records stay queued for the next reconnection. Once
    /// the pass is over, placeholders that are no longer queued are dropped
    /// from the store, and the allocator restarts if the queue is empty.
    pub async fn flush(&mut self) -> FlushReport {
        if self.queue.is_empty() {
            return FlushReport::default();
        }
        let Some(token) = self.token.clone() else {
            log::warn!(
                "Cannot flush {} pending vehicle(s) without a session credential",
                self.queue.len()
            );
            return FlushReport {
                skipped: true,
                ..FlushReport::default()
            };
        };

        self.transition(Transition::FlushStarted);
        log::info!("Flushing {} pending vehicle(s)", self.queue.len());

        let mut report = FlushReport::default();
        for mutation in self.queue.drain() {
            log::debug!("Replaying {:?} of {}", mutation.kind(), describe(&mutation.vehicle));
            match self.push_to_remote(&token, &mutation.vehicle).await {
                Ok(saved) => {
                    match mutation.id() {
                        Some(placeholder) if placeholder.is_temporary() => {
                            self.store.reconcile(placeholder, saved.clone());
                        }
                        _ => {
                            self.store.upsert(saved.clone());
                        }
                    }
                    report.synced.push(saved);
                }
                Err(err) => {
                    log::warn!(
                        "Failed to sync {}, keeping it queued: {}",
                        describe(&mutation.vehicle),
                        err
                    );
                    report.failed.push(FlushFailure {
                        vehicle: mutation.vehicle.clone(),
                        error: err,
                    });
                    self.queue.requeue(mutation);
                }
            }
        }

        let queue = &self.queue;
        report.stale_removed = self.store.retain(|vehicle| match vehicle.id.as_ref() {
            Some(id) if id.is_temporary() => queue.contains(id),
            _ => true,
        });

        if self.queue.is_empty() {
            self.allocator.reset();
        }

        log::info!(
            "Flush finished: {} synced, {} failed, {} stale placeholder(s) removed",
            report.synced.len(),
            report.failed.len(),
            report.stale_removed
        );
        self.transition(Transition::FlushFinished { at: Utc::now() });
        self.publish_pending();
        report
    }

    /// Merges a push message into the store
    pub fn on_push(&mut self, message: PushMessage) -> LiveOutcome {
        self.live.on_message(&mut self.store, message)
    }

    /// Replaces the session credential
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// Discards all in-memory state (session end)
    pub fn reset(&mut self) {
        self.store.clear();
        self.queue.clear();
        self.allocator.reset();
        self.cursor.reset();
        self.token = None;
        self.status = SyncStatus {
            connected: self.connected,
            ..SyncStatus::default()
        };
        self.status_tx.send_replace(self.status.clone());
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn queue(&self) -> &PendingQueue {
        &self.queue
    }

    pub fn cursor(&self) -> &PageCursor {
        &self.cursor
    }

    pub fn status(&self) -> &SyncStatus {
        &self.status
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Counter value the next temporary id will carry
    pub fn next_temporary_counter(&self) -> u64 {
        self.allocator.peek()
    }

    pub fn live_updates(&self) -> &LiveUpdateAdapter {
        &self.live
    }

    /// Subscribes to store snapshots
    pub fn subscribe_vehicles(&self) -> watch::Receiver<Snapshot> {
        self.store.subscribe()
    }

    /// Subscribes to status changes
    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status_tx.subscribe()
    }

    /// Create for id-less and placeholder records, update for server ids
    async fn push_to_remote(&self, token: &str, vehicle: &Vehicle) -> GatewayResult<Vehicle> {
        match vehicle.id.as_ref() {
            Some(VehicleId::Server(id)) => self.gateway.update(token, id, vehicle).await,
            Some(VehicleId::Temporary(_)) | None => {
                let mut body = vehicle.clone();
                body.id = None;
                self.gateway.create(token, &body).await
            }
        }
    }

    fn publish_pending(&mut self) {
        self.transition(Transition::PendingChanged(self.queue.len()));
    }

    fn transition(&mut self, transition: Transition) {
        log::trace!("Sync transition: {:?}", transition);
        self.status.apply(transition);
        self.status_tx.send_replace(self.status.clone());
    }
}

fn describe(vehicle: &Vehicle) -> String {
    match &vehicle.id {
        Some(id) => format!("{} {} ({})", vehicle.brand, vehicle.model, id),
        None => format!("{} {}", vehicle.brand, vehicle.model),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Phase;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Gateway answering from a script, recording every call
    #[derive(Default)]
    struct ScriptedGateway {
        pages: Mutex<VecDeque<GatewayResult<Vec<Vehicle>>>>,
        saves: Mutex<VecDeque<GatewayResult<Vehicle>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedGateway {
        fn with_pages(self, pages: Vec<GatewayResult<Vec<Vehicle>>>) -> Self {
            *self.pages.lock().unwrap() = pages.into();
            self
        }

        fn with_saves(self, saves: Vec<GatewayResult<Vehicle>>) -> Self {
            *self.saves.lock().unwrap() = saves.into();
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RemoteGateway for ScriptedGateway {
        async fn list(&self, _token: &str, offset: usize, size: usize) -> GatewayResult<Vec<Vehicle>> {
            self.calls.lock().unwrap().push(format!("list {} {}", offset, size));
            self.pages.lock().unwrap().pop_front().unwrap_or(Ok(Vec::new()))
        }

        async fn create(&self, _token: &str, vehicle: &Vehicle) -> GatewayResult<Vehicle> {
            assert!(vehicle.id.is_none(), "create must not carry an id");
            self.calls.lock().unwrap().push(format!("create {}", vehicle.brand));
            self.saves.lock().unwrap().pop_front().unwrap_or(Err(GatewayError::Unauthorized))
        }

        async fn update(&self, _token: &str, id: &str, _vehicle: &Vehicle) -> GatewayResult<Vehicle> {
            self.calls.lock().unwrap().push(format!("update {}", id));
            self.saves.lock().unwrap().pop_front().unwrap_or(Err(GatewayError::Unauthorized))
        }
    }

    fn server(id: &str, brand: &str) -> Vehicle {
        Vehicle::new(brand, "model", 2006).with_id(VehicleId::server(id))
    }

    fn page(start: usize, len: usize) -> Vec<Vehicle> {
        (start..start + len)
            .map(|i| server(&format!("v{}", i), "BMW"))
            .collect()
    }

    fn coordinator(gateway: &Arc<ScriptedGateway>, connected: bool) -> SyncCoordinator {
        let gateway: Arc<dyn RemoteGateway> = gateway.clone();
        SyncCoordinator::new(gateway, SyncConfig::new("token").connected(connected))
    }

    #[test]
    fn test_config_debug_redacts_token() {
        let debug = format!("{:?}", SyncConfig::new("secret"));
        assert!(!debug.contains("secret"));
    }

    #[tokio::test]
    async fn test_offline_save_assigns_temporary_id() {
        let gateway = Arc::new(ScriptedGateway::default());
        let mut coordinator = coordinator(&gateway, false);

        let saved = coordinator.save(Vehicle::new("BMW", "E90", 2006)).await.unwrap();

        assert_eq!(saved.id, Some(VehicleId::temporary(0)));
        assert_eq!(coordinator.store().len(), 1);
        assert_eq!(coordinator.queue().len(), 1);
        assert_eq!(coordinator.status().pending, 1);
        assert_eq!(coordinator.next_temporary_counter(), 1);
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_offline_update_does_not_allocate() {
        let gateway = Arc::new(ScriptedGateway::default());
        let mut coordinator = coordinator(&gateway, false);

        coordinator.save(server("abc", "Audi")).await.unwrap();
        let created = coordinator.save(Vehicle::new("BMW", "E90", 2006)).await.unwrap();
        let mut edited = created.clone();
        edited.year = 2008;
        coordinator.save(edited).await.unwrap();

        assert_eq!(coordinator.next_temporary_counter(), 1);
        assert_eq!(coordinator.queue().len(), 2);
        assert_eq!(coordinator.store().len(), 2);
        assert_eq!(
            coordinator.store().get(&VehicleId::temporary(0)).unwrap().year,
            2008
        );
    }

    #[tokio::test]
    async fn test_connected_save_creates_remotely() {
        let gateway = Arc::new(
            ScriptedGateway::default().with_saves(vec![Ok(server("abc123", "BMW"))]),
        );
        let mut coordinator = coordinator(&gateway, true);

        let saved = coordinator.save(Vehicle::new("BMW", "E90", 2006)).await.unwrap();

        assert_eq!(saved.id, Some(VehicleId::server("abc123")));
        assert_eq!(gateway.calls(), vec!["create BMW"]);
        assert!(coordinator.queue().is_empty());
        assert_eq!(coordinator.status().phase, Phase::Idle);
    }

    #[tokio::test]
    async fn test_connected_save_failure_leaves_state_untouched() {
        let gateway = Arc::new(ScriptedGateway::default().with_saves(vec![Err(
            GatewayError::rejected(400, "bad"),
        )]));
        let mut coordinator = coordinator(&gateway, true);

        let result = coordinator.save(Vehicle::new("BMW", "E90", 2006)).await;

        assert!(matches!(result, Err(SyncError::Save(_))));
        assert!(coordinator.store().is_empty());
        assert!(coordinator.queue().is_empty());
        assert!(coordinator.status().saving_error.is_some());
        assert!(!coordinator.status().saving);
        assert_eq!(coordinator.status().phase, Phase::Idle);
    }

    #[tokio::test]
    async fn test_connected_save_without_token() {
        let gateway = Arc::new(ScriptedGateway::default());
        let gateway_dyn: Arc<dyn RemoteGateway> = gateway.clone();
        let mut coordinator =
            SyncCoordinator::new(gateway_dyn, SyncConfig::default().connected(true));

        let result = coordinator.save(Vehicle::new("BMW", "E90", 2006)).await;
        assert_eq!(result, Err(SyncError::AuthorizationMissing));
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_connected_save_of_placeholder_reconciles() {
        let gateway = Arc::new(
            ScriptedGateway::default().with_saves(vec![Err(GatewayError::Transport("x".into()))]),
        );
        let mut coordinator = coordinator(&gateway, false);
        let placeholder = coordinator.save(Vehicle::new("BMW", "E90", 2006)).await.unwrap();

        // Reconnect: the flush fails, the placeholder stays queued
        let report = coordinator.on_connectivity_changed(true).await.unwrap();
        assert_eq!(report.failed.len(), 1);

        *gateway.saves.lock().unwrap() = vec![Ok(server("abc123", "BMW"))].into();
        coordinator.save(placeholder).await.unwrap();

        assert!(coordinator.queue().is_empty());
        assert_eq!(coordinator.store().len(), 1);
        assert!(coordinator.store().contains(&VehicleId::server("abc123")));
    }

    #[tokio::test]
    async fn test_load_more_pages_until_short_page() {
        let gateway = Arc::new(ScriptedGateway::default().with_pages(vec![
            Ok(page(0, 15)),
            Ok(page(15, 4)),
        ]));
        let mut coordinator = coordinator(&gateway, true);

        assert_eq!(coordinator.load_more().await.unwrap(), 15);
        assert!(!coordinator.cursor().is_exhausted());
        assert_eq!(coordinator.load_more().await.unwrap(), 4);
        assert!(coordinator.cursor().is_exhausted());
        assert!(coordinator.status().exhausted);
        assert_eq!(coordinator.load_more().await.unwrap(), 0);

        assert_eq!(gateway.calls(), vec!["list 0 15", "list 15 15"]);
        assert_eq!(coordinator.store().len(), 19);
        // Pages keep their remote order
        assert_eq!(
            coordinator.store().vehicles()[0].id,
            Some(VehicleId::server("v0"))
        );
    }

    #[tokio::test]
    async fn test_load_more_failure_keeps_cursor() {
        let gateway = Arc::new(ScriptedGateway::default().with_pages(vec![
            Err(GatewayError::Transport("down".into())),
            Ok(page(0, 2)),
        ]));
        let mut coordinator = coordinator(&gateway, true);

        assert!(matches!(coordinator.load_more().await, Err(SyncError::Fetch(_))));
        assert_eq!(coordinator.cursor().loaded(), 0);
        assert!(coordinator.status().fetching_error.is_some());

        assert_eq!(coordinator.load_more().await.unwrap(), 2);
        assert!(coordinator.status().fetching_error.is_none());
    }

    #[tokio::test]
    async fn test_load_more_offline_is_noop() {
        let gateway = Arc::new(ScriptedGateway::default());
        let mut coordinator = coordinator(&gateway, false);

        assert_eq!(coordinator.load_more().await.unwrap(), 0);
        assert!(gateway.calls().is_empty());
        assert!(!coordinator.cursor().is_exhausted());
    }

    #[tokio::test]
    async fn test_canceled_fetch_is_discarded() {
        let gateway = Arc::new(ScriptedGateway::default().with_pages(vec![Ok(page(0, 15))]));
        let mut coordinator = coordinator(&gateway, true);
        let cancel = FetchCancellation::new();
        cancel.cancel();

        let result = coordinator.load_more_with(&cancel).await;

        assert_eq!(result, Err(SyncError::Canceled));
        assert!(coordinator.store().is_empty());
        assert_eq!(coordinator.cursor().loaded(), 0);
        assert!(!coordinator.status().fetching);
    }

    #[tokio::test]
    async fn test_flush_replays_in_order() {
        let gateway = Arc::new(ScriptedGateway::default().with_saves(vec![
            Ok(server("s1", "BMW")),
            Ok(server("abc", "Audi")),
            Ok(server("s2", "Opel")),
        ]));
        let mut coordinator = coordinator(&gateway, false);
        coordinator.save(Vehicle::new("BMW", "E90", 2006)).await.unwrap();
        coordinator.save(server("abc", "Audi")).await.unwrap();
        coordinator.save(Vehicle::new("Opel", "Astra", 2010)).await.unwrap();

        let report = coordinator.on_connectivity_changed(true).await.unwrap();

        assert!(report.is_complete());
        assert_eq!(gateway.calls(), vec!["create BMW", "update abc", "create Opel"]);
        assert!(coordinator.queue().is_empty());
        assert!(coordinator
            .store()
            .vehicles()
            .iter()
            .all(|vehicle| !vehicle.has_temporary_id()));
        assert_eq!(coordinator.store().len(), 3);
        assert_eq!(coordinator.next_temporary_counter(), 0);
        assert!(coordinator.status().last_flush.is_some());
    }

    #[tokio::test]
    async fn test_flush_failure_stays_queued() {
        let gateway = Arc::new(ScriptedGateway::default().with_saves(vec![
            Ok(server("s1", "BMW")),
            Err(GatewayError::Transport("reset".into())),
        ]));
        let mut coordinator = coordinator(&gateway, false);
        coordinator.save(Vehicle::new("BMW", "E90", 2006)).await.unwrap();
        coordinator.save(Vehicle::new("Audi", "A4", 2008)).await.unwrap();

        let report = coordinator.on_connectivity_changed(true).await.unwrap();

        assert_eq!(report.synced.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert!(!report.is_complete());
        assert_eq!(coordinator.queue().len(), 1);
        assert!(coordinator.store().contains(&VehicleId::temporary(1)));
        // Placeholder still live, so the counter keeps going
        assert_eq!(coordinator.next_temporary_counter(), 2);
    }

    #[tokio::test]
    async fn test_connectivity_loss_keeps_queue() {
        let gateway = Arc::new(ScriptedGateway::default());
        let mut coordinator = coordinator(&gateway, true);

        assert!(coordinator.on_connectivity_changed(false).await.is_none());
        coordinator.save(Vehicle::new("BMW", "E90", 2006)).await.unwrap();
        assert!(coordinator.on_connectivity_changed(false).await.is_none());

        assert_eq!(coordinator.queue().len(), 1);
        assert!(!coordinator.status().connected);
    }

    #[tokio::test]
    async fn test_flush_without_token_is_skipped() {
        let gateway = Arc::new(ScriptedGateway::default());
        let gateway_dyn: Arc<dyn RemoteGateway> = gateway.clone();
        let mut coordinator = SyncCoordinator::new(gateway_dyn, SyncConfig::default());
        coordinator.save(Vehicle::new("BMW", "E90", 2006)).await.unwrap();

        let report = coordinator.on_connectivity_changed(true).await.unwrap();

        assert!(report.skipped);
        assert_eq!(coordinator.queue().len(), 1);
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_keeps_pending_records() {
        let gateway = Arc::new(ScriptedGateway::default().with_pages(vec![Ok(page(0, 3))]));
        let mut coordinator = coordinator(&gateway, false);
        coordinator.save(Vehicle::new("Opel", "Astra", 2010)).await.unwrap();
        coordinator.connected = true;

        assert_eq!(coordinator.refresh().await.unwrap(), 3);
        assert_eq!(coordinator.store().len(), 4);
        assert_eq!(
            coordinator.store().vehicles()[0].id,
            Some(VehicleId::temporary(0))
        );
        assert!(coordinator.cursor().is_exhausted());
    }

    #[tokio::test]
    async fn test_connected_save_drops_queued_update() {
        let mut confirmed = server("s1", "BMW");
        confirmed.year = 2020;
        let gateway = Arc::new(ScriptedGateway::default().with_saves(vec![
            Err(GatewayError::Transport("reset".into())),
            Ok(confirmed.clone()),
        ]));
        let mut coordinator = coordinator(&gateway, false);
        let mut edit = server("s1", "BMW");
        edit.year = 2010;
        coordinator.save(edit).await.unwrap();

        let report = coordinator.on_connectivity_changed(true).await.unwrap();
        assert_eq!(report.failed.len(), 1);
        assert_eq!(coordinator.queue().len(), 1);

        coordinator.save(confirmed).await.unwrap();

        assert!(coordinator.queue().is_empty());
        assert_eq!(coordinator.status().pending, 0);
        assert_eq!(coordinator.store().get(&VehicleId::server("s1")).unwrap().year, 2020);

        coordinator.on_connectivity_changed(false).await;
        assert!(coordinator.on_connectivity_changed(true).await.is_none());
        assert_eq!(gateway.calls(), vec!["update s1", "update s1"]);
    }

    #[tokio::test]
    async fn test_refresh_keeps_queue_order_on_top() {
        let gateway = Arc::new(ScriptedGateway::default().with_pages(vec![Ok(page(0, 2))]));
        let mut coordinator = coordinator(&gateway, false);
        coordinator.save(Vehicle::new("Opel", "Astra", 2010)).await.unwrap();
        coordinator.save(Vehicle::new("Seat", "Leon", 2012)).await.unwrap();
        coordinator.connected = true;

        coordinator.refresh().await.unwrap();

        let ids: Vec<_> = coordinator
            .store()
            .vehicles()
            .iter()
            .map(|vehicle| vehicle.id.clone())
            .collect();
        assert_eq!(
            ids,
            vec![
                Some(VehicleId::temporary(0)),
                Some(VehicleId::temporary(1)),
                Some(VehicleId::server("v0")),
                Some(VehicleId::server("v1")),
            ]
        );
    }

    #[tokio::test]
    async fn test_reset_discards_everything() {
        let gateway = Arc::new(ScriptedGateway::default());
        let mut coordinator = coordinator(&gateway, false);
        coordinator.save(Vehicle::new("BMW", "E90", 2006)).await.unwrap();

        coordinator.reset();

        assert!(coordinator.store().is_empty());
        assert!(coordinator.queue().is_empty());
        assert_eq!(coordinator.next_temporary_counter(), 0);
        assert_eq!(coordinator.status().pending, 0);
    }
}
