// crates/sync-engine/src/session.rs
//! Session driver: runs a coordinator on its own task
//!
//! The driver serializes every input (user intents, connectivity signals and
//! push messages) so the coordinator never sees two at once. Ending the
//! session stops the task and discards all in-memory state.

use crate::coordinator::{FetchCancellation, SyncCoordinator};
use crate::error::{SyncError, SyncResult};
use crate::state::SyncStatus;
use crate::store::Snapshot;
use carlot_core::{PushMessage, Vehicle};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

enum Command {
    Save {
        vehicle: Vehicle,
        reply: oneshot::Sender<SyncResult<Vehicle>>,
    },
    LoadMore {
        cancel: FetchCancellation,
        reply: oneshot::Sender<SyncResult<usize>>,
    },
    Refresh {
        reply: oneshot::Sender<SyncResult<usize>>,
    },
}

/// Handle to a running session
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    vehicles: watch::Receiver<Snapshot>,
    status: watch::Receiver<SyncStatus>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

/// Starts driving `coordinator`
///
/// `connectivity` carries the current reachability of the remote store and
/// `push` the decoded live updates. Either may close; the session keeps
/// serving intents until [`SessionHandle::end`] is called.
pub fn start(
    coordinator: SyncCoordinator,
    connectivity: watch::Receiver<bool>,
    push: mpsc::UnboundedReceiver<PushMessage>,
) -> SessionHandle {
    let (commands, command_rx) = mpsc::channel(32);
    let (shutdown, shutdown_rx) = oneshot::channel();
    let vehicles = coordinator.subscribe_vehicles();
    let status = coordinator.subscribe_status();

    let task = tokio::spawn(run(coordinator, connectivity, push, command_rx, shutdown_rx));

    SessionHandle {
        commands,
        vehicles,
        status,
        shutdown: Some(shutdown),
        task: Some(task),
    }
}

async fn run(
    mut coordinator: SyncCoordinator,
    mut connectivity: watch::Receiver<bool>,
    mut push: mpsc::UnboundedReceiver<PushMessage>,
    mut commands: mpsc::Receiver<Command>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let initially_connected = *connectivity.borrow_and_update();
    coordinator.on_connectivity_changed(initially_connected).await;
    if coordinator.is_connected() {
        if let Err(err) = coordinator.refresh().await {
            log::warn!("Initial load failed: {}", err);
        }
    }

    let mut connectivity_open = true;
    let mut push_open = true;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                log::debug!("Session shutdown requested");
                break;
            }
            changed = connectivity.changed(), if connectivity_open => {
                match changed {
                    Ok(()) => {
                        let connected = *connectivity.borrow_and_update();
                        if let Some(report) = coordinator.on_connectivity_changed(connected).await {
                            if !report.is_complete() {
                                log::warn!("{} vehicle(s) still pending after flush", report.failed.len());
                            }
                        }
                    }
                    Err(_) => {
                        log::debug!("Connectivity source closed");
                        connectivity_open = false;
                    }
                }
            }
            message = push.recv(), if push_open => {
                match message {
                    Some(message) => {
                        coordinator.on_push(message);
                    }
                    None => {
                        log::debug!("Push channel closed");
                        push_open = false;
                    }
                }
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    break;
                };
                handle(&mut coordinator, command).await;
            }
        }
    }

    coordinator.reset();
    log::info!("Session ended");
}

async fn handle(coordinator: &mut SyncCoordinator, command: Command) {
    // A dropped reply means the caller gave up waiting
    match command {
        Command::Save { vehicle, reply } => {
            let _ = reply.send(coordinator.save(vehicle).await);
        }
        Command::LoadMore { cancel, reply } => {
            let _ = reply.send(coordinator.load_more_with(&cancel).await);
        }
        Command::Refresh { reply } => {
            let _ = reply.send(coordinator.refresh().await);
        }
    }
}

impl SessionHandle {
    /// Saves a vehicle; see [`SyncCoordinator::save`]
    pub async fn save(&self, vehicle: Vehicle) -> SyncResult<Vehicle> {
        self.request(|reply| Command::Save { vehicle, reply }).await
    }

    /// Loads the next page; see [`SyncCoordinator::load_more`]
    pub async fn load_more(&self) -> SyncResult<usize> {
        self.load_more_cancellable(FetchCancellation::new()).await
    }

    /// Loads the next page, discarding it if `cancel` fires before it lands
    pub async fn load_more_cancellable(&self, cancel: FetchCancellation) -> SyncResult<usize> {
        self.request(|reply| Command::LoadMore { cancel, reply }).await
    }

    /// Reloads the first page
    pub async fn refresh(&self) -> SyncResult<usize> {
        self.request(|reply| Command::Refresh { reply }).await
    }

    /// Latest store snapshot
    pub fn vehicles(&self) -> Snapshot {
        self.vehicles.borrow().clone()
    }

    /// Latest status
    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_vehicles(&self) -> watch::Receiver<Snapshot> {
        self.vehicles.clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.clone()
    }

    /// Ends the session and waits for the driver to stop
    pub async fn end(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                log::error!("Session task failed: {}", err);
            }
        }
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<SyncResult<T>>) -> Command,
    ) -> SyncResult<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| SyncError::SessionClosed)?;
        response.await.map_err(|_| SyncError::SessionClosed)?
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}
