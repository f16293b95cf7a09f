// crates/sync-engine/src/lib.rs
//! Offline-first synchronization engine for the vehicle inventory
//!
//! This crate keeps a local view of a remote vehicle collection usable while
//! the device is disconnected:
//! - Entity store observed by the rendering layer
//! - Offline saves under temporary ids, replayed on reconnection
//! - Page-by-page loading of the remote collection
//! - Live merging of push messages
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use carlot_core::Vehicle;
//! use carlot_sync_engine::{MemoryRemote, SyncConfig, SyncCoordinator};
//!
//! # tokio_test::block_on(async {
//! let remote = MemoryRemote::new();
//! remote.authorize("token", "alice");
//!
//! let mut coordinator = SyncCoordinator::new(Arc::new(remote.clone()), SyncConfig::new("token"));
//!
//! // Disconnected: stored under a temporary id and queued
//! let draft = coordinator.save(Vehicle::new("BMW", "E90", 2006)).await.unwrap();
//! assert!(draft.has_temporary_id());
//!
//! // Reconnecting replays the queue
//! let report = coordinator.on_connectivity_changed(true).await.unwrap();
//! assert!(report.is_complete());
//! assert_eq!(remote.len_for("alice"), 1);
//! # });
//! ```

mod coordinator;
mod cursor;
mod error;
mod hub;
mod live;
mod memory;
mod queue;
pub mod session;
mod state;
mod store;
mod temp_id;

pub use coordinator::{FetchCancellation, FlushFailure, FlushReport, SyncConfig, SyncCoordinator};
pub use cursor::{PageCursor, PageRequest, PAGE_SIZE};
pub use error::{SyncError, SyncResult};
pub use hub::{PushHub, Subscription};
pub use live::{LiveOutcome, LiveUpdateAdapter};
pub use memory::MemoryRemote;
pub use queue::{MutationKind, PendingMutation, PendingQueue};
pub use session::SessionHandle;
pub use state::{Phase, SyncStatus, Transition};
pub use store::{EntityStore, Snapshot};
pub use temp_id::TempIdAllocator;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_exports_accessible() {
        let _: EntityStore = EntityStore::new();
        let _: PendingQueue = PendingQueue::new();
        let _: TempIdAllocator = TempIdAllocator::new();
        let _: SyncStatus = SyncStatus::default();
        let _: MemoryRemote = MemoryRemote::new();
        assert_eq!(PAGE_SIZE, 15);
    }
}
