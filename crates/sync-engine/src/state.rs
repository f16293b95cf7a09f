// crates/sync-engine/src/state.rs
//! Coordinator state machine and the status published to the rendering layer

use crate::error::SyncError;
use chrono::{DateTime, Utc};

/// What the coordinator is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Fetching,
    FetchFailed,
    Saving,
    SaveFailed,
    Flushing,
}

impl Phase {
    /// Returns true when no remote call is in flight
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Idle | Self::FetchFailed | Self::SaveFailed)
    }
}

/// A single state transition
///
/// Every change to [`SyncStatus`] goes through one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    FetchStarted,
    FetchSucceeded { exhausted: bool },
    FetchFailed(SyncError),
    FetchCanceled,
    SaveStarted,
    SaveSucceeded,
    SaveFailed(SyncError),
    FlushStarted,
    FlushFinished { at: DateTime<Utc> },
    /// Leaves a failure phase once the error has been surfaced
    Settled,
    ConnectivityChanged(bool),
    PendingChanged(usize),
}

/// Snapshot of coordinator status for the rendering layer
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SyncStatus {
    pub phase: Phase,
    pub fetching: bool,
    pub fetching_error: Option<SyncError>,
    pub saving: bool,
    pub saving_error: Option<SyncError>,
    pub connected: bool,
    /// Number of records waiting to be flushed
    pub pending: usize,
    /// Whether the remote collection has been fully loaded
    pub exhausted: bool,
    pub last_flush: Option<DateTime<Utc>>,
}

impl SyncStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a transition
    pub fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::FetchStarted => {
                self.phase = Phase::Fetching;
                self.fetching = true;
                self.fetching_error = None;
            }
            Transition::FetchSucceeded { exhausted } => {
                self.phase = Phase::Idle;
                self.fetching = false;
                self.exhausted = exhausted;
            }
            Transition::FetchFailed(error) => {
                self.phase = Phase::FetchFailed;
                self.fetching = false;
                self.fetching_error = Some(error);
            }
            Transition::FetchCanceled => {
                self.phase = Phase::Idle;
                self.fetching = false;
            }
            Transition::SaveStarted => {
                self.phase = Phase::Saving;
                self.saving = true;
                self.saving_error = None;
            }
            Transition::SaveSucceeded => {
                self.phase = Phase::Idle;
                self.saving = false;
            }
            Transition::SaveFailed(error) => {
                self.phase = Phase::SaveFailed;
                self.saving = false;
                self.saving_error = Some(error);
            }
            Transition::FlushStarted => {
                self.phase = Phase::Flushing;
            }
            Transition::FlushFinished { at } => {
                self.phase = Phase::Idle;
                self.last_flush = Some(at);
            }
            Transition::Settled => {
                if matches!(self.phase, Phase::FetchFailed | Phase::SaveFailed) {
                    self.phase = Phase::Idle;
                }
            }
            Transition::ConnectivityChanged(connected) => {
                self.connected = connected;
            }
            Transition::PendingChanged(pending) => {
                self.pending = pending;
            }
        }
    }

    /// Returns true if a `load_more` intent would reach the remote store
    pub fn can_load_more(&self) -> bool {
        self.connected && !self.exhausted && !self.fetching
    }

    pub fn has_pending_changes(&self) -> bool {
        self.pending > 0
    }
}
