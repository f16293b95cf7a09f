// crates/sync-engine/src/error.rs
//! Error types for sync operations

use carlot_core::GatewayError;
use thiserror::Error;

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors surfaced to the rendering layer
///
/// Flush failures are not errors: they are logged, reported in a
/// [`FlushReport`](crate::FlushReport) and stay queued.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Remote list call failed; the cursor is unchanged
    #[error("Failed to fetch vehicles: {0}")]
    Fetch(#[source] GatewayError),

    /// Remote create/update failed while connected; nothing was queued
    #[error("Failed to save vehicle: {0}")]
    Save(#[source] GatewayError),

    /// No session credential, the operation was not attempted
    #[error("No session credential available")]
    AuthorizationMissing,

    /// The fetch was canceled and its response discarded
    #[error("Fetch was canceled")]
    Canceled,

    /// The session owning the coordinator has ended
    #[error("Sync session has ended")]
    SessionClosed,
}

impl SyncError {
    /// Returns the underlying remote failure, if any
    pub fn gateway_error(&self) -> Option<&GatewayError> {
        match self {
            Self::Fetch(err) | Self::Save(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SyncError::Fetch(GatewayError::Transport("refused".to_string()));
        assert!(err.to_string().contains("Failed to fetch"));
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn test_save_error_keeps_source() {
        let err = SyncError::Save(GatewayError::rejected(400, "bad year"));
        assert_eq!(err.gateway_error(), Some(&GatewayError::rejected(400, "bad year")));
    }

    #[test]
    fn test_authorization_missing_error() {
        let err = SyncError::AuthorizationMissing;
        assert!(err.to_string().contains("credential"));
        assert!(err.gateway_error().is_none());
    }

    #[test]
    fn test_session_closed_error() {
        assert!(SyncError::SessionClosed.to_string().contains("ended"));
    }
}
