//! Error types for calls against the remote vehicle store
//!
//! Every failure the remote collaborator can produce is folded into
//! [`GatewayError`]. Callers decide what to do with it: the sync engine
//! surfaces fetch/save failures and keeps flush failures queued.

use thiserror::Error;

/// Result type for remote gateway operations
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Errors returned by a [`RemoteGateway`](crate::RemoteGateway)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The session credential is missing, expired or rejected
    #[error("Not authorized by the remote store")]
    Unauthorized,

    /// The remote store answered with a non-success status
    #[error("Remote store rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The referenced record does not exist remotely
    #[error("Record not found: {0}")]
    NotFound(String),

    /// The request never produced a response (connection refused, timeout, ...)
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Creates a rejection from a status code and message
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Returns true if the failure is an authorization problem
    ///
    /// Authorization failures are never retried by the sync engine.
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Returns true if the request did not reach the remote store
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns a short message suitable for display in the UI
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized => "Your session has expired. Please sign in again.".to_string(),
            Self::Rejected { message, .. } => format!("The server refused the change: {}", message),
            Self::NotFound(_) => "This vehicle no longer exists.".to_string(),
            Self::Transport(_) => {
                "Cannot reach the server. Please check your connection.".to_string()
            }
            Self::Decode(_) => "Received invalid data from the server.".to_string(),
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
