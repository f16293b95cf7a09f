// crates/network/src/error.rs
//! Error types for network operations

use carlot_core::GatewayError;
use thiserror::Error;

/// Result type for network operations
pub type NetworkResult<T> = Result<T, NetworkError>;

/// Errors that can occur during network operations
#[derive(Debug, Error)]
pub enum NetworkError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Credential missing or refused
    #[error("Unauthorized (HTTP {0})")]
    Unauthorized(u16),

    /// Non-success status with the server's message
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Body could not be decoded
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// WebSocket failure
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The push channel was closed
    #[error("Push channel closed")]
    ChannelClosed,
}

impl NetworkError {
    /// Returns true if the request never produced a response
    pub fn is_transport(&self) -> bool {
        match self {
            NetworkError::Http(e) => e.status().is_none() && !e.is_decode(),
            NetworkError::WebSocket(_) | NetworkError::ChannelClosed => true,
            _ => false,
        }
    }

    /// Returns the HTTP status, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            NetworkError::Unauthorized(status) => Some(*status),
            NetworkError::Status { status, .. } => Some(*status),
            NetworkError::Http(e) => e.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}

impl From<NetworkError> for GatewayError {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::Unauthorized(_) => GatewayError::Unauthorized,
            NetworkError::Status { status: 404, message } => GatewayError::NotFound(message),
            NetworkError::Status { status, message } => GatewayError::Rejected { status, message },
            NetworkError::Decode(e) => GatewayError::Decode(e.to_string()),
            NetworkError::Http(e) if e.is_decode() => GatewayError::Decode(e.to_string()),
            NetworkError::Http(e) => match e.status() {
                Some(status) => GatewayError::rejected(status.as_u16(), e.to_string()),
                None => GatewayError::Transport(e.to_string()),
            },
            other => GatewayError::Transport(other.to_string()),
        }
    }
}
