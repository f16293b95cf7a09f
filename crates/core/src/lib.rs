//! Core domain types for carlot
//!
//! - [`Vehicle`]: the record synchronized between clients and the remote store
//! - [`VehicleId`]: server-assigned or temporary (offline) identity
//! - [`PushMessage`]: the push-channel wire contract
//! - [`RemoteGateway`]: the request/response façade over the remote store

pub mod error;
pub mod gateway;
pub mod types;

pub use error::{GatewayError, GatewayResult};
pub use gateway::RemoteGateway;
pub use types::{PushMessage, Vehicle, VehicleId, TEMPORARY_ID_PREFIX};
