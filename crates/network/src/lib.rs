// crates/network/src/lib.rs
//! Network adapters for the sync engine
//!
//! - [`HttpGateway`]: REST implementation of [`carlot_core::RemoteGateway`]
//! - [`PushChannel`]: WebSocket live updates
//! - [`ConnectivityMonitor`]: server reachability as a watch channel

mod client;
mod connectivity;
mod error;
mod push;

pub use client::{ClientConfig, HttpGateway};
pub use connectivity::{ConnectivityMonitor, ConnectivityWatch};
pub use error::{NetworkError, NetworkResult};
pub use push::PushChannel;
