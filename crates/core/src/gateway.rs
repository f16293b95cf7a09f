//! Remote store façade
//!
//! The sync engine only ever talks to the remote collection through this
//! trait. The HTTP implementation lives in `carlot-network`; an in-process
//! implementation lives in `carlot-sync-engine` for demos and tests.

use crate::error::GatewayResult;
use crate::types::Vehicle;
use async_trait::async_trait;

/// Request/response operations against the remote vehicle collection
///
/// All calls take the session credential. A missing or rejected credential
/// is reported as [`GatewayError::Unauthorized`](crate::GatewayError::Unauthorized).
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Lists up to `page_size` vehicles starting at `offset`
    async fn list(&self, token: &str, offset: usize, page_size: usize) -> GatewayResult<Vec<Vehicle>>;

    /// Creates a vehicle; the remote store assigns its id
    async fn create(&self, token: &str, vehicle: &Vehicle) -> GatewayResult<Vehicle>;

    /// Replaces the vehicle stored under `id`
    async fn update(&self, token: &str, id: &str, vehicle: &Vehicle) -> GatewayResult<Vehicle>;
}
