// crates/network/src/client.rs
//! HTTP implementation of the remote vehicle store

use crate::error::{NetworkError, NetworkResult};
use async_trait::async_trait;
use carlot_core::{GatewayResult, RemoteGateway, Vehicle};
use reqwest::{Client as ReqwestClient, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const CARS_PATH: &str = "api/cars";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API server, e.g. `http://localhost:3000`
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("carlot/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Error body sent by the API server
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Remote gateway speaking the REST API
///
/// Requests are not retried: a failure is reported to the caller, which
/// decides whether the record stays queued.
#[derive(Clone)]
pub struct HttpGateway {
    inner: ReqwestClient,
    cars_url: Url,
}

impl HttpGateway {
    /// Creates a gateway for the server at `config.base_url`
    pub fn new(config: ClientConfig) -> NetworkResult<Self> {
        let inner = ReqwestClient::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let mut base = Url::parse(&config.base_url)
            .map_err(|e| NetworkError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let cars_url = base
            .join(CARS_PATH)
            .map_err(|e| NetworkError::InvalidUrl(e.to_string()))?;

        Ok(Self { inner, cars_url })
    }

    /// URL of the vehicle collection
    pub fn cars_url(&self) -> &Url {
        &self.cars_url
    }

    fn record_url(&self, id: &str) -> NetworkResult<Url> {
        let mut url = self.cars_url.clone();
        url.path_segments_mut()
            .map_err(|_| NetworkError::InvalidUrl(self.cars_url.to_string()))?
            .push(id);
        Ok(url)
    }

    /// Fetches one page of the caller's collection
    pub async fn fetch_page(&self, token: &str, offset: usize, page_size: usize) -> NetworkResult<Vec<Vehicle>> {
        let request = self
            .inner
            .get(self.cars_url.clone())
            .query(&[("numberOfLoadedCars", offset), ("pageSize", page_size)]);
        self.send(request, token).await
    }

    /// Creates a record; the server assigns its id
    pub async fn post_vehicle(&self, token: &str, vehicle: &Vehicle) -> NetworkResult<Vehicle> {
        let request = self.inner.post(self.cars_url.clone()).json(vehicle);
        self.send(request, token).await
    }

    /// Replaces the record stored under `id`
    pub async fn put_vehicle(&self, token: &str, id: &str, vehicle: &Vehicle) -> NetworkResult<Vehicle> {
        let request = self.inner.put(self.record_url(id)?).json(vehicle);
        self.send(request, token).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, token: &str) -> NetworkResult<T> {
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        log::debug!("Request failed with HTTP {}: {}", status.as_u16(), body);
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(NetworkError::Unauthorized(status.as_u16()));
        }

        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|error| error.message)
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("Unknown").to_string());
        Err(NetworkError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    async fn list(&self, token: &str, offset: usize, page_size: usize) -> GatewayResult<Vec<Vehicle>> {
        Ok(self.fetch_page(token, offset, page_size).await?)
    }

    async fn create(&self, token: &str, vehicle: &Vehicle) -> GatewayResult<Vehicle> {
        Ok(self.post_vehicle(token, vehicle).await?)
    }

    async fn update(&self, token: &str, id: &str, vehicle: &Vehicle) -> GatewayResult<Vehicle> {
        Ok(self.put_vehicle(token, id, vehicle).await?)
    }
}
