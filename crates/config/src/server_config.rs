//! Remote server configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const HTTP_SCHEMES: &[&str] = &["http", "https"];
const WS_SCHEMES: &[&str] = &["ws", "wss"];

/// Where the remote vehicle store lives and how to talk to it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the REST API
    pub api_url: String,

    /// WebSocket URL of the push channel
    pub push_url: String,

    /// Timeout for a single HTTP request
    pub request_timeout_secs: u64,

    /// URL probed to decide whether the server is reachable
    pub connectivity_probe_url: String,

    /// Seconds between reachability probes
    pub connectivity_interval_secs: u64,
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connectivity_interval(&self) -> Duration {
        Duration::from_secs(self.connectivity_interval_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000".to_string(),
            push_url: "ws://localhost:3000".to_string(),
            request_timeout_secs: 30,
            connectivity_probe_url: "http://localhost:3000".to_string(),
            connectivity_interval_secs: 5,
        }
    }
}

impl ConfigSection for ServerConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::collect_errors(vec![
            Validator::url(&self.api_url, HTTP_SCHEMES, "server.api_url"),
            Validator::url(&self.push_url, WS_SCHEMES, "server.push_url"),
            Validator::url(
                &self.connectivity_probe_url,
                HTTP_SCHEMES,
                "server.connectivity_probe_url",
            ),
            Validator::in_range(self.request_timeout_secs, 1, 300, "server.request_timeout_secs"),
            Validator::in_range(
                self.connectivity_interval_secs,
                1,
                3600,
                "server.connectivity_interval_secs",
            ),
        ])
    }

    fn section_name(&self) -> &'static str {
        "server"
    }
}
