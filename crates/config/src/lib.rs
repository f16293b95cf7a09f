//! Carlot configuration
//!
//! Settings live in a TOML file under the platform config directory. Each
//! section implements [`ConfigSection`] and validates itself; saving refuses
//! invalid values and never leaves a half-written file behind.
//!
//! # Example
//!
//! ```rust,no_run
//! use carlot_config::{Config, ConfigManager};
//!
//! let manager = ConfigManager::new().expect("Failed to initialize config");
//! let config = manager.load().unwrap_or_else(|e| {
//!     eprintln!("Config error: {}, using defaults", e);
//!     Config::default()
//! });
//!
//! println!("API: {}", config.server.api_url);
//! ```

mod error;
mod manager;
mod persistence;
mod validation;

pub mod app_config;
mod server_config;

pub use app_config::{AppConfig, LogLevel};
pub use error::{ConfigError, ConfigResult, ValidationError};
pub use manager::ConfigManager;
pub use server_config::ServerConfig;
pub use validation::{ConfigSection, Validator};

use serde::{Deserialize, Serialize};

/// Current config file format version
pub const CONFIG_VERSION: u32 = 1;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Config file format version
    pub version: u32,

    /// Remote store endpoints and timings
    pub server: ServerConfig,

    /// Application-level settings
    pub app: AppConfig,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates every section, returning all errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(mut e) = self.server.validate() {
            errors.append(&mut e);
        }
        if let Err(mut e) = self.app.validate() {
            errors.append(&mut e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            server: ServerConfig::default(),
            app: AppConfig::default(),
        }
    }
}
