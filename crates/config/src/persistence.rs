//! Config file persistence with atomic writes

use crate::{Config, ConfigError, ConfigResult, CONFIG_VERSION};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Reads and writes one config file
pub struct ConfigPersistence {
    config_path: PathBuf,
}

impl ConfigPersistence {
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Loads the config file
    ///
    /// A missing file yields defaults. An empty or malformed file, or one
    /// written in a newer format, is an error. Invalid values are logged and
    /// kept so the user can fix them.
    pub fn load(&self) -> ConfigResult<Config> {
        if !self.config_path.exists() {
            log::info!(
                "Config file not found at {}, using defaults",
                self.config_path.display()
            );
            return Ok(Config::default());
        }

        let contents =
            fs::read_to_string(&self.config_path).map_err(|e| ConfigError::Read {
                path: self.config_path.clone(),
                source: e,
            })?;

        if contents.trim().is_empty() {
            return Err(ConfigError::Empty {
                path: self.config_path.clone(),
            });
        }

        let config: Config = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: self.config_path.clone(),
            source: e,
        })?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                path: self.config_path.clone(),
                found: config.version,
                supported: CONFIG_VERSION,
            });
        }

        if let Err(errors) = config.validate() {
            for error in &errors {
                log::warn!("Config value kept despite problem: {}", error);
            }
        }

        Ok(config)
    }

    /// Validates and writes the config atomically
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        config.validate().map_err(ConfigError::Invalid)?;

        let dir = self.config_path.parent().ok_or(ConfigError::NoConfigDir)?;
        ensure_directory_exists(dir)?;

        let contents = toml::to_string_pretty(config)?;
        let write_error = |source| ConfigError::Write {
            path: self.config_path.clone(),
            source,
        };
        let mut temp_file = NamedTempFile::new_in(dir).map_err(write_error)?;
        temp_file
            .write_all(contents.as_bytes())
            .and_then(|()| temp_file.flush())
            .map_err(write_error)?;
        temp_file
            .persist(&self.config_path)
            .map_err(|e| write_error(e.error))?;

        log::info!("Config saved to {}", self.config_path.display());
        Ok(())
    }
}

fn ensure_directory_exists(path: &Path) -> ConfigResult<()> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Created config directory: {}", path.display());
    }
    Ok(())
}
