use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Why the carlot config file could not be loaded or saved
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file exists but holds nothing but whitespace
    #[error("{} is empty; delete it or run `carlot init`", .path.display())]
    Empty { path: PathBuf },

    #[error("Cannot parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Written by a newer carlot whose format this build does not know
    #[error(
        "{} uses config format {found}, this build reads up to {supported}",
        .path.display()
    )]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        supported: u32,
    },

    /// Save refused; every offending field is listed
    #[error("Refusing to save invalid config: {}", list(.0))]
    Invalid(Vec<ValidationError>),

    #[error("Cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("No config directory available; pass --config-dir")]
    NoConfigDir,
}

impl ConfigError {
    /// Field paths rejected by validation, empty for other errors
    pub fn invalid_fields(&self) -> Vec<&str> {
        match self {
            ConfigError::Invalid(errors) => errors.iter().map(|e| e.field.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// True when falling back to defaults is reasonable
    ///
    /// A file from a newer version is kept out of this so it is never
    /// silently overwritten.
    pub fn allows_defaults(&self) -> bool {
        matches!(
            self,
            ConfigError::Empty { .. } | ConfigError::Parse { .. } | ConfigError::Read { .. }
        )
    }
}

fn list(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// One rejected field, e.g. `server.push_url`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub value: Option<String>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value: None,
        }
    }

    pub fn with_value(
        field: impl Into<String>,
        message: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        Self {
            value: Some(value.to_string()),
            ..Self::new(field, message)
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{} {} (got `{}`)", self.field, self.message, value),
            None => write!(f, "{} {}", self.field, self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new("server.api_url", "must not be empty");
        assert_eq!(err.to_string(), "server.api_url must not be empty");

        let err = ValidationError::with_value("server.push_url", "must use ws or wss", "http://x");
        assert_eq!(err.to_string(), "server.push_url must use ws or wss (got `http://x`)");
    }

    #[test]
    fn test_invalid_lists_every_field() {
        let err = ConfigError::Invalid(vec![
            ValidationError::new("server.api_url", "must not be empty"),
            ValidationError::with_value("server.request_timeout_secs", "must be between 1 and 300", 0),
        ]);

        assert_eq!(
            err.invalid_fields(),
            vec!["server.api_url", "server.request_timeout_secs"]
        );
        assert_eq!(
            err.to_string(),
            "Refusing to save invalid config: server.api_url must not be empty; \
             server.request_timeout_secs must be between 1 and 300 (got `0`)"
        );
        assert!(!err.allows_defaults());
    }

    #[test]
    fn test_newer_format_does_not_allow_defaults() {
        let err = ConfigError::UnsupportedVersion {
            path: PathBuf::from("config.toml"),
            found: 9,
            supported: 1,
        };
        assert!(!err.allows_defaults());
        assert!(err.invalid_fields().is_empty());
        assert!(ConfigError::Empty { path: PathBuf::from("config.toml") }.allows_defaults());
    }
}
