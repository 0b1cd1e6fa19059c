//! # API Configuration
//!
//! ## Load Order (later overrides earlier)
//! 1. Default values
//! 2. Config file (`$CELLAR_CONFIG`, else `./cellar.toml` when present)
//! 3. `CELLAR_*` environment variables
//!
//! ## Example `cellar.toml`
//! ```toml
//! bind_addr = "0.0.0.0"
//! port = 8080
//! db_path = "/var/lib/cellar/cellar.db"
//! default_tenant = "default"
//! max_connections = 5
//! ```

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use cellar_core::validation::validate_tenant_id;
use cellar_core::DEFAULT_TENANT_ID;

const DEFAULT_CONFIG_FILE: &str = "cellar.toml";

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Interface to listen on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// HTTP port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Tenant used when a request carries no `X-Tenant-Id` header.
    #[serde(default = "default_tenant")]
    pub default_tenant: String,

    /// Upper bound for the SQLite pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_bind_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./cellar.db")
}

fn default_tenant() -> String {
    DEFAULT_TENANT_ID.to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            bind_addr: default_bind_addr(),
            port: default_port(),
            db_path: default_db_path(),
            default_tenant: default_tenant(),
            max_connections: default_max_connections(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from file, environment, and defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let explicit = std::env::var("CELLAR_CONFIG").ok().map(PathBuf::from);

        let mut config = match explicit {
            // An explicitly named file must exist
            Some(path) => Self::from_file(&path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)?
                } else {
                    debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Self::default()
                }
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Reads a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!(?path, "Loading config from file");
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Parses TOML text.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies `CELLAR_*` overrides read through `lookup`.
    ///
    /// Unparseable numbers are errors rather than silently ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("CELLAR_BIND_ADDR") {
            self.bind_addr = addr;
        }

        if let Some(port) = lookup("CELLAR_PORT") {
            self.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidValue("CELLAR_PORT".to_string()))?;
        }

        if let Some(path) = lookup("CELLAR_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.db_path = PathBuf::from(path);
        }

        if let Some(tenant) = lookup("CELLAR_DEFAULT_TENANT") {
            self.default_tenant = tenant;
        }

        if let Some(max) = lookup("CELLAR_MAX_CONNECTIONS") {
            self.max_connections = max
                .parse()
                .map_err(|_| ConfigError::InvalidValue("CELLAR_MAX_CONNECTIONS".to_string()))?;
        }

        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;

        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "max_connections must be greater than 0".to_string(),
            ));
        }

        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired("db_path".to_string()));
        }

        validate_tenant_id(&self.default_tenant)
            .map_err(|e| ConfigError::InvalidValue(format!("default_tenant: {e}")))?;

        Ok(())
    }

    /// The address to bind the listener to.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("bind_addr '{}'", self.bind_addr)))
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = ApiConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.socket_addr().unwrap().port(), 8080);
        assert_eq!(config.default_tenant, "default");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ApiConfig::from_toml(
            r#"
            port = 9000
            db_path = "/tmp/cellar-test.db"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.db_path, PathBuf::from("/tmp/cellar-test.db"));
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn test_malformed_toml_is_rejected() {
        let err = ApiConfig::from_toml("port = \"eighty\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = ApiConfig::from_toml("port = 9000\ndefault_tenant = \"acme\"").unwrap();
        config
            .apply_overrides(env(&[
                ("CELLAR_PORT", "9100"),
                ("CELLAR_BIND_ADDR", "0.0.0.0"),
                ("CELLAR_MAX_CONNECTIONS", "8"),
            ]))
            .unwrap();

        assert_eq!(config.port, 9100);
        assert_eq!(config.bind_addr, "0.0.0.0");
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.default_tenant, "acme");
    }

    #[test]
    fn test_bad_env_number_is_an_error() {
        let mut config = ApiConfig::default();
        let err = config
            .apply_overrides(env(&[("CELLAR_PORT", "http")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(key) if key == "CELLAR_PORT"));
    }

    #[test]
    fn test_validate_rejects_zero_pool_and_bad_address() {
        let config = ApiConfig {
            max_connections: 0,
            ..ApiConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ApiConfig {
            bind_addr: "not an address".to_string(),
            ..ApiConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ApiConfig {
            default_tenant: String::new(),
            ..ApiConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
