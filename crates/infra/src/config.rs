//! Configuration loading.
//!
//! Defaults, overridden by `DRILLSTORE_*` environment variables
//! (`DRILLSTORE_DATABASE_URL`, `DRILLSTORE_BIND_ADDR`, ...).

use figment::Figment;
use figment::providers::{Env, Serialized};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use drillstore_ledger::DEFAULT_LOW_STOCK_THRESHOLD;

pub const ENV_PREFIX: &str = "DRILLSTORE_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(#[from] figment::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Postgres connection string. Without one the service runs on the
    /// in-memory store.
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub jwt_secret: String,
    /// Default low stock threshold, in percent of quantity received.
    pub low_stock_threshold: Decimal,
    pub max_connections: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            bind_addr: "0.0.0.0:8080".to_string(),
            jwt_secret: "dev-secret".to_string(),
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            max_connections: 10,
        }
    }
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret", &"[REDACTED]")
            .field("low_stock_threshold", &self.low_stock_threshold)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl AppConfig {
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default())).merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn uses_in_memory_store(&self) -> bool {
        self.database_url.as_deref().is_none_or(|url| url.trim().is_empty())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::Invalid("jwt_secret must not be empty".to_string()));
        }
        if self.low_stock_threshold < Decimal::ZERO || self.low_stock_threshold > Decimal::ONE_HUNDRED {
            return Err(ConfigError::Invalid(format!(
                "low_stock_threshold must be between 0 and 100 (got {})",
                self.low_stock_threshold
            )));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid("max_connections must be at least 1".to_string()));
        }
        Ok(())
    }
}
