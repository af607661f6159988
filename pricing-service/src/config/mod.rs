use crate::models::{FeePair, PackageCatalog};
use crate::pricing::ResolverSettings;
use crate::services::{CacheSettings, PricingSettings};
use rust_decimal::Decimal;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub store: StoreBackend,
    /// Present when `store` is `postgres`.
    pub database: Option<DatabaseConfig>,
    pub engine: EngineConfig,
}

/// Where pricing rules live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(AppError::ConfigError(anyhow::anyhow!(
                "RULE_STORE must be 'postgres' or 'memory', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub store_timeout_ms: u64,
    pub cache_enabled: bool,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: usize,
    pub bootstrap_fee_usd: Decimal,
    pub bootstrap_fee_lbp: i64,
    /// Known package types; empty accepts any.
    pub package_types: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store_timeout_ms: 500,
            cache_enabled: true,
            cache_ttl_secs: 30,
            cache_max_entries: 10_000,
            bootstrap_fee_usd: Decimal::ZERO,
            bootstrap_fee_lbp: 0,
            package_types: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn bootstrap_fee(&self) -> FeePair {
        FeePair::new(self.bootstrap_fee_usd, self.bootstrap_fee_lbp)
    }

    /// Settings for [`crate::services::PricingService`].
    pub fn pricing_settings(&self) -> PricingSettings {
        PricingSettings {
            resolver: ResolverSettings {
                store_timeout: Duration::from_millis(self.store_timeout_ms),
                bootstrap_fee: self.bootstrap_fee(),
            },
            cache: self.cache_enabled.then(|| CacheSettings {
                ttl: Duration::from_secs(self.cache_ttl_secs),
                max_entries: self.cache_max_entries,
            }),
            catalog: PackageCatalog::new(self.package_types.iter().cloned()),
        }
    }
}

impl PricingConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let store: StoreBackend = get_env("RULE_STORE", Some("postgres"), is_prod)?.parse()?;
        let database = match store {
            StoreBackend::Postgres => Some(DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: get_parsed("DATABASE_MAX_CONNECTIONS", 10)?,
                min_connections: get_parsed("DATABASE_MIN_CONNECTIONS", 1)?,
            }),
            StoreBackend::Memory => None,
        };

        let defaults = EngineConfig::default();
        let engine = EngineConfig {
            store_timeout_ms: get_parsed("PRICING_STORE_TIMEOUT_MS", defaults.store_timeout_ms)?,
            cache_enabled: get_parsed("PRICING_CACHE_ENABLED", defaults.cache_enabled)?,
            cache_ttl_secs: get_parsed("PRICING_CACHE_TTL_SECS", defaults.cache_ttl_secs)?,
            cache_max_entries: get_parsed("PRICING_CACHE_MAX_ENTRIES", defaults.cache_max_entries)?,
            bootstrap_fee_usd: get_parsed("PRICING_BOOTSTRAP_FEE_USD", defaults.bootstrap_fee_usd)?,
            bootstrap_fee_lbp: get_parsed("PRICING_BOOTSTRAP_FEE_LBP", defaults.bootstrap_fee_lbp)?,
            package_types: parse_package_types(
                &env::var("PRICING_PACKAGE_TYPES").unwrap_or_default(),
            ),
        };
        engine
            .bootstrap_fee()
            .check_bounds()
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("bootstrap fee: {}", e)))?;
        if engine.store_timeout_ms == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PRICING_STORE_TIMEOUT_MS must be greater than zero"
            )));
        }

        Ok(PricingConfig {
            common: common_config,
            service_name: get_env("SERVICE_NAME", Some("pricing-service"), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.trim().is_empty()),
            store,
            database,
            engine,
        })
    }
}

/// Split a comma-separated package type list, dropping blanks.
pub fn parse_package_types(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

/// Optional tuning value; malformed input is a configuration error.
fn get_parsed<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val.trim().parse().map_err(|e: T::Err| {
            AppError::ConfigError(anyhow::anyhow!("{} is invalid: {}", key, e))
        }),
        Err(_) => Ok(default),
    }
}
