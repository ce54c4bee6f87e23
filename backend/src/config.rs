//! Configuration management for the Storefront Order Management Platform
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with OMS_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Identity provider token configuration
    pub jwt: JwtConfig,

    /// Weekly reconciliation tuning
    pub reconciliation: ReconciliationConfig,

    /// Log output
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret shared with the identity provider for verifying bearer tokens
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReconciliationConfig {
    /// Rows requested per plan-line page
    pub page_size: usize,

    /// Rows per insert statement when uploading a weekly plan
    pub upload_chunk_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    pub filter: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("OMS_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default(
                "reconciliation.page_size",
                shared::DEFAULT_PLAN_PAGE_SIZE as i64,
            )?
            .set_default("reconciliation.upload_chunk_size", 1000)?
            .set_default(
                "logging.filter",
                "oms_server=debug,oms_backend=debug,tower_http=debug,sqlx=warn",
            )?
            .set_default("logging.json", false)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (OMS_ prefix)
            .add_source(
                Environment::with_prefix("OMS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            page_size: shared::DEFAULT_PLAN_PAGE_SIZE,
            upload_chunk_size: 1000,
        }
    }
}
