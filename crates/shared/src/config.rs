//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtConfig,
    /// Shipping carrier API configuration.
    pub carrier: CarrierConfig,
    /// Batch worker pool configuration.
    #[serde(default)]
    pub batch: BatchConfig,
    /// Initial super-admin provisioning.
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// Secret key for signing tokens.
    pub secret: String,
    /// Access token expiration in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    900 // 15 minutes
}

/// Shipping carrier API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CarrierConfig {
    /// Base URL of the carrier REST API.
    pub base_url: String,
    /// API token sent as `Authorization: ShippoToken <token>`.
    pub api_token: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_carrier_timeout")]
    pub timeout_secs: u64,
}

fn default_carrier_timeout() -> u64 {
    30
}

/// Batch worker pool configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    /// Number of batch jobs processed concurrently.
    #[serde(default = "default_batch_workers")]
    pub workers: usize,
    /// Capacity of the pending job queue.
    #[serde(default = "default_batch_queue_capacity")]
    pub queue_capacity: usize,
    /// How often unfinished jobs that did not fit in the queue are picked up.
    #[serde(default = "default_batch_sweep_interval")]
    pub sweep_interval_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: default_batch_workers(),
            queue_capacity: default_batch_queue_capacity(),
            sweep_interval_ms: default_batch_sweep_interval(),
        }
    }
}

fn default_batch_workers() -> usize {
    4
}

fn default_batch_queue_capacity() -> usize {
    256
}

fn default_batch_sweep_interval() -> u64 {
    5_000
}

/// Initial super-admin provisioning, applied at startup when no account
/// with the configured email exists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BootstrapConfig {
    /// Email of the super-admin account.
    pub super_admin_email: Option<String>,
    /// Password of the super-admin account.
    pub super_admin_password: Option<String>,
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("CREDITSHIP").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED_VARS: [(&str, Option<&str>); 4] = [
        ("CREDITSHIP__DATABASE__URL", Some("postgres://localhost/creditship")),
        ("CREDITSHIP__JWT__SECRET", Some("secret")),
        ("CREDITSHIP__CARRIER__BASE_URL", Some("https://api.goshippo.com")),
        ("CREDITSHIP__CARRIER__API_TOKEN", Some("shippo_test_token")),
    ];

    #[test]
    fn test_load_from_environment_with_defaults() {
        temp_env::with_vars(REQUIRED_VARS, || {
            let config = AppConfig::load().unwrap();

            assert_eq!(config.database.url, "postgres://localhost/creditship");
            assert_eq!(config.server.port, 8080);
            assert_eq!(config.server.host, "0.0.0.0");
            assert_eq!(config.jwt.access_token_expiry_secs, 900);
            assert_eq!(config.carrier.timeout_secs, 30);
            assert_eq!(config.batch.workers, 4);
            assert_eq!(config.batch.queue_capacity, 256);
            assert_eq!(config.batch.sweep_interval_ms, 5_000);
            assert!(config.bootstrap.super_admin_email.is_none());
        });
    }

    #[test]
    fn test_missing_database_url_fails() {
        temp_env::with_vars(
            [
                ("CREDITSHIP__DATABASE__URL", None),
                ("CREDITSHIP__JWT__SECRET", Some("secret")),
                ("CREDITSHIP__CARRIER__BASE_URL", Some("https://api.goshippo.com")),
                ("CREDITSHIP__CARRIER__API_TOKEN", Some("token")),
            ],
            || {
                assert!(AppConfig::load().is_err());
            },
        );
    }
}
