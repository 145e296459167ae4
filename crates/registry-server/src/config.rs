//! Layered server configuration: defaults, then an optional TOML file,
//! then `REGISTRY_`-prefixed environment variables, then CLI flags.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Result, ServerError};

/// Top-level server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server settings.
    pub server: ServerSettings,

    /// Database connection settings.
    pub database: DatabaseConfig,

    /// Bearer-token authentication settings.
    pub auth: AuthConfig,

    /// Logging settings.
    pub monitoring: MonitoringConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Bind host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    /// Enable CORS.
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable response compression.
    #[serde(default = "default_true")]
    pub compression_enabled: bool,
}

/// Database connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres connection URL.
    pub url: String,

    /// Maximum pool connections.
    #[serde(default = "default_db_max_connections")]
    pub max_connections: u32,

    /// Connection acquire timeout in seconds.
    #[serde(default = "default_db_timeout")]
    pub connect_timeout: u64,

    /// Run `sqlx::migrate!` against the pool on startup.
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

/// Bearer-token authentication settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Toggle the bearer-token check on for all but health/info routes.
    #[serde(default = "default_false")]
    pub enabled: bool,

    /// The expected bearer token when `enabled` is true.
    pub token: Option<String>,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// `tracing-subscriber` `EnvFilter` directive, e.g. `"info"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text.
    #[serde(default = "default_false")]
    pub structured_logging: bool,
}

/// Command line arguments, layered last over file/env configuration.
#[derive(Parser, Debug)]
#[command(name = "registry-server")]
#[command(about = "Data product metadata registry HTTP server")]
pub struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Server bind host.
    #[arg(long, env = "REGISTRY_HOST")]
    pub host: Option<String>,

    /// Server bind port.
    #[arg(short, long, env = "REGISTRY_PORT")]
    pub port: Option<u16>,

    /// Database connection URL.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Log level / `EnvFilter` directive.
    #[arg(long, env = "RUST_LOG")]
    pub log_level: Option<String>,
}

impl ServerConfig {
    /// Load configuration from defaults, an optional file, environment
    /// variables, and CLI overrides, in that priority order.
    pub fn load(args: &Args) -> Result<Self> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&Self::default())?);

        if let Some(config_path) = &args.config {
            builder = builder.add_source(config::File::from(config_path.clone()));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("REGISTRY")
                .separator("_")
                .try_parsing(true),
        );

        let mut config: ServerConfig = builder.build()?.try_deserialize()?;

        if let Some(host) = &args.host {
            config.server.host = host.clone();
        }
        if let Some(port) = args.port {
            config.server.port = port;
        }
        if let Some(database_url) = &args.database_url {
            config.database.url = database_url.clone();
        }
        if let Some(log_level) = &args.log_level {
            config.monitoring.log_level = log_level.clone();
        }

        config.validate()?;

        Ok(config)
    }

    /// Reject configurations the server cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(ServerError::Config(config::ConfigError::Message(
                "server port must be greater than 0".to_string(),
            )));
        }

        if self.database.url.is_empty() {
            return Err(ServerError::Config(config::ConfigError::Message(
                "database URL is required".to_string(),
            )));
        }

        if self.auth.enabled && self.auth.token.is_none() {
            return Err(ServerError::Config(config::ConfigError::Message(
                "auth.token is required when auth.enabled is true".to_string(),
            )));
        }

        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            monitoring: MonitoringConfig::default(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout: default_timeout(),
            max_body_size: default_max_body_size(),
            cors_enabled: default_true(),
            cors_origins: default_cors_origins(),
            compression_enabled: default_true(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/registry".to_string(),
            max_connections: default_db_max_connections(),
            connect_timeout: default_db_timeout(),
            run_migrations: default_true(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: default_false(),
            token: None,
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            structured_logging: default_false(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_timeout() -> u64 {
    30
}
fn default_max_body_size() -> usize {
    1024 * 1024
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}
fn default_db_max_connections() -> u32 {
    10
}
fn default_db_timeout() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".to_string()
}
