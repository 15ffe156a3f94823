//! Configuration management
//!
//! Sources, lowest to highest precedence:
//! 1. Built-in defaults
//! 2. TOML file at `$CMS_AUDIT_CONFIG` (default `config/cms-audit.toml`), if present
//! 3. `DATABASE_URL`
//! 4. `CMS_AUDIT_*` environment variables, `__` separating sections
//!    (`CMS_AUDIT_SERVER__PORT`, `CMS_AUDIT_AUDIT_LOG__ENABLED`)

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use crate::audit::AUDIT_LOG_CONTENT_TYPE;

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 1337;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/cms_audit";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database idle timeout in seconds (10 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

/// Default CORS allowed origin for local development.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Environment variable naming the TOML configuration file.
pub const CONFIG_PATH_ENV: &str = "CMS_AUDIT_CONFIG";

/// Default TOML configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/cms-audit.toml";

/// Server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub audit_log: AuditLogConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SERVER_HOST.to_string(),
            port: DEFAULT_SERVER_PORT,
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
            min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
            connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
        }
    }
}

/// Where entities, audit records and role permissions live
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    #[default]
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
            allow_credentials: true,
        }
    }
}

/// Audit plugin settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogConfig {
    pub enabled: bool,
    pub exclude_content_types: Vec<String>,
}

impl Default for AuditLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            exclude_content_types: Vec::new(),
        }
    }
}

impl AuditLogConfig {
    /// Whether mutations of `content_type` must not be audited
    ///
    /// True for an empty content type, an excluded one, the audit-log type
    /// itself, or when auditing is disabled.
    pub fn should_skip(&self, content_type: &str) -> bool {
        content_type.is_empty()
            || !self.enabled
            || content_type == AUDIT_LOG_CONTENT_TYPE
            || self.exclude_content_types.iter().any(|ct| ct == content_type)
    }
}

/// Runtime-replaceable audit settings shared by every hook
///
/// Readers clone the current value on each evaluation, so a `replace` or
/// `reload` takes effect for the next mutation without re-registering hooks.
#[derive(Debug, Clone, Default)]
pub struct SharedAuditConfig {
    inner: Arc<RwLock<AuditLogConfig>>,
}

impl SharedAuditConfig {
    pub fn new(config: AuditLogConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Snapshot of the current settings
    pub fn current(&self) -> AuditLogConfig {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, config: AuditLogConfig) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = config;
    }

    /// Re-extract the `audit_log` section from `figment` and swap it in
    pub fn reload(&self, figment: &Figment) -> Result<(), figment::Error> {
        let config: AuditLogConfig = figment.extract_inner("audit_log")?;
        tracing::info!(
            enabled = config.enabled,
            excluded = config.exclude_content_types.len(),
            "Reloaded audit log configuration"
        );
        self.replace(config);
        Ok(())
    }
}

impl Config {
    /// Load configuration from `.env`, the TOML file and the environment
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config: Config = Self::figment().extract()?;
        config.validate()?;

        Ok(config)
    }

    /// Build the provider chain
    pub fn figment() -> Figment {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(
                Env::raw()
                    .only(&["DATABASE_URL"])
                    .map(|_| "database.url".into()),
            )
            .merge(Env::prefixed("CMS_AUDIT_").split("__"))
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.storage.backend == StorageBackend::Postgres && self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.cors.allowed_origins.is_empty() {
            tracing::warn!("No CORS origins configured - all origins will be allowed");
        }

        Ok(())
    }
}
