//! CMS audit server - Main entry point

use anyhow::Result;
use cms_audit_common::logging::{init_logging, LogConfig};
use tracing::info;

use cms_audit_server::{
    api::{self, Stores},
    config::{Config, SharedAuditConfig, StorageBackend},
    db,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; LOG_* environment variables take precedence
    let log_config = LogConfig::builder()
        .log_file_prefix("cms-audit-server")
        .filter_directives("cms_audit_server=debug,tower_http=debug,sqlx=info")
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    info!("Starting CMS audit server");

    let config = Config::load()?;
    info!(
        backend = ?config.storage.backend,
        "Configuration loaded - server will bind to {}:{}",
        config.server.host,
        config.server.port
    );

    let stores = match config.storage.backend {
        StorageBackend::Postgres => {
            let pool = db::create_pool(&config.database).await?;
            db::run_migrations(&pool).await?;
            Stores::postgres(pool)
        },
        StorageBackend::Memory => {
            info!("Using in-memory storage; data is lost on shutdown");
            Stores::memory()
        },
    };

    let audit_config = SharedAuditConfig::new(config.audit_log.clone());
    let entities = api::bootstrap(&stores, audit_config);
    let app = api::build_router(&config, &stores, entities);

    api::serve(&config, app).await
}
