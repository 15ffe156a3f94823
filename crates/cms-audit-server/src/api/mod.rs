//! Application assembly: stores, lifecycle wiring, router and server loop

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use sqlx::PgPool;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tracing::info;

use crate::audit::{AuditLogPlugin, AuditLogStore, MemoryAuditLogStore, PgAuditLogStore};
use crate::auth::{
    MemoryPermissionStore, PermissionStore, PermissionStoreChecker, PgPermissionStore,
    StoreAuthenticator,
};
use crate::config::{Config, SharedAuditConfig};
use crate::db;
use crate::features;
use crate::host::{EntityService, EntityStore, LifecycleRegistry, MemoryEntityStore, PgEntityStore};
use crate::middleware::{self, RequestContextLayer};

/// Storage behind one running application
#[derive(Clone)]
pub struct Stores {
    pub entities: Arc<dyn EntityStore>,
    pub audit_logs: Arc<dyn AuditLogStore>,
    pub permissions: Arc<dyn PermissionStore>,
    /// Set for the postgres backend; checked by `/health`
    pub pool: Option<PgPool>,
}

impl Stores {
    pub fn memory() -> Self {
        Self {
            entities: Arc::new(MemoryEntityStore::new()),
            audit_logs: Arc::new(MemoryAuditLogStore::new()),
            permissions: Arc::new(MemoryPermissionStore::new()),
            pool: None,
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            entities: Arc::new(PgEntityStore::new(pool.clone())),
            audit_logs: Arc::new(PgAuditLogStore::new(pool.clone())),
            permissions: Arc::new(PgPermissionStore::new(pool.clone())),
            pool: Some(pool),
        }
    }
}

/// Register the audit plugin and build the entity service around it
pub fn bootstrap(stores: &Stores, audit_config: SharedAuditConfig) -> EntityService {
    let plugin = AuditLogPlugin::new(stores.entities.clone(), stores.audit_logs.clone(), audit_config);

    let mut lifecycles = LifecycleRegistry::new();
    plugin.bootstrap(&mut lifecycles);

    EntityService::new(stores.entities.clone(), Arc::new(lifecycles))
}

/// Create the application router with all routes and middleware
pub fn build_router(config: &Config, stores: &Stores, entities: EntityService) -> Router {
    let feature_state = features::FeatureState {
        entities,
        audit_logs: stores.audit_logs.clone(),
        capabilities: Arc::new(PermissionStoreChecker::new(stores.permissions.clone())),
    };
    let authenticator = Arc::new(StoreAuthenticator::new(stores.entities.clone()));

    Router::new()
        .route("/health", get(health_check))
        .with_state(stores.pool.clone())
        .merge(features::router(feature_state))
        // Apply layers from innermost to outermost
        .layer(RequestContextLayer::new(authenticator))
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

async fn health_check(State(pool): State<Option<PgPool>>) -> impl IntoResponse {
    if let Some(pool) = pool {
        if let Err(e) = db::health_check(&pool).await {
            tracing::error!("Database health check failed: {:?}", e);
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy" })),
            );
        }
    }

    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Bind and serve `app` until a shutdown signal arrives
pub async fn serve(config: &Config, app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("Server shut down gracefully");

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
