//! Content API routes
//!
//! - `POST /api/content/:content_type` - Create an entity
//! - `GET /api/content/:content_type/:id` - Fetch an entity
//! - `PUT /api/content/:content_type/:id` - Shallow-merge fields into an entity
//! - `DELETE /api/content/:content_type/:id` - Delete an entity
//!
//! User accounts and audit records are read-only here: writes to either
//! content type answer `403 Forbidden` before any lifecycle fires.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;

use crate::audit::AUDIT_LOG_CONTENT_TYPE;
use crate::auth::USER_CONTENT_TYPE;
use crate::error::{ApiResult, AppError};
use crate::host::{Entity, EntityId, EntityService, StoreError};

/// Content types that cannot be written through this API
pub const PROTECTED_CONTENT_TYPES: [&str; 2] = [USER_CONTENT_TYPE, AUDIT_LOG_CONTENT_TYPE];

/// Creates the content router
pub fn content_routes() -> Router<EntityService> {
    Router::new()
        .route("/:content_type", post(create_entity))
        .route(
            "/:content_type/:id",
            get(get_entity).put(update_entity).delete(delete_entity),
        )
}

fn ensure_writable(content_type: &str) -> ApiResult<()> {
    if PROTECTED_CONTENT_TYPES.contains(&content_type) {
        tracing::warn!(content_type, "Rejected write to protected content type");
        return Err(AppError::Forbidden(format!(
            "Content type {content_type} is read-only"
        )));
    }
    Ok(())
}

fn into_entity(body: Value) -> ApiResult<Entity> {
    match body {
        Value::Object(entity) => Ok(entity),
        _ => Err(AppError::BadRequest("Request body must be a JSON object".to_string())),
    }
}

/// Create an entity
///
/// # Response
///
/// - `201 Created` - The stored entity with its assigned `id`
/// - `400 Bad Request` - Body is not a JSON object
/// - `403 Forbidden` - Protected content type
#[tracing::instrument(skip(service, body))]
async fn create_entity(
    State(service): State<EntityService>,
    Path(content_type): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<Entity>)> {
    ensure_writable(&content_type)?;
    let created = service.create(&content_type, into_entity(body)?).await?;

    tracing::info!(id = ?created.get("id"), "Entity created via API");

    Ok((StatusCode::CREATED, Json(created)))
}

#[tracing::instrument(skip(service))]
async fn get_entity(
    State(service): State<EntityService>,
    Path((content_type, id)): Path<(String, EntityId)>,
) -> ApiResult<Json<Entity>> {
    let entity = service
        .find_one(&content_type, id)
        .await?
        .ok_or_else(|| StoreError::not_found(&content_type, id))?;

    Ok(Json(entity))
}

/// Update an entity
///
/// # Response
///
/// - `200 OK` - The entity after the update
/// - `400 Bad Request` - Body is not a JSON object
/// - `403 Forbidden` - Protected content type
/// - `404 Not Found` - No entity with this id
#[tracing::instrument(skip(service, body))]
async fn update_entity(
    State(service): State<EntityService>,
    Path((content_type, id)): Path<(String, EntityId)>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Entity>> {
    ensure_writable(&content_type)?;
    let updated = service.update(&content_type, id, into_entity(body)?).await?;

    tracing::info!("Entity updated via API");

    Ok(Json(updated))
}

/// Delete an entity
///
/// # Response
///
/// - `200 OK` - The entity as it was before deletion
/// - `403 Forbidden` - Protected content type
/// - `404 Not Found` - No entity with this id
#[tracing::instrument(skip(service))]
async fn delete_entity(
    State(service): State<EntityService>,
    Path((content_type, id)): Path<(String, EntityId)>,
) -> ApiResult<Json<Entity>> {
    ensure_writable(&content_type)?;
    let deleted = service.delete(&content_type, id).await?;

    tracing::info!("Entity deleted via API");

    Ok(Json(deleted))
}
