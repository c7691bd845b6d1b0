use crate::AppCore;
use crate::http::ApiError;
use crate::models::{AdminKeyRow, KeyListQuery, KeyPage, KeyRecordPatch, StoredKeyRecord};
use crate::services::keys::{self as keys_service, BulkRefreshSummary};
use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    routing::{get, post, put},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

/// Routes mounted under `/api/admin`, behind the admin token check.
pub fn router() -> Router {
    Router::new()
        .route("/keys", get(list_keys))
        .route("/keys/refresh", post(refresh_keys))
        .route("/keys/{id}", put(update_key).delete(delete_key))
        .route("/keys/{id}/refresh", post(refresh_key))
}

async fn list_keys(
    Extension(core): Extension<Arc<AppCore>>,
    Query(query): Query<KeyListQuery>,
) -> Result<Json<KeyPage<AdminKeyRow>>, ApiError> {
    Ok(Json(keys_service::list_admin(&core, &query).await?))
}

async fn update_key(
    Extension(core): Extension<Arc<AppCore>>,
    Path(id): Path<String>,
    body: Result<Json<KeyRecordPatch>, JsonRejection>,
) -> Result<Json<StoredKeyRecord>, ApiError> {
    let Json(patch) = body?;
    Ok(Json(keys_service::update_key(&core, &id, patch).await?))
}

async fn delete_key(
    Extension(core): Extension<Arc<AppCore>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    keys_service::delete_key(&core, &id).await?;
    Ok(Json(json!({ "deleted": true, "id": id })))
}

async fn refresh_key(
    Extension(core): Extension<Arc<AppCore>>,
    Path(id): Path<String>,
) -> Result<Json<StoredKeyRecord>, ApiError> {
    Ok(Json(keys_service::refresh_key(&core, &id).await?))
}

#[derive(Debug, Deserialize)]
struct RefreshRequest {
    ids: Vec<String>,
}

async fn refresh_keys(
    Extension(core): Extension<Arc<AppCore>>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<BulkRefreshSummary>, ApiError> {
    let Json(req) = body?;
    Ok(Json(keys_service::refresh_keys(&core, &req.ids).await))
}
