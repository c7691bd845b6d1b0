use crate::AppCore;
use crate::http::ApiError;
use crate::models::{KeyListQuery, KeyPage, NewKeyRecord, QueryResult, SharedKeyRow};
use crate::reconcile::{SavePreview, SaveSummary};
use crate::services::keys as keys_service;
use axum::{
    Json, Router,
    extract::{Extension, Query, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;

pub fn router() -> Router {
    Router::new()
        .route("/keys", get(list_keys).post(add_key))
        .route("/keys/save/preview", post(preview_save))
        .route("/keys/save", post(save))
}

async fn list_keys(
    Extension(core): Extension<Arc<AppCore>>,
    Query(query): Query<KeyListQuery>,
) -> Result<Json<KeyPage<SharedKeyRow>>, ApiError> {
    Ok(Json(keys_service::list_shared(&core, &query).await?))
}

async fn add_key(
    Extension(core): Extension<Arc<AppCore>>,
    body: Result<Json<NewKeyRecord>, JsonRejection>,
) -> Result<(StatusCode, Json<SharedKeyRow>), ApiError> {
    let Json(new) = body?;
    let record = keys_service::add_key(&core, new).await?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

#[derive(Debug, Deserialize)]
struct SaveRequest {
    results: Vec<QueryResult>,
}

async fn preview_save(
    Extension(core): Extension<Arc<AppCore>>,
    body: Result<Json<SaveRequest>, JsonRejection>,
) -> Result<Json<SavePreview>, ApiError> {
    let Json(req) = body?;
    Ok(Json(keys_service::preview_save(&core, &req.results).await?))
}

async fn save(
    Extension(core): Extension<Arc<AppCore>>,
    body: Result<Json<SaveRequest>, JsonRejection>,
) -> Result<Json<SaveSummary>, ApiError> {
    let Json(req) = body?;
    Ok(Json(keys_service::save_results(&core, &req.results).await?))
}
