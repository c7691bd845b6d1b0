use crate::AppCore;
use axum::{
    Extension, Router,
    extract::Request,
    middleware::{Next, from_fn},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{HttpConfig, api, middleware};

pub fn build_router(core: Arc<AppCore>, config: &HttpConfig) -> Router {
    let cors = middleware::cors::build_cors_layer(config);

    let admin_token = config.admin_token.clone();
    let admin = api::admin::router().route_layer(from_fn(move |req: Request, next: Next| {
        let admin_token = admin_token.clone();
        async move { middleware::auth::require_admin_token(req, next, admin_token).await }
    }));

    Router::new()
        .route("/health", get(health_check))
        .route("/check-balance", post(api::balance::check_balance))
        .nest("/api", api::router().nest("/admin", admin))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(Extension(core))
}

async fn health_check() -> &'static str {
    "OK"
}
