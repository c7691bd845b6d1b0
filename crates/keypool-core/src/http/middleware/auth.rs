use crate::http::ApiError;
use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use constant_time_eq::constant_time_eq;

/// Admin routes require `Authorization: Bearer <admin token>`. Without a
/// configured token every admin request is refused.
pub async fn require_admin_token(req: Request, next: Next, admin_token: Option<String>) -> Response {
    let Some(expected) = admin_token.filter(|token| !token.is_empty()) else {
        return ApiError::unauthorized("Admin access is not configured").into_response();
    };

    let Some(value) = req.headers().get(header::AUTHORIZATION) else {
        return ApiError::unauthorized("Missing Authorization header").into_response();
    };

    let Ok(header_value) = value.to_str() else {
        return ApiError::unauthorized("Invalid Authorization header").into_response();
    };

    let Some(token) = header_value.strip_prefix("Bearer ") else {
        return ApiError::unauthorized("Expected a Bearer token").into_response();
    };

    if !constant_time_eq(token.trim().as_bytes(), expected.as_bytes()) {
        tracing::warn!("Rejected admin request with an invalid token");
        return ApiError::unauthorized("Invalid admin token").into_response();
    }

    next.run(req).await
}
