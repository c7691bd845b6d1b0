use crate::error::BalanceError;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "code": self.status.as_u16(),
        }));
        (self.status, body).into_response()
    }
}

impl From<BalanceError> for ApiError {
    fn from(err: BalanceError) -> Self {
        let status = match &err {
            BalanceError::Validation(_) | BalanceError::UnsupportedProvider(_) => {
                StatusCode::BAD_REQUEST
            }
            BalanceError::NotFound(_) => StatusCode::NOT_FOUND,
            BalanceError::Provider { .. }
            | BalanceError::InvalidResponse { .. }
            | BalanceError::Network(_)
            | BalanceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %err, "API error");
        } else {
            tracing::debug!(error = %err, "Rejected request");
        }
        Self::new(status, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "Rejected request body");
        Self::bad_request(rejection.body_text())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!(error = %err, "API error");
        Self::internal(format!("{err:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provider;

    #[test]
    fn test_balance_error_status_mapping() {
        let cases = [
            (BalanceError::validation("missing"), StatusCode::BAD_REQUEST),
            (
                BalanceError::UnsupportedProvider("x".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                BalanceError::NotFound("Key a".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                BalanceError::Provider {
                    provider: Provider::Qwen,
                    status: 403,
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                BalanceError::Store("disk".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status, expected);
        }
    }
}
