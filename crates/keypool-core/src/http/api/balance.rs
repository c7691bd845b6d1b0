use crate::AppCore;
use crate::http::ApiError;
use crate::models::{NormalizedBalance, QueryResult};
use crate::services::balance as balance_service;
use axum::{
    Json, Router,
    extract::{Extension, rejection::JsonRejection},
    routing::post,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn router() -> Router {
    Router::new().route("/query", post(query))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckBalanceRequest {
    #[serde(default)]
    provider: Option<String>,
    #[serde(default)]
    api_key: Option<String>,
}

/// `POST /check-balance`: proxy one balance lookup.
pub async fn check_balance(
    Extension(core): Extension<Arc<AppCore>>,
    body: Result<Json<CheckBalanceRequest>, JsonRejection>,
) -> Result<Json<NormalizedBalance>, ApiError> {
    let Json(req) = body?;
    let balance = balance_service::check_balance(
        &core,
        req.provider.as_deref().unwrap_or_default(),
        req.api_key.as_deref().unwrap_or_default(),
    )
    .await?;
    Ok(Json(balance))
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
    provider: String,
    keys: Vec<String>,
}

async fn query(
    Extension(core): Extension<Arc<AppCore>>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<Vec<QueryResult>>, ApiError> {
    let Json(req) = body?;
    let results = balance_service::query_keys(&core, &req.provider, &req.keys).await?;
    Ok(Json(results))
}

#[cfg(test)]
mod tests {
    use crate::http::api::test_support::{json_request, send, test_app};
    use axum::http::StatusCode;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_check_balance_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/balance"))
            .and(header("authorization", "Bearer sk-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "balance_infos": [{"total_balance": 12.5}]
            })))
            .mount(&server)
            .await;

        let (app, _core, _dir) = test_app(&server.uri()).await;
        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/check-balance",
                json!({"provider": "deepseek", "apiKey": "sk-1"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["balance"], 12.5);
        assert_eq!(body["total"], 12.5);
        assert_eq!(body["currency"], "CNY");
        assert_eq!(body["details"]["balance_infos"][0]["total_balance"], 12.5);
    }

    #[tokio::test]
    async fn test_check_balance_client_errors() {
        let (app, _core, _dir) = test_app("http://127.0.0.1:1").await;

        let (status, body) = send(
            &app,
            json_request("POST", "/check-balance", json!({"provider": "deepseek"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/check-balance",
                json!({"provider": "grok", "apiKey": "sk-1"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Unsupported provider: grok");

        let (status, _) = send(
            &app,
            axum::http::Request::builder()
                .method("POST")
                .uri("/check-balance")
                .header("content-type", "application/json")
                .body(axum::body::Body::from("{not json"))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_check_balance_upstream_failure_is_500() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/user/info"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let (app, _core, _dir) = test_app(&server.uri()).await;
        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/check-balance",
                json!({"provider": "siliconflow", "apiKey": "sk-1"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "SiliconFlow API error: 401");
        assert_eq!(body["code"], 500);
    }

    #[tokio::test]
    async fn test_query_returns_results_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/billing/balance"))
            .and(header("authorization", "good"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"AvailableBalance": 1, "TotalBalance": 2})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v3/billing/balance"))
            .and(header("authorization", "bad"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let (app, _core, _dir) = test_app(&server.uri()).await;
        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/query",
                json!({"provider": "volcengine", "keys": ["bad\ngood"]}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["apiKey"], "bad");
        assert_eq!(body[0]["status"], "error");
        assert_eq!(body[1]["apiKey"], "good");
        assert_eq!(body[1]["status"], "success");
        assert_eq!(body[1]["balance"], 1.0);
    }
}
