pub mod admin;
pub mod balance;
pub mod keys;

use axum::Router;

/// Public routes mounted under `/api`.
pub fn router() -> Router {
    Router::new()
        .merge(balance::router())
        .merge(keys::router())
}
