//! HTTP API served by `keypool-server`.

pub mod api;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use server::{HttpConfig, HttpServer};
