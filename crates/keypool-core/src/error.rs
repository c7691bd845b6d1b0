//! Error types for balance checks and key pool operations

use crate::models::Provider;
use thiserror::Error;

/// Failure taxonomy shared by the adapters, the dispatcher and the services.
#[derive(Error, Debug)]
pub enum BalanceError {
    /// Missing or empty input, raised before any network call.
    #[error("{0}")]
    Validation(String),

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// The provider answered with a non-2xx status.
    #[error("{} API error: {}", .provider.label(), .status)]
    Provider { provider: Provider, status: u16 },

    #[error("{} returned an unreadable response: {}", .provider.label(), .message)]
    InvalidResponse { provider: Provider, message: String },

    /// Transport-level failure; the message is the transport error text.
    #[error("{0}")]
    Network(#[from] reqwest::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Store(String),
}

impl BalanceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<anyhow::Error> for BalanceError {
    fn from(err: anyhow::Error) -> Self {
        Self::Store(format!("{err:#}"))
    }
}

/// Result type alias for balance and key pool operations
pub type Result<T> = std::result::Result<T, BalanceError>;
