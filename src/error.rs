use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Ledger read error: {0}")]
    Ledger(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Identity service error: {0}")]
    Identity(String),

    #[error("No data available: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// True if this failure should floor the retry delay instead of following
    /// the exponential schedule. Upstream providers signal throttling both as
    /// HTTP 429 and as plain error strings, so we match on both.
    pub fn is_rate_limit(&self) -> bool {
        match self {
            AppError::RateLimited(_) => true,
            AppError::Http(e) => e
                .status()
                .is_some_and(|s| s == reqwest::StatusCode::TOO_MANY_REQUESTS),
            AppError::Ledger(msg) => {
                let msg = msg.to_ascii_lowercase();
                msg.contains("429")
                    || msg.contains("rate limit")
                    || msg.contains("too many requests")
            }
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
