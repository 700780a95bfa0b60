//! Oracle errors.
//!
//! Oracle failures are fatal to the session: the core performs no local
//! recovery. Bounded retry for transport-class variants is available as an
//! opt-in wrapper in `clinsim-session`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Rate limited: retry after {retry_after_seconds} seconds")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),
}
