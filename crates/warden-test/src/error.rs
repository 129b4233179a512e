//! Test error types.

use thiserror::Error;
use warden_middleware::BridgeError;

/// Errors that can occur while driving a route in a test.
#[derive(Debug, Error)]
pub enum TestError {
    /// Request building failed.
    #[error("request build error: {0}")]
    RequestBuild(String),

    /// A header name or value is invalid.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The request could not be decoded into route regions.
    #[error("request decode error: {0}")]
    Bridge(#[from] BridgeError),

    /// Response body reading failed.
    #[error("body read error: {0}")]
    BodyRead(String),

    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
