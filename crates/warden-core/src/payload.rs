//! Response payload types.

use http::StatusCode;

/// A value that can travel through the response emit operations.
///
/// `send_status(code)` hands the validator the body produced by
/// [`Payload::status_body`], so a status-only response is validated like any
/// other. Default error responses are rendered with [`Payload::error_body`].
pub trait Payload: Send + 'static {
    /// Body used for a status-only emission.
    fn status_body(status: StatusCode) -> Self;

    /// Body used by default error responses.
    fn error_body(message: &str) -> Self;
}

impl Payload for serde_json::Value {
    /// The numeric status code, e.g. `204`.
    fn status_body(status: StatusCode) -> Self {
        Self::from(status.as_u16())
    }

    /// `{"message": "..."}`.
    fn error_body(message: &str) -> Self {
        serde_json::json!({ "message": message })
    }
}

impl Payload for String {
    fn status_body(status: StatusCode) -> Self {
        status.as_u16().to_string()
    }

    fn error_body(message: &str) -> Self {
        message.to_string()
    }
}
