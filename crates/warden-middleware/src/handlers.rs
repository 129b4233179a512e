//! Custom error handlers.
//!
//! A [`ValidationHandler`] takes full control of the response for one kind of
//! validation error. When it fails, by returning `Err` or by panicking, the
//! failure is forwarded to the continuation/error channel exactly once.
//!
//! An [`ErrorHandler`] is the pipeline's top-level handler for anything that
//! reached the continuation/error channel.

use crate::middleware::BoxFuture;
use crate::request::RequestHead;
use crate::response::RouteResponse;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use warden_core::{RouteError, RouteResult, ValidationError};

/// Handler for one kind of validation error.
pub type ValidationHandler<D, E> = Arc<
    dyn for<'a> Fn(
            ValidationError<E>,
            &'a RequestHead,
            &'a mut RouteResponse<D>,
        ) -> BoxFuture<'a, RouteResult>
        + Send
        + Sync,
>;

/// Top-level handler for errors on the continuation/error channel.
pub type ErrorHandler<D> = Arc<
    dyn for<'a> Fn(RouteError, &'a RequestHead, &'a mut RouteResponse<D>) -> BoxFuture<'a, ()>
        + Send
        + Sync,
>;

/// Wraps a closure as a [`ValidationHandler`].
///
/// ```
/// use http::StatusCode;
/// use serde_json::{json, Value};
/// use warden_middleware::handlers::{validation_handler, ValidationHandler};
///
/// let handler: ValidationHandler<Value, String> = validation_handler(|error, _head, response| {
///     Box::pin(async move {
///         response
///             .set_status(StatusCode::BAD_REQUEST)
///             .json(json!({ "error": error.to_string() }))
///             .await;
///         Ok(())
///     })
/// });
/// ```
pub fn validation_handler<D, E, F>(handler: F) -> ValidationHandler<D, E>
where
    F: for<'a> Fn(
            ValidationError<E>,
            &'a RequestHead,
            &'a mut RouteResponse<D>,
        ) -> BoxFuture<'a, RouteResult>
        + Send
        + Sync
        + 'static,
{
    Arc::new(handler)
}

/// Wraps a closure as an [`ErrorHandler`].
pub fn error_handler<D, F>(handler: F) -> ErrorHandler<D>
where
    F: for<'a> Fn(RouteError, &'a RequestHead, &'a mut RouteResponse<D>) -> BoxFuture<'a, ()>
        + Send
        + Sync
        + 'static,
{
    Arc::new(handler)
}

/// Runs a validation handler, turning a returned error or a panic into the
/// error to forward.
pub(crate) async fn run_validation_handler<D, E>(
    handler: &ValidationHandler<D, E>,
    error: ValidationError<E>,
    head: &RequestHead,
    response: &mut RouteResponse<D>,
) -> RouteResult
where
    D: Send + 'static,
    E: Send + 'static,
{
    let kind = error.kind();
    let call = async move { handler(error, head, response).await };

    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(failure)) => {
            tracing::warn!(
                request_id = %head.request_id(),
                kind = %kind,
                error = %failure,
                "Validation handler failed"
            );
            Err(failure)
        }
        Err(payload) => {
            let failure = RouteError::from_panic(payload.as_ref());
            tracing::error!(
                request_id = %head.request_id(),
                kind = %kind,
                error = %failure,
                "Validation handler panicked"
            );
            Err(failure)
        }
    }
}
