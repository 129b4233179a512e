//! The per-route middleware pipeline.
//!
//! A [`Pipeline`] owns an ordered list of stages and the route at the end of
//! them. [`Pipeline::handle`] runs one exchange through the chain and then
//! drains the continuation/error channel: errors diverted by interceptors
//! first, then the error the chain itself returned. Each error is given to the
//! configured [`ErrorHandler`] or, without one, rendered by the default
//! handler.
//!
//! ## Default error rendering
//!
//! | error | status | body |
//! |-------|--------|------|
//! | `BadRequest` | 400 | `error_body("Bad Request")` |
//! | anything else | the error's status (usually 500) | the canonical reason, or the message when details are exposed |
//!
//! Nothing is rendered when the response has already been emitted; the error
//! is only logged.

use crate::exchange::Exchange;
use crate::handlers::ErrorHandler;
use crate::middleware::{BoxFuture, Middleware, Next, Route};
use crate::request::{RequestHead, RouteRequest};
use crate::response::RouteResponse;
use futures_util::FutureExt;
use http::StatusCode;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use warden_core::{Payload, RouteError, RouteResult, ValidationErrorKind};

/// A type-erased middleware that can be stored in a vector.
pub type BoxedMiddleware<D> = Arc<dyn Middleware<D>>;

/// An ordered chain of stages ending in a route.
///
/// # Example
///
/// ```
/// use http::{Method, StatusCode};
/// use serde_json::{json, Value};
/// use warden_middleware::{Pipeline, RouteRequest};
///
/// # tokio_test::block_on(async {
/// let pipeline = Pipeline::<Value>::builder().build(|_request, response| {
///     Box::pin(async move {
///         response.set_status(StatusCode::CREATED).json(json!({ "id": 7 })).await;
///         Ok(())
///     })
/// });
///
/// let response = pipeline.handle(RouteRequest::new(Method::POST, "/users")).await;
/// assert_eq!(response.emission().unwrap().status, StatusCode::CREATED);
/// # });
/// ```
pub struct Pipeline<D> {
    stages: Vec<BoxedMiddleware<D>>,
    route: Arc<dyn Route<D>>,
    error_handler: Option<ErrorHandler<D>>,
    expose_error_details: bool,
}

impl<D> Pipeline<D>
where
    D: Payload + Send + Sync + 'static,
{
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder<D> {
        PipelineBuilder::new()
    }

    /// Runs one request through the pipeline and returns the response.
    ///
    /// Every interception layer is removed before the error channel is
    /// drained, so error handlers always emit straight to the transport.
    pub async fn handle(&self, request: RouteRequest<D>) -> RouteResponse<D> {
        let mut exchange = Exchange::new(request);

        let chain = self.build_chain();
        let outcome = AssertUnwindSafe(chain.run(&mut exchange))
            .catch_unwind()
            .await;
        let result = match outcome {
            Ok(result) => result,
            Err(payload) => {
                let error = RouteError::from_panic(payload.as_ref());
                tracing::error!(
                    request_id = %exchange.request.request_id(),
                    error = %error,
                    "Middleware panicked"
                );
                Err(error)
            }
        };

        exchange.response.restore_all();
        let mut errors = exchange.response.take_diverted();
        if let Err(error) = result {
            errors.push(error);
        }

        let elapsed = exchange.elapsed();
        let (request, mut response) = exchange.into_parts();
        for error in errors {
            self.handle_error(error, request.head(), &mut response).await;
        }

        tracing::debug!(
            request_id = %request.request_id(),
            http.method = %request.method(),
            http.path = request.url(),
            http.status_code = response.status().as_u16(),
            emitted = response.is_emitted(),
            duration_ms = elapsed.as_secs_f64() * 1000.0,
            "Request completed"
        );
        response
    }

    /// Returns the names of all stages in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    fn build_chain(&self) -> Next<'_, D> {
        let mut next = Next::route(self.route.as_ref());
        for middleware in self.stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next
    }

    async fn handle_error(
        &self,
        error: RouteError,
        head: &RequestHead,
        response: &mut RouteResponse<D>,
    ) {
        let Some(handler) = &self.error_handler else {
            render_default(error, head, response, self.expose_error_details).await;
            return;
        };

        let call = async { handler(error, head, &mut *response).await };
        let outcome = AssertUnwindSafe(call).catch_unwind().await;
        if let Err(payload) = outcome {
            let failure = RouteError::from_panic(payload.as_ref());
            tracing::error!(
                request_id = %head.request_id(),
                error = %failure,
                "Error handler panicked"
            );
            render_default(failure, head, response, self.expose_error_details).await;
        }
    }
}

impl<D: 'static> fmt::Debug for Pipeline<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&'static str> = self.stages.iter().map(|stage| stage.name()).collect();
        f.debug_struct("Pipeline")
            .field("stages", &names)
            .field("error_handler", &self.error_handler.is_some())
            .field("expose_error_details", &self.expose_error_details)
            .finish_non_exhaustive()
    }
}

/// Renders an error the way the pipeline does without a custom handler.
pub async fn render_default<D>(
    error: RouteError,
    head: &RequestHead,
    response: &mut RouteResponse<D>,
    expose_error_details: bool,
) where
    D: Payload + Send + Sync + 'static,
{
    if response.is_emitted() {
        tracing::warn!(
            request_id = %head.request_id(),
            http.method = %head.method(),
            http.path = head.url(),
            error = %error,
            "Error raised after the response was emitted"
        );
        return;
    }

    let status = error.status_code();
    match error.kind() {
        Some(ValidationErrorKind::BadRequest) => {
            tracing::debug!(
                request_id = %head.request_id(),
                http.method = %head.method(),
                http.path = head.url(),
                error = %error,
                "Bad request"
            );
        }
        Some(ValidationErrorKind::BadResponse) => {
            tracing::warn!(
                request_id = %head.request_id(),
                http.status_code = response.status().as_u16(),
                error = %error,
                "Bad {} Response at ({}) {}",
                response.status().as_u16(),
                head.method(),
                head.url()
            );
        }
        Some(ValidationErrorKind::MissingSchema) => {
            tracing::warn!(
                request_id = %head.request_id(),
                http.status_code = response.status().as_u16(),
                error = %error,
                "Missing {} Response Validator at ({}) {}",
                response.status().as_u16(),
                head.method(),
                head.url()
            );
        }
        _ => {
            tracing::warn!(
                request_id = %head.request_id(),
                http.method = %head.method(),
                http.path = head.url(),
                error = %error,
                "Unhandled route error"
            );
        }
    }

    let body = if expose_error_details {
        D::error_body(&error.to_string())
    } else {
        D::error_body(reason(status))
    };
    response.set_status(status).json(body).await;
}

fn reason(status: StatusCode) -> &'static str {
    status
        .canonical_reason()
        .unwrap_or("Internal Server Error")
}

/// Builder for constructing a [`Pipeline`].
pub struct PipelineBuilder<D> {
    stages: Vec<BoxedMiddleware<D>>,
    error_handler: Option<ErrorHandler<D>>,
    expose_error_details: bool,
}

impl<D> PipelineBuilder<D>
where
    D: Payload + Send + Sync + 'static,
{
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            error_handler: None,
            expose_error_details: false,
        }
    }

    /// Appends a stage. Stages run in the order they are added.
    #[must_use]
    pub fn stage<M: Middleware<D>>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Appends an already shared stage.
    #[must_use]
    pub fn shared_stage(mut self, middleware: BoxedMiddleware<D>) -> Self {
        self.stages.push(middleware);
        self
    }

    /// Sets the top-level error handler.
    #[must_use]
    pub fn error_handler<F>(mut self, handler: F) -> Self
    where
        F: for<'a> Fn(RouteError, &'a RequestHead, &'a mut RouteResponse<D>) -> BoxFuture<'a, ()>
            + Send
            + Sync
            + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Sets or clears an already shared error handler.
    #[must_use]
    pub fn shared_error_handler(mut self, handler: Option<ErrorHandler<D>>) -> Self {
        self.error_handler = handler;
        self
    }

    /// Includes error messages in default error bodies.
    #[must_use]
    pub fn expose_error_details(mut self, expose: bool) -> Self {
        self.expose_error_details = expose;
        self
    }

    /// Finishes the pipeline with its route.
    pub fn build<F>(self, route: F) -> Pipeline<D>
    where
        F: for<'a> Fn(&'a RouteRequest<D>, &'a mut RouteResponse<D>) -> BoxFuture<'a, RouteResult>
            + Send
            + Sync
            + 'static,
    {
        Pipeline {
            stages: self.stages,
            route: Arc::new(route),
            error_handler: self.error_handler,
            expose_error_details: self.expose_error_details,
        }
    }
}

impl<D> Default for PipelineBuilder<D>
where
    D: Payload + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::error_handler;
    use http::Method;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use warden_core::ValidationError;

    struct Tag(&'static str);

    impl Middleware<Value> for Tag {
        fn name(&self) -> &'static str {
            self.0
        }

        fn process<'a>(
            &'a self,
            exchange: &'a mut Exchange<Value>,
            next: Next<'a, Value>,
        ) -> BoxFuture<'a, RouteResult> {
            Box::pin(async move {
                exchange
                    .response
                    .headers_mut()
                    .append("x-stage", http::HeaderValue::from_static(self.0));
                next.run(exchange).await
            })
        }
    }

    struct Exploding;

    impl Middleware<Value> for Exploding {
        fn name(&self) -> &'static str {
            "exploding"
        }

        fn process<'a>(
            &'a self,
            _exchange: &'a mut Exchange<Value>,
            _next: Next<'a, Value>,
        ) -> BoxFuture<'a, RouteResult> {
            panic!("stage exploded")
        }
    }

    fn request() -> RouteRequest<Value> {
        RouteRequest::new(Method::GET, "/things")
    }

    fn bad_request() -> RouteError {
        ValidationError::<String>::BadRequest {
            method: Method::GET,
            url: "/things".to_string(),
            issues: vec![warden_core::RegionIssue::new("body", "nope".to_string())],
        }
        .into()
    }

    #[tokio::test]
    async fn test_stages_run_in_order() {
        let pipeline = Pipeline::<Value>::builder()
            .stage(Tag("first"))
            .stage(Tag("second"))
            .build(|_request, response| {
                Box::pin(async move {
                    response.json(json!("done")).await;
                    Ok(())
                })
            });

        assert_eq!(pipeline.stage_names(), vec!["first", "second"]);
        assert_eq!(pipeline.stage_count(), 2);

        let response = pipeline.handle(request()).await;
        let order: Vec<_> = response
            .headers()
            .get_all("x-stage")
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(order, vec!["first", "second"]);
        assert_eq!(response.emission().unwrap().body, json!("done"));
    }

    #[tokio::test]
    async fn test_default_bad_request_rendering() {
        let pipeline = Pipeline::<Value>::builder()
            .build(|_request, _response| Box::pin(async { Err(bad_request()) }));

        let response = pipeline.handle(request()).await;
        let emission = response.emission().unwrap();
        assert_eq!(emission.status, StatusCode::BAD_REQUEST);
        assert_eq!(emission.body, json!({ "message": "Bad Request" }));
    }

    #[tokio::test]
    async fn test_default_server_error_hides_details() {
        let pipeline = Pipeline::<Value>::builder().build(|_request, _response| {
            Box::pin(async { Err(RouteError::handler(anyhow::anyhow!("db password wrong"))) })
        });

        let response = pipeline.handle(request()).await;
        let emission = response.emission().unwrap();
        assert_eq!(emission.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(emission.body, json!({ "message": "Internal Server Error" }));
    }

    #[tokio::test]
    async fn test_exposed_details() {
        let pipeline = Pipeline::<Value>::builder()
            .expose_error_details(true)
            .build(|_request, _response| {
                Box::pin(async {
                    Err(ValidationError::<String>::MissingValidator {
                        method: Method::GET,
                        url: "/things".to_string(),
                    }
                    .into())
                })
            });

        let response = pipeline.handle(request()).await;
        let emission = response.emission().unwrap();
        assert_eq!(emission.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            emission.body,
            json!({ "message": "Validator not set at (GET) /things" })
        );
    }

    #[tokio::test]
    async fn test_route_panic_rendered_as_500() {
        let pipeline = Pipeline::<Value>::builder()
            .build(|_request, _response| panic!("route exploded"));

        let response = pipeline.handle(request()).await;
        assert_eq!(
            response.emission().unwrap().status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_stage_panic_rendered_as_500() {
        let pipeline = Pipeline::<Value>::builder().stage(Exploding).build(|_request, response| {
            Box::pin(async move {
                response.json(json!("unreachable")).await;
                Ok(())
            })
        });

        let response = pipeline.handle(request()).await;
        let emission = response.emission().unwrap();
        assert_eq!(emission.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_ne!(emission.body, json!("unreachable"));
    }

    #[tokio::test]
    async fn test_error_after_emission_is_only_logged() {
        let pipeline = Pipeline::<Value>::builder().build(|_request, response| {
            Box::pin(async move {
                response.json(json!({ "ok": true })).await;
                Err(RouteError::handler(anyhow::anyhow!("late failure")))
            })
        });

        let response = pipeline.handle(request()).await;
        let emission = response.emission().unwrap();
        assert_eq!(emission.status, StatusCode::OK);
        assert_eq!(emission.body, json!({ "ok": true }));
    }

    #[tokio::test]
    async fn test_custom_error_handler_receives_every_error() {
        static SEEN: AtomicUsize = AtomicUsize::new(0);

        let pipeline = Pipeline::<Value>::builder()
            .shared_error_handler(Some(error_handler(|error, _head, response| {
                Box::pin(async move {
                    SEEN.fetch_add(1, Ordering::SeqCst);
                    if !response.is_emitted() {
                        response
                            .set_status(StatusCode::IM_A_TEAPOT)
                            .json(json!({ "error": error.to_string() }))
                            .await;
                    }
                })
            })))
            .build(|_request, response| {
                Box::pin(async move {
                    response.divert(RouteError::handler(anyhow::anyhow!("diverted")));
                    Err(RouteError::handler(anyhow::anyhow!("returned")))
                })
            });

        let response = pipeline.handle(request()).await;
        assert_eq!(SEEN.load(Ordering::SeqCst), 2);
        let emission = response.emission().unwrap();
        assert_eq!(emission.status, StatusCode::IM_A_TEAPOT);
        assert_eq!(emission.body, json!({ "error": "diverted" }));
    }

    #[tokio::test]
    async fn test_panicking_error_handler_falls_back_to_default() {
        let pipeline = Pipeline::<Value>::builder()
            .error_handler(|_error, _head, _response| panic!("handler exploded"))
            .build(|_request, _response| Box::pin(async { Err(bad_request()) }));

        let response = pipeline.handle(request()).await;
        assert_eq!(
            response.emission().unwrap().status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    /// Collects formatted log lines for one test.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    #[tokio::test]
    async fn test_missing_schema_logs_its_own_warning() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .without_time()
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let pipeline = Pipeline::<Value>::builder().build(|_request, response| {
            Box::pin(async move {
                response.set_status(StatusCode::ACCEPTED);
                Err(ValidationError::<String>::MissingSchema {
                    status: StatusCode::ACCEPTED,
                    method: Method::GET,
                    url: "/things".to_string(),
                }
                .into())
            })
        });

        let response = pipeline.handle(request()).await;
        assert_eq!(
            response.emission().unwrap().status,
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let output = logs.contents();
        assert!(output.contains("WARN"), "{output}");
        assert!(
            output.contains("Missing 202 Response Validator at (GET) /things"),
            "{output}"
        );
        assert!(!output.contains("Unhandled route error"), "{output}");
    }

    #[test]
    fn test_debug_lists_stage_names() {
        let pipeline = Pipeline::<Value>::builder()
            .stage(Tag("first"))
            .stage(Tag("second"))
            .build(|_request, _response| Box::pin(async { Ok(()) }));

        let debug = format!("{pipeline:?}");
        assert!(debug.contains("Pipeline"));
        assert!(debug.contains("[\"first\", \"second\"]"), "{debug}");
        assert!(debug.contains("error_handler: false"), "{debug}");
    }
}
