//! # Warden Middleware
//!
//! Request and response validation middleware for Warden.
//!
//! ## Flow
//!
//! ```text
//! Request → ResponseInterceptor (arm) → RequestValidator → Route
//!                                                            ↓ emit
//! Response ← transport ← ResponseInterceptor (validate) ←────┘
//! ```
//!
//! | Stage | Middleware            | Purpose                                      |
//! |-------|-----------------------|----------------------------------------------|
//! | 1     | Response interceptor  | Validate the first emitted body by status    |
//! | 2     | Request validator     | Validate request regions before the route    |
//!
//! Errors travel on the continuation/error channel: a middleware returns
//! `Err(RouteError)`, or an interceptor diverts it onto the response. The
//! [`Pipeline`] drains that channel after the chain has finished and hands
//! each error to the top-level error handler.
//!
//! ## Example
//!
//! ```
//! use http::{Method, StatusCode};
//! use serde_json::{json, Value};
//! use warden_core::{adapter, Outcome};
//! use warden_middleware::{RouteRequest, RouteValidator, ValidatorConfig};
//!
//! fn trimmed(data: Value, _schema: &()) -> Outcome<Value, String> {
//!     match data.get("username").and_then(Value::as_str) {
//!         Some(name) => Outcome::Valid(json!({ "username": name.replace(' ', "-") })),
//!         None => Outcome::Invalid("username is required".to_string()),
//!     }
//! }
//!
//! let config = ValidatorConfig::builder().adapter(adapter::from_fn(trimmed)).build();
//! let route = RouteValidator::new(config)
//!     .request_schema("body", ())
//!     .route(|request, response| {
//!         Box::pin(async move {
//!             let body = request.validated_region("validated", "body").cloned();
//!             response.json(body.unwrap_or_default()).await;
//!             Ok(())
//!         })
//!     });
//!
//! # tokio_test::block_on(async {
//! let request = RouteRequest::new(Method::POST, "/users")
//!     .with_region("body", json!({ "username": "first last" }));
//! let response = route.handle(request).await;
//! assert_eq!(response.emission().unwrap().body, json!({ "username": "first-last" }));
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/warden-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod bridge;
pub mod config;
pub mod exchange;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod route;
pub mod stages;

// Re-export main types at crate root
pub use bridge::{BridgeError, REQUEST_ID_HEADER};
pub use config::{ValidatorConfig, ValidatorConfigBuilder};
pub use exchange::Exchange;
pub use handlers::{ErrorHandler, ValidationHandler};
pub use middleware::{BoxFuture, Middleware, Next, Route};
pub use pipeline::{BoxedMiddleware, Pipeline, PipelineBuilder};
pub use request::{RequestHead, RouteRequest};
pub use response::{Emission, Emit, EmitHooks, EmitKind, Interceptor, RouteResponse, Teardown};
pub use route::RouteValidator;
pub use stages::{RequestValidator, ResponseInterceptor};
