//! Validated routes.
//!
//! [`RouteValidator`] composes the two validation stages around a route
//! handler and produces a ready [`Pipeline`].

use crate::config::ValidatorConfig;
use crate::middleware::BoxFuture;
use crate::pipeline::Pipeline;
use crate::request::RouteRequest;
use crate::response::RouteResponse;
use crate::stages::{RequestValidator, ResponseInterceptor};
use http::StatusCode;
use std::fmt;
use std::sync::Arc;
use warden_core::{Payload, RouteResult, Rule};

/// Builder for a validated route.
///
/// # Example
///
/// ```
/// use http::{Method, StatusCode};
/// use serde_json::{json, Value};
/// use warden_core::{adapter, Outcome};
/// use warden_middleware::{RouteRequest, RouteValidator, ValidatorConfig};
///
/// // The schema is the JSON type name the data must have.
/// let config = ValidatorConfig::builder()
///     .adapter(adapter::from_fn(|data: Value, kind: &&'static str| {
///         let ok = match *kind {
///             "object" => data.is_object(),
///             "number" => data.is_number(),
///             _ => false,
///         };
///         if ok { Outcome::Valid(data) } else { Outcome::Invalid(format!("expected {kind}")) }
///     }))
///     .build();
///
/// let route = RouteValidator::new(config)
///     .request_schema("body", "object")
///     .response_schema(StatusCode::OK, "number")
///     .route(|_request, response| {
///         Box::pin(async move {
///             response.json(json!("not a number")).await;
///             Ok(())
///         })
///     });
///
/// # tokio_test::block_on(async {
/// let request = RouteRequest::new(Method::POST, "/count").with_region("body", json!({}));
/// let response = route.handle(request).await;
/// assert_eq!(response.emission().unwrap().status, StatusCode::INTERNAL_SERVER_ERROR);
/// # });
/// ```
pub struct RouteValidator<S, D, E> {
    config: Arc<ValidatorConfig<S, D, E>>,
    request: RequestValidator<S, D, E>,
    response: ResponseInterceptor<S, D, E>,
}

impl<S, D, E> RouteValidator<S, D, E>
where
    S: Send + Sync + 'static,
    D: Send + 'static,
    E: Send + 'static,
{
    /// Creates a route validator with no per-route rules.
    ///
    /// The configuration's global response rules apply from the start.
    pub fn new(config: Arc<ValidatorConfig<S, D, E>>) -> Self {
        Self {
            request: RequestValidator::new(Arc::clone(&config)),
            response: ResponseInterceptor::new(Arc::clone(&config)),
            config,
        }
    }

    /// Adds a request rule for a region.
    #[must_use]
    pub fn request_rule(mut self, region: impl Into<String>, rule: Rule<S, D, E>) -> Self {
        self.request = self.request.rule(region, rule);
        self
    }

    /// Adds a request schema for a region.
    #[must_use]
    pub fn request_schema(self, region: impl Into<String>, schema: S) -> Self {
        self.request_rule(region, Rule::schema(schema))
    }

    /// Adds a request schema for every region in `schemas`.
    #[must_use]
    pub fn request<I, K>(self, schemas: I) -> Self
    where
        I: IntoIterator<Item = (K, S)>,
        K: Into<String>,
    {
        schemas
            .into_iter()
            .fold(self, |route, (region, schema)| route.request_schema(region, schema))
    }

    /// Adds a response rule for a status code, overriding any global rule.
    #[must_use]
    pub fn response_rule(mut self, status: StatusCode, rule: Rule<S, D, E>) -> Self {
        self.response = self.response.rule(status, rule);
        self
    }

    /// Adds a response schema for a status code.
    #[must_use]
    pub fn response_schema(self, status: StatusCode, schema: S) -> Self {
        self.response_rule(status, Rule::schema(schema))
    }

    /// Adds a response schema for every status code in `schemas`.
    #[must_use]
    pub fn response<I>(self, schemas: I) -> Self
    where
        I: IntoIterator<Item = (StatusCode, S)>,
    {
        schemas
            .into_iter()
            .fold(self, |route, (status, schema)| route.response_schema(status, schema))
    }

    /// Splits the validator into its two stages, for use in a hand-built
    /// pipeline.
    pub fn into_stages(self) -> (ResponseInterceptor<S, D, E>, RequestValidator<S, D, E>) {
        (self.response, self.request)
    }
}

impl<S, D, E> RouteValidator<S, D, E>
where
    S: Send + Sync + 'static,
    D: Payload + Clone + Send + Sync + 'static,
    E: fmt::Debug + Send + Sync + 'static,
{
    /// Finishes the route with its handler.
    ///
    /// The pipeline uses the configuration's error handler and
    /// `expose_error_details` setting.
    pub fn route<F>(self, handler: F) -> Pipeline<D>
    where
        F: for<'a> Fn(&'a RouteRequest<D>, &'a mut RouteResponse<D>) -> BoxFuture<'a, RouteResult>
            + Send
            + Sync
            + 'static,
    {
        Pipeline::builder()
            .stage(self.response)
            .stage(self.request)
            .shared_error_handler(self.config.error_handler().cloned())
            .expose_error_details(self.config.settings().expose_error_details)
            .build(handler)
    }
}

impl<S, D, E> fmt::Debug for RouteValidator<S, D, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteValidator")
            .field("request", &self.request)
            .field("response", &self.response)
            .finish_non_exhaustive()
    }
}
