//! Request validation stage.
//!
//! Validates named request regions against per-region rules before the route
//! runs.
//!
//! # Algorithm
//!
//! 1. Every region in the rule map is checked in order. A region the request
//!    does not carry is skipped; absence is not a failure.
//! 2. Each present region is run through its rule. Failures are collected and
//!    checking continues, so one report covers every failing region.
//! 3. If anything failed, a [`ValidationError::BadRequest`] carrying all
//!    failures goes to the bad-request handler, or to the error channel when
//!    none is configured. The route is not run.
//! 4. Otherwise the validated values are written under the configured
//!    namespace, grouped by region name, and the chain proceeds.
//!
//! The namespace is only written on full success; a failed request is never
//! partially updated.

use crate::config::ValidatorConfig;
use crate::exchange::Exchange;
use crate::handlers::run_validation_handler;
use crate::metrics;
use crate::middleware::{BoxFuture, Middleware, Next};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use warden_core::{Outcome, RegionIssue, RouteError, RouteResult, Rule, ValidationError};

/// Middleware validating request regions.
///
/// # Example
///
/// ```
/// use serde_json::Value;
/// use warden_core::{adapter, Outcome};
/// use warden_middleware::{RequestValidator, ValidatorConfig};
///
/// let config = ValidatorConfig::builder()
///     .adapter(adapter::from_fn(|data: Value, required: &&'static str| {
///         if data.get(*required).is_some() {
///             Outcome::Valid(data)
///         } else {
///             Outcome::Invalid(format!("missing {required}"))
///         }
///     }))
///     .build();
///
/// let validator = RequestValidator::new(config)
///     .schema("body", "username")
///     .schema("params", "id");
/// assert_eq!(validator.regions().collect::<Vec<_>>(), ["body", "params"]);
/// ```
pub struct RequestValidator<S, D, E> {
    config: Arc<ValidatorConfig<S, D, E>>,
    rules: IndexMap<String, Rule<S, D, E>>,
}

impl<S, D, E> RequestValidator<S, D, E>
where
    S: Send + Sync + 'static,
    D: Send + 'static,
    E: Send + 'static,
{
    /// Creates a validator with no rules.
    pub fn new(config: Arc<ValidatorConfig<S, D, E>>) -> Self {
        Self {
            config,
            rules: IndexMap::new(),
        }
    }

    /// Adds a rule for a region.
    #[must_use]
    pub fn rule(mut self, region: impl Into<String>, rule: Rule<S, D, E>) -> Self {
        self.rules.insert(region.into(), rule);
        self
    }

    /// Adds a schema for a region.
    #[must_use]
    pub fn schema(self, region: impl Into<String>, schema: S) -> Self {
        self.rule(region, Rule::schema(schema))
    }

    /// Returns the region names in checking order.
    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    fn needs_adapter(&self) -> bool {
        self.config.adapter().is_none() && self.rules.values().any(Rule::needs_adapter)
    }
}

impl<S, D, E> fmt::Debug for RequestValidator<S, D, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestValidator")
            .field("regions", &self.rules.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<S, D, E> Middleware<D> for RequestValidator<S, D, E>
where
    S: Send + Sync + 'static,
    D: Clone + Send + Sync + 'static,
    E: fmt::Debug + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "request_validation"
    }

    fn process<'a>(
        &'a self,
        exchange: &'a mut Exchange<D>,
        next: Next<'a, D>,
    ) -> BoxFuture<'a, RouteResult> {
        Box::pin(async move {
            let head = exchange.request.head().clone();

            if self.needs_adapter() {
                tracing::warn!(
                    request_id = %head.request_id(),
                    http.method = %head.method(),
                    http.path = head.url(),
                    "Request validation attempted without an adapter"
                );
                return Err(ValidationError::<E>::MissingValidator {
                    method: head.method().clone(),
                    url: head.url().to_string(),
                }
                .into());
            }

            let adapter = self.config.adapter();
            let mut validated = IndexMap::with_capacity(self.rules.len());
            let mut issues = Vec::new();

            for (region, rule) in &self.rules {
                let Some(value) = exchange.request.region(region).cloned() else {
                    tracing::trace!(region = %region, "Region absent, skipping");
                    continue;
                };

                let Some(check) = rule.run(adapter, value) else {
                    return Err(ValidationError::<E>::MissingValidator {
                        method: head.method().clone(),
                        url: head.url().to_string(),
                    }
                    .into());
                };

                match check.await {
                    Ok(Outcome::Valid(value)) => {
                        validated.insert(region.clone(), value);
                    }
                    Ok(Outcome::Invalid(error)) => {
                        metrics::record_request_failure(region);
                        issues.push(RegionIssue::new(region.clone(), error));
                    }
                    Err(fault) => {
                        tracing::error!(
                            request_id = %head.request_id(),
                            region = %region,
                            error = %fault,
                            "Adapter fault during request validation"
                        );
                        return Err(RouteError::from(fault));
                    }
                }
            }

            if !issues.is_empty() {
                tracing::debug!(
                    request_id = %head.request_id(),
                    http.method = %head.method(),
                    http.path = head.url(),
                    regions = issues.len(),
                    "Request failed validation"
                );

                let error = ValidationError::BadRequest {
                    method: head.method().clone(),
                    url: head.url().to_string(),
                    issues,
                };

                return match self.config.bad_request_handler() {
                    Some(handler) => {
                        let response = &mut exchange.response;
                        response.set_bad_request_active(true);
                        let result = run_validation_handler(handler, error, &head, response).await;
                        response.set_bad_request_active(false);
                        result
                    }
                    None => Err(error.into()),
                };
            }

            let namespace = &self.config.settings().validated_namespace;
            exchange.request.set_validated(namespace.clone(), validated);
            next.run(exchange).await
        })
    }
}
