//! Validator configuration.
//!
//! A [`ValidatorConfig`] is built once and shared by reference with every
//! middleware constructed from it. It cannot be changed afterwards; a new
//! configuration means building new middleware.

use crate::handlers::{ErrorHandler, ValidationHandler};
use crate::middleware::BoxFuture;
use crate::request::RequestHead;
use crate::response::RouteResponse;
use http::StatusCode;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use warden_core::{
    Adapter, DynAdapter, RouteError, RouteResult, Rule, StatusRange, ValidationError,
    ValidationSettings,
};

/// Immutable validator configuration.
///
/// # Type Parameters
///
/// - `S`: The schema type
/// - `D`: The data type (request regions and response bodies)
/// - `E`: The adapter error type
///
/// # Example
///
/// ```
/// use http::StatusCode;
/// use serde_json::Value;
/// use warden_core::{adapter, Outcome, Rule};
/// use warden_middleware::ValidatorConfig;
///
/// // The "schema" is the JSON type name the data must have.
/// let config = ValidatorConfig::builder()
///     .adapter(adapter::from_fn(|data: Value, kind: &&'static str| {
///         let ok = match *kind {
///             "number" => data.is_number(),
///             "string" => data.is_string(),
///             _ => false,
///         };
///         if ok { Outcome::Valid(data) } else { Outcome::Invalid(format!("expected {kind}")) }
///     }))
///     .require_validator(true)
///     .global_response_rule(StatusCode::NOT_FOUND, Rule::schema("string"))
///     .build();
///
/// assert!(config.adapter().is_some());
/// assert!(config.settings().require_validator);
/// ```
pub struct ValidatorConfig<S, D, E> {
    adapter: Option<DynAdapter<S, D, E>>,
    settings: ValidationSettings,
    bad_request_handler: Option<ValidationHandler<D, E>>,
    bad_response_handler: Option<ValidationHandler<D, E>>,
    missing_schema_handler: Option<ValidationHandler<D, E>>,
    error_handler: Option<ErrorHandler<D>>,
    global_response_rules: HashMap<StatusCode, Rule<S, D, E>>,
}

impl<S, D, E> ValidatorConfig<S, D, E>
where
    S: Send + Sync + 'static,
    D: Send + 'static,
    E: Send + 'static,
{
    /// Creates a configuration builder.
    pub fn builder() -> ValidatorConfigBuilder<S, D, E> {
        ValidatorConfigBuilder::new()
    }

    /// Returns the adapter, if one was configured.
    pub fn adapter(&self) -> Option<&DynAdapter<S, D, E>> {
        self.adapter.as_ref()
    }

    /// Returns the serialisable settings.
    pub fn settings(&self) -> &ValidationSettings {
        &self.settings
    }

    /// Returns the bad-request handler.
    pub fn bad_request_handler(&self) -> Option<&ValidationHandler<D, E>> {
        self.bad_request_handler.as_ref()
    }

    /// Returns the bad-response handler.
    pub fn bad_response_handler(&self) -> Option<&ValidationHandler<D, E>> {
        self.bad_response_handler.as_ref()
    }

    /// Returns the missing-schema handler.
    pub fn missing_schema_handler(&self) -> Option<&ValidationHandler<D, E>> {
        self.missing_schema_handler.as_ref()
    }

    /// Returns the top-level error handler.
    pub fn error_handler(&self) -> Option<&ErrorHandler<D>> {
        self.error_handler.as_ref()
    }

    /// Returns the global response rules.
    pub fn global_response_rules(&self) -> &HashMap<StatusCode, Rule<S, D, E>> {
        &self.global_response_rules
    }
}

impl<S, D, E> fmt::Debug for ValidatorConfig<S, D, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut global: Vec<u16> = self
            .global_response_rules
            .keys()
            .map(StatusCode::as_u16)
            .collect();
        global.sort_unstable();

        f.debug_struct("ValidatorConfig")
            .field("adapter", &self.adapter.is_some())
            .field("settings", &self.settings)
            .field("bad_request_handler", &self.bad_request_handler.is_some())
            .field("bad_response_handler", &self.bad_response_handler.is_some())
            .field("missing_schema_handler", &self.missing_schema_handler.is_some())
            .field("error_handler", &self.error_handler.is_some())
            .field("global_response_rules", &global)
            .finish()
    }
}

/// Builder for [`ValidatorConfig`].
pub struct ValidatorConfigBuilder<S, D, E> {
    config: ValidatorConfig<S, D, E>,
}

impl<S, D, E> ValidatorConfigBuilder<S, D, E>
where
    S: Send + Sync + 'static,
    D: Send + 'static,
    E: Send + 'static,
{
    /// Creates a builder with default settings and no adapter.
    pub fn new() -> Self {
        Self {
            config: ValidatorConfig {
                adapter: None,
                settings: ValidationSettings::default(),
                bad_request_handler: None,
                bad_response_handler: None,
                missing_schema_handler: None,
                error_handler: None,
                global_response_rules: HashMap::new(),
            },
        }
    }

    /// Sets the adapter.
    #[must_use]
    pub fn adapter<A: Adapter<S, D, E>>(mut self, adapter: A) -> Self {
        self.config.adapter = Some(Arc::new(adapter));
        self
    }

    /// Sets an already shared adapter.
    #[must_use]
    pub fn shared_adapter(mut self, adapter: DynAdapter<S, D, E>) -> Self {
        self.config.adapter = Some(adapter);
        self
    }

    /// Replaces all serialisable settings, e.g. with values loaded from a file.
    #[must_use]
    pub fn settings(mut self, settings: ValidationSettings) -> Self {
        self.config.settings = settings;
        self
    }

    /// Sets where validated request regions are written.
    #[must_use]
    pub fn validated_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.settings.validated_namespace = namespace.into();
        self
    }

    /// Treats a status code without a response rule as an error.
    #[must_use]
    pub fn require_validator(mut self, require: bool) -> Self {
        self.config.settings.require_validator = require;
        self
    }

    /// Sets the status codes emitted without validation.
    #[must_use]
    pub fn exempt_statuses(mut self, range: Option<StatusRange>) -> Self {
        self.config.settings.exempt_statuses = range;
        self
    }

    /// Sets the status passed through while a bad-request handler responds.
    #[must_use]
    pub fn bad_request_bypass(mut self, status: Option<StatusCode>) -> Self {
        self.config.settings.bad_request_bypass = status.map(|s| s.as_u16());
        self
    }

    /// Includes error messages in default 5xx bodies.
    #[must_use]
    pub fn expose_error_details(mut self, expose: bool) -> Self {
        self.config.settings.expose_error_details = expose;
        self
    }

    /// Sets the handler for requests that fail validation.
    #[must_use]
    pub fn bad_request_handler<F>(mut self, handler: F) -> Self
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
        self.config.bad_request_handler = Some(Arc::new(handler));
        self
    }

    /// Sets the handler for response bodies that fail validation.
    #[must_use]
    pub fn bad_response_handler<F>(mut self, handler: F) -> Self
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
        self.config.bad_response_handler = Some(Arc::new(handler));
        self
    }

    /// Sets the handler for status codes without a response rule, used when
    /// `require_validator` is set.
    #[must_use]
    pub fn missing_schema_handler<F>(mut self, handler: F) -> Self
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
        self.config.missing_schema_handler = Some(Arc::new(handler));
        self
    }

    /// Sets the top-level error handler used by routes built from this
    /// configuration.
    #[must_use]
    pub fn error_handler<F>(mut self, handler: F) -> Self
    where
        F: for<'a> Fn(RouteError, &'a RequestHead, &'a mut RouteResponse<D>) -> BoxFuture<'a, ()>
            + Send
            + Sync
            + 'static,
    {
        self.config.error_handler = Some(Arc::new(handler));
        self
    }

    /// Adds a global response rule. Per-route rules for the same status win.
    #[must_use]
    pub fn global_response_rule(mut self, status: StatusCode, rule: Rule<S, D, E>) -> Self {
        self.config.global_response_rules.insert(status, rule);
        self
    }

    /// Adds a global response schema.
    #[must_use]
    pub fn global_response_schema(self, status: StatusCode, schema: S) -> Self {
        self.global_response_rule(status, Rule::schema(schema))
    }

    /// Finishes the configuration.
    pub fn build(self) -> Arc<ValidatorConfig<S, D, E>> {
        Arc::new(self.config)
    }
}

impl<S, D, E> Default for ValidatorConfigBuilder<S, D, E>
where
    S: Send + Sync + 'static,
    D: Send + 'static,
    E: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use warden_core::{adapter, Outcome};

    type Config = ValidatorConfig<u8, Value, String>;

    #[test]
    fn test_defaults() {
        let config = Config::builder().build();
        assert!(config.adapter().is_none());
        assert_eq!(config.settings(), &ValidationSettings::default());
        assert!(config.bad_request_handler().is_none());
        assert!(config.bad_response_handler().is_none());
        assert!(config.missing_schema_handler().is_none());
        assert!(config.error_handler().is_none());
        assert!(config.global_response_rules().is_empty());
    }

    #[test]
    fn test_builder_settings() {
        let config = Config::builder()
            .adapter(adapter::from_fn(|data: Value, _schema: &u8| {
                Outcome::<Value, String>::Valid(data)
            }))
            .validated_namespace("checked")
            .require_validator(true)
            .exempt_statuses(None)
            .bad_request_bypass(Some(StatusCode::UNPROCESSABLE_ENTITY))
            .expose_error_details(true)
            .global_response_schema(StatusCode::OK, 1)
            .build();

        let settings = config.settings();
        assert!(config.adapter().is_some());
        assert_eq!(settings.validated_namespace, "checked");
        assert!(settings.require_validator);
        assert!(settings.exempt_statuses.is_none());
        assert_eq!(settings.bad_request_bypass, Some(422));
        assert!(settings.expose_error_details);
        assert!(config.global_response_rules().contains_key(&StatusCode::OK));
    }

    #[test]
    fn test_debug_lists_global_statuses() {
        let config = Config::builder()
            .global_response_schema(StatusCode::NOT_FOUND, 2)
            .global_response_schema(StatusCode::OK, 1)
            .build();
        let debug = format!("{config:?}");
        assert!(debug.contains("global_response_rules: [200, 404]"));
    }
}
