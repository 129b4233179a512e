//! Response validation stage.
//!
//! The [`ResponseInterceptor`] installs an interception layer on the response
//! before the rest of the chain runs. The first emit call that reaches the
//! layer is validated against the rule registered for the response's status
//! code *at the moment of emission*.
//!
//! # States
//!
//! ```text
//!            install                 emit (restore first)
//!  (none) ───────────► ARMED ─────────────────────────────► FIRED
//!                        │                                    │
//!                        │ chain returns without emitting     ├─ exempt / bypass ─► forward unchanged
//!                        ▼                                    ├─ no rule ─────────► forward, or MissingSchema
//!                     restored                                ├─ valid ───────────► forward validated body
//!                                                             ├─ invalid ─────────► BadResponse
//!                                                             └─ adapter fault ───► error channel
//! ```
//!
//! The layer is restored before validation starts, so an emit issued from a
//! handler while the interceptor is running reaches the transport directly
//! and never re-enters validation. Once the chain returns, the layer is
//! removed whether or not anything was emitted.

use crate::config::ValidatorConfig;
use crate::exchange::Exchange;
use crate::handlers::{run_validation_handler, ValidationHandler};
use crate::metrics::{self, ResponseOutcome};
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::request::RequestHead;
use crate::response::{Emit, EmitHooks, Interceptor, RouteResponse, Teardown};
use http::StatusCode;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use warden_core::{Outcome, RouteError, RouteResult, Rule, ValidationError};

/// Middleware validating emitted response bodies by status code.
///
/// Rules start out as a copy of the configuration's global response rules;
/// rules added with [`ResponseInterceptor::rule`] override them per status.
pub struct ResponseInterceptor<S, D, E> {
    config: Arc<ValidatorConfig<S, D, E>>,
    rules: Arc<HashMap<StatusCode, Rule<S, D, E>>>,
}

impl<S, D, E> ResponseInterceptor<S, D, E>
where
    S: Send + Sync + 'static,
    D: Send + 'static,
    E: Send + 'static,
{
    /// Creates an interceptor holding only the global rules.
    pub fn new(config: Arc<ValidatorConfig<S, D, E>>) -> Self {
        let rules = Arc::new(config.global_response_rules().clone());
        Self { config, rules }
    }

    /// Adds a rule for a status code, replacing any global rule for it.
    #[must_use]
    pub fn rule(mut self, status: StatusCode, rule: Rule<S, D, E>) -> Self {
        Arc::make_mut(&mut self.rules).insert(status, rule);
        self
    }

    /// Adds a schema for a status code.
    #[must_use]
    pub fn schema(self, status: StatusCode, schema: S) -> Self {
        self.rule(status, Rule::schema(schema))
    }

    /// Returns the rule that applies to `status`.
    pub fn rule_for(&self, status: StatusCode) -> Option<&Rule<S, D, E>> {
        self.rules.get(&status)
    }

    fn needs_adapter(&self) -> bool {
        self.config.adapter().is_none() && self.rules.values().any(Rule::needs_adapter)
    }
}

impl<S, D, E> fmt::Debug for ResponseInterceptor<S, D, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut statuses: Vec<u16> = self.rules.keys().map(StatusCode::as_u16).collect();
        statuses.sort_unstable();
        f.debug_struct("ResponseInterceptor")
            .field("statuses", &statuses)
            .finish_non_exhaustive()
    }
}

impl<S, D, E> Middleware<D> for ResponseInterceptor<S, D, E>
where
    S: Send + Sync + 'static,
    D: Send + Sync + 'static,
    E: fmt::Debug + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "response_validation"
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
                    "Response validation attempted without an adapter"
                );
                return Err(ValidationError::<E>::MissingValidator {
                    method: head.method().clone(),
                    url: head.url().to_string(),
                }
                .into());
            }

            let guard = EmitGuard {
                config: Arc::clone(&self.config),
                rules: Arc::clone(&self.rules),
                head,
            };
            let teardown = exchange.response.install(EmitHooks::all(Arc::new(guard)));

            let result = next.run(exchange).await;

            if exchange.response.restore(teardown) {
                tracing::trace!(
                    request_id = %exchange.request.request_id(),
                    "Chain finished without emitting; interceptor removed"
                );
            }
            result
        })
    }
}

/// The interceptor installed for one exchange.
struct EmitGuard<S, D, E> {
    config: Arc<ValidatorConfig<S, D, E>>,
    rules: Arc<HashMap<StatusCode, Rule<S, D, E>>>,
    head: RequestHead,
}

impl<S, D, E> EmitGuard<S, D, E>
where
    S: Send + Sync + 'static,
    D: Send + Sync + 'static,
    E: fmt::Debug + Send + Sync + 'static,
{
    /// Offers an error to its handler, or diverts it.
    async fn dispatch(
        &self,
        handler: Option<&ValidationHandler<D, E>>,
        error: ValidationError<E>,
        response: &mut RouteResponse<D>,
    ) {
        match handler {
            Some(handler) => {
                if let Err(failure) =
                    run_validation_handler(handler, error, &self.head, response).await
                {
                    response.divert(failure);
                }
            }
            None => response.divert(error.into()),
        }
    }
}

impl<S, D, E> Interceptor<D> for EmitGuard<S, D, E>
where
    S: Send + Sync + 'static,
    D: Send + Sync + 'static,
    E: fmt::Debug + Send + Sync + 'static,
{
    fn intercept<'a>(
        &'a self,
        response: &'a mut RouteResponse<D>,
        layer: Teardown,
        emit: Emit<D>,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            response.restore(layer);

            let status = response.status();
            let code = status.as_u16();
            let settings = self.config.settings();

            if settings.is_exempt(status)
                || (response.is_bad_request_active() && settings.is_bad_request_bypass(status))
            {
                metrics::record_response(code, ResponseOutcome::Exempt);
                response.emit(emit).await;
                return;
            }

            let Some(rule) = self.rules.get(&status) else {
                metrics::record_response(code, ResponseOutcome::Unchecked);
                if !settings.require_validator {
                    response.emit(emit).await;
                    return;
                }
                tracing::debug!(
                    request_id = %self.head.request_id(),
                    http.status_code = code,
                    "No response rule for status"
                );
                let error = ValidationError::MissingSchema {
                    status,
                    method: self.head.method().clone(),
                    url: self.head.url().to_string(),
                };
                self.dispatch(self.config.missing_schema_handler(), error, response)
                    .await;
                return;
            };

            let kind = emit.kind;
            let Some(check) = rule.run(self.config.adapter(), emit.body) else {
                metrics::record_response(code, ResponseOutcome::Fault);
                response.divert(
                    ValidationError::<E>::MissingValidator {
                        method: self.head.method().clone(),
                        url: self.head.url().to_string(),
                    }
                    .into(),
                );
                return;
            };

            match check.await {
                Ok(Outcome::Valid(body)) => {
                    metrics::record_response(code, ResponseOutcome::Valid);
                    response.emit(Emit::new(kind, body)).await;
                }
                Ok(Outcome::Invalid(error)) => {
                    metrics::record_response(code, ResponseOutcome::Invalid);
                    tracing::debug!(
                        request_id = %self.head.request_id(),
                        http.status_code = code,
                        error = ?error,
                        "Response failed validation"
                    );
                    let error = ValidationError::BadResponse {
                        status,
                        method: self.head.method().clone(),
                        url: self.head.url().to_string(),
                        error,
                    };
                    self.dispatch(self.config.bad_response_handler(), error, response)
                        .await;
                }
                Err(fault) => {
                    metrics::record_response(code, ResponseOutcome::Fault);
                    tracing::error!(
                        request_id = %self.head.request_id(),
                        http.status_code = code,
                        error = %fault,
                        "Adapter fault during response validation"
                    );
                    response.divert(RouteError::from(fault));
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RouteRequest;
    use http::Method;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use warden_core::{adapter, AdapterFault, ValidationErrorKind};

    /// Test schemas are plain functions.
    type Schema = fn(Value) -> Result<Value, String>;
    type Config = ValidatorConfig<Schema, Value, String>;
    type Stage = ResponseInterceptor<Schema, Value, String>;

    static ADAPTER_CALLS: AtomicUsize = AtomicUsize::new(0);

    fn config() -> crate::config::ValidatorConfigBuilder<Schema, Value, String> {
        Config::builder().adapter(adapter::from_fn(|data: Value, schema: &Schema| {
            Outcome::from(schema(data))
        }))
    }

    fn number(data: Value) -> Result<Value, String> {
        if data.is_number() {
            Ok(data)
        } else {
            Err(format!("expected a number, got {data}"))
        }
    }

    fn without_password(mut data: Value) -> Result<Value, String> {
        match data.as_object_mut() {
            Some(user) => {
                user.remove("password");
                Ok(data)
            }
            None => Err("expected an object".to_string()),
        }
    }

    fn counted(data: Value) -> Result<Value, String> {
        ADAPTER_CALLS.fetch_add(1, Ordering::SeqCst);
        Ok(data)
    }

    fn exchange() -> Exchange<Value> {
        Exchange::new(RouteRequest::new(Method::GET, "/users/1"))
    }

    async fn run<R>(interceptor: &Stage, route: R) -> (Exchange<Value>, RouteResult)
    where
        R: for<'a> Fn(&'a RouteRequest<Value>, &'a mut RouteResponse<Value>) -> BoxFuture<'a, RouteResult>
            + Send
            + Sync
            + 'static,
    {
        let mut exchange = exchange();
        let result = Next::new(interceptor, Next::route(&route))
            .run(&mut exchange)
            .await;
        (exchange, result)
    }

    fn emits(
        status: StatusCode,
        body: Value,
    ) -> impl for<'r> Fn(&'r RouteRequest<Value>, &'r mut RouteResponse<Value>) -> BoxFuture<'r, RouteResult>
           + Send
           + Sync
           + 'static {
        move |_request, response| {
            let body = body.clone();
            Box::pin(async move {
                response.set_status(status).json(body).await;
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn test_validated_body_forwarded() {
        let interceptor =
            Stage::new(config().build()).schema(StatusCode::OK, without_password as Schema);
        let (exchange, result) = run(
            &interceptor,
            emits(StatusCode::OK, json!({ "name": "ada", "password": "hunter2" })),
        )
        .await;

        result.unwrap();
        let emission = exchange.response.emission().unwrap();
        assert_eq!(emission.status, StatusCode::OK);
        assert_eq!(emission.body, json!({ "name": "ada" }));
        assert_eq!(exchange.response.installed_layers(), 0);
    }

    #[tokio::test]
    async fn test_invalid_body_diverted() {
        let interceptor =
            Stage::new(config().build()).schema(StatusCode::OK, number as Schema);
        let (mut exchange, result) =
            run(&interceptor, emits(StatusCode::OK, json!("not a number"))).await;

        result.unwrap();
        assert!(!exchange.response.is_emitted());
        let diverted = exchange.response.take_diverted();
        assert_eq!(diverted.len(), 1);
        assert_eq!(diverted[0].kind(), Some(ValidationErrorKind::BadResponse));
        let typed = diverted[0].validation_error::<String>().unwrap();
        assert_eq!(typed.response_status(), Some(StatusCode::OK));
        assert!(typed.adapter_error().unwrap().contains("expected a number"));
    }

    #[tokio::test]
    async fn test_bad_response_handler_emits_directly() {
        let config = config()
            .bad_response_handler(|_error, _head, response| {
                Box::pin(async move {
                    response.send_status(StatusCode::INTERNAL_SERVER_ERROR).await;
                    Ok(())
                })
            })
            .build();
        let interceptor = Stage::new(config).schema(StatusCode::OK, number as Schema);
        let (exchange, result) = run(&interceptor, emits(StatusCode::OK, json!("text"))).await;

        result.unwrap();
        let emission = exchange.response.emission().unwrap();
        assert_eq!(emission.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(emission.body, json!(500));
        assert!(exchange.response.diverted().is_empty());
    }

    #[tokio::test]
    async fn test_bad_response_handler_panic_diverted() {
        let config = config()
            .bad_response_handler(|_error, _head, _response| panic!("renderer crashed"))
            .build();
        let interceptor = Stage::new(config).schema(StatusCode::OK, number as Schema);
        let (exchange, result) = run(&interceptor, emits(StatusCode::OK, json!("text"))).await;

        result.unwrap();
        assert!(!exchange.response.is_emitted());
        assert!(matches!(
            exchange.response.diverted(),
            [RouteError::Panic(msg)] if msg == "renderer crashed"
        ));
    }

    #[tokio::test]
    async fn test_exempt_status_bypasses_validation() {
        let interceptor = Stage::new(config().require_validator(true).build());
        let (exchange, result) = run(
            &interceptor,
            emits(StatusCode::NOT_IMPLEMENTED, json!({ "todo": true })),
        )
        .await;

        result.unwrap();
        let emission = exchange.response.emission().unwrap();
        assert_eq!(emission.status, StatusCode::NOT_IMPLEMENTED);
        assert_eq!(emission.body, json!({ "todo": true }));
    }

    #[tokio::test]
    async fn test_exemption_can_be_disabled() {
        let interceptor =
            Stage::new(config().require_validator(true).exempt_statuses(None).build());
        let (exchange, result) = run(
            &interceptor,
            emits(StatusCode::INTERNAL_SERVER_ERROR, json!("boom")),
        )
        .await;

        result.unwrap();
        assert!(!exchange.response.is_emitted());
        assert_eq!(
            exchange.response.diverted()[0].kind(),
            Some(ValidationErrorKind::MissingSchema)
        );
    }

    #[tokio::test]
    async fn test_missing_rule_passes_through_by_default() {
        let interceptor =
            Stage::new(config().build()).schema(StatusCode::OK, number as Schema);
        let (exchange, result) =
            run(&interceptor, emits(StatusCode::CREATED, json!("anything"))).await;

        result.unwrap();
        assert_eq!(exchange.response.emission().unwrap().body, json!("anything"));
    }

    #[tokio::test]
    async fn test_missing_rule_required() {
        let interceptor = Stage::new(config().require_validator(true).build());
        let (exchange, result) = run(&interceptor, emits(StatusCode::OK, json!(1))).await;

        result.unwrap();
        assert!(!exchange.response.is_emitted());
        let error = &exchange.response.diverted()[0];
        assert_eq!(
            error.to_string(),
            "Response of 200 is missing a validation schema at (GET) /users/1"
        );
    }

    #[tokio::test]
    async fn test_missing_schema_handler() {
        let config = config()
            .require_validator(true)
            .missing_schema_handler(|error, head, response| {
                Box::pin(async move {
                    let message = format!("{} {}", head.method(), error);
                    response
                        .set_status(StatusCode::INTERNAL_SERVER_ERROR)
                        .json(json!({ "message": message }))
                        .await;
                    Ok(())
                })
            })
            .build();
        let interceptor = Stage::new(config);
        let (exchange, result) = run(&interceptor, emits(StatusCode::ACCEPTED, json!(1))).await;

        result.unwrap();
        let emission = exchange.response.emission().unwrap();
        assert_eq!(emission.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(emission.body["message"]
            .as_str()
            .unwrap()
            .starts_with("GET Response of 202"));
    }

    #[tokio::test]
    async fn test_send_status_keyed_by_new_status() {
        let interceptor =
            Stage::new(config().build()).schema(StatusCode::NO_CONTENT, number as Schema);
        let (exchange, result) = run(&interceptor, |_request, response| {
            Box::pin(async move {
                response.send_status(StatusCode::NO_CONTENT).await;
                Ok(())
            })
        })
        .await;

        result.unwrap();
        let emission = exchange.response.emission().unwrap();
        assert_eq!(emission.status, StatusCode::NO_CONTENT);
        assert_eq!(emission.body, json!(204));
    }

    #[tokio::test]
    async fn test_second_emit_skips_validation() {
        let interceptor =
            Stage::new(config().build()).schema(StatusCode::OK, counted as Schema);
        let before = ADAPTER_CALLS.load(Ordering::SeqCst);
        let (exchange, result) = run(&interceptor, |_request, response| {
            Box::pin(async move {
                response.json(json!("first")).await;
                response.json(json!("second")).await;
                Ok(())
            })
        })
        .await;

        result.unwrap();
        assert_eq!(ADAPTER_CALLS.load(Ordering::SeqCst) - before, 1);
        assert_eq!(exchange.response.emission().unwrap().body, json!("first"));
    }

    #[tokio::test]
    async fn test_route_error_restores_without_emitting() {
        let interceptor =
            Stage::new(config().build()).schema(StatusCode::OK, number as Schema);
        let (exchange, result) = run(&interceptor, |_request, _response| {
            Box::pin(async {
                tokio::task::yield_now().await;
                Err(RouteError::handler(anyhow::anyhow!("lookup failed")))
            })
        })
        .await;

        assert_eq!(result.unwrap_err().to_string(), "lookup failed");
        assert_eq!(exchange.response.installed_layers(), 0);
        assert!(!exchange.response.is_emitted());
    }

    #[tokio::test]
    async fn test_route_rule_overrides_global() {
        fn string(data: Value) -> Result<Value, String> {
            if data.is_string() {
                Ok(data)
            } else {
                Err("expected a string".to_string())
            }
        }

        let config = config()
            .global_response_schema(StatusCode::OK, number as Schema)
            .global_response_schema(StatusCode::NOT_FOUND, string as Schema)
            .build();
        let interceptor = Stage::new(config).schema(StatusCode::OK, string as Schema);

        let (exchange, _) = run(&interceptor, emits(StatusCode::OK, json!("hello"))).await;
        assert_eq!(exchange.response.emission().unwrap().body, json!("hello"));

        let (exchange, _) = run(&interceptor, emits(StatusCode::NOT_FOUND, json!(404))).await;
        assert!(!exchange.response.is_emitted());
        assert_eq!(exchange.response.diverted().len(), 1);
    }

    #[tokio::test]
    async fn test_adapter_fault_diverted() {
        let config = Config::builder()
            .adapter(adapter::try_from_fn(|_data: Value, _schema: &Schema| {
                Err(AdapterFault::message("validator crashed"))
            }))
            .build();
        let interceptor = Stage::new(config).schema(StatusCode::OK, number as Schema);
        let (exchange, result) = run(&interceptor, emits(StatusCode::OK, json!(1))).await;

        result.unwrap();
        assert!(!exchange.response.is_emitted());
        assert!(matches!(exchange.response.diverted(), [RouteError::Adapter(_)]));
    }

    #[tokio::test]
    async fn test_missing_adapter_detected_before_route() {
        let interceptor = Stage::new(Config::builder().build())
            .schema(StatusCode::OK, number as Schema);
        let (exchange, result) = run(&interceptor, emits(StatusCode::OK, json!(1))).await;

        let error = result.unwrap_err();
        assert_eq!(error.kind(), Some(ValidationErrorKind::MissingValidator));
        assert!(!exchange.response.is_emitted());
        assert_eq!(exchange.response.installed_layers(), 0);
    }

    #[tokio::test]
    async fn test_bad_request_bypass_only_while_handler_active() {
        let interceptor = Stage::new(config().require_validator(true).build());

        let (exchange, _) = run(&interceptor, |_request, response| {
            Box::pin(async move {
                response.set_bad_request_active(true);
                response.set_status(StatusCode::BAD_REQUEST).json(json!("bad")).await;
                response.set_bad_request_active(false);
                Ok(())
            })
        })
        .await;
        assert_eq!(exchange.response.emission().unwrap().status, StatusCode::BAD_REQUEST);

        let (exchange, _) = run(&interceptor, emits(StatusCode::BAD_REQUEST, json!("bad"))).await;
        assert!(!exchange.response.is_emitted());
        assert_eq!(
            exchange.response.diverted()[0].kind(),
            Some(ValidationErrorKind::MissingSchema)
        );
    }
}
