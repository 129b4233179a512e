//! The response side of an exchange and its emit interception interface.
//!
//! A [`RouteResponse`] exposes three emit operations: [`send`], [`json`] and
//! [`send_status`]. Each is independently interceptable. Interception is
//! layered: [`RouteResponse::install`] pushes a layer of hooks and returns a
//! [`Teardown`] token, and [`RouteResponse::restore`] pops that layer (and any
//! layer installed above it). An emit call is routed to the topmost layer that
//! hooks its kind; with no such layer it reaches the transport directly.
//!
//! Forwarding is just emitting again: once an interceptor has restored its own
//! layer, calling [`RouteResponse::emit`] reaches whatever sat below it, which
//! is the "original" emit operation from that interceptor's point of view.
//!
//! The transport accepts exactly one emission. A second emission is dropped
//! with a warning, the equivalent of writing to a response whose headers have
//! already been sent.
//!
//! [`send`]: RouteResponse::send
//! [`json`]: RouteResponse::json
//! [`send_status`]: RouteResponse::send_status

use crate::middleware::BoxFuture;
use http::{HeaderMap, StatusCode};
use std::fmt;
use std::sync::Arc;
use warden_core::{Payload, RouteError};

/// The three emit operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmitKind {
    /// Emit a raw body.
    Send,
    /// Emit a JSON body.
    Json,
    /// Emit a status code only.
    Status,
}

impl EmitKind {
    /// Returns the operation name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::Json => "json",
            Self::Status => "send_status",
        }
    }
}

impl fmt::Display for EmitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An emit call in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct Emit<D> {
    /// Which operation was called.
    pub kind: EmitKind,
    /// The body handed to it.
    pub body: D,
}

impl<D> Emit<D> {
    /// Creates an emit call.
    pub const fn new(kind: EmitKind, body: D) -> Self {
        Self { kind, body }
    }

    /// Replaces the body, keeping the operation.
    #[must_use]
    pub fn with_body(self, body: D) -> Self {
        Self {
            kind: self.kind,
            body,
        }
    }
}

/// The single emission committed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Emission<D> {
    /// Status code at the time of emission.
    pub status: StatusCode,
    /// Which operation emitted it.
    pub kind: EmitKind,
    /// The emitted body.
    pub body: D,
}

/// Token identifying one installed interception layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Teardown(u64);

/// Intercepts emit calls on a [`RouteResponse`].
///
/// `layer` is the token of the layer the call was routed through, so the
/// interceptor can restore it before doing anything else.
pub trait Interceptor<D>: Send + Sync + 'static {
    /// Handles one intercepted emit call.
    fn intercept<'a>(
        &'a self,
        response: &'a mut RouteResponse<D>,
        layer: Teardown,
        emit: Emit<D>,
    ) -> BoxFuture<'a, ()>;
}

/// The set of emit operations a layer hooks.
pub struct EmitHooks<D> {
    send: Option<Arc<dyn Interceptor<D>>>,
    json: Option<Arc<dyn Interceptor<D>>>,
    status: Option<Arc<dyn Interceptor<D>>>,
}

impl<D> EmitHooks<D> {
    /// Hooks nothing.
    pub const fn new() -> Self {
        Self {
            send: None,
            json: None,
            status: None,
        }
    }

    /// Hooks all three operations with one interceptor.
    pub fn all(interceptor: Arc<dyn Interceptor<D>>) -> Self {
        Self {
            send: Some(Arc::clone(&interceptor)),
            json: Some(Arc::clone(&interceptor)),
            status: Some(interceptor),
        }
    }

    /// Hooks one operation.
    #[must_use]
    pub fn on(mut self, kind: EmitKind, interceptor: Arc<dyn Interceptor<D>>) -> Self {
        *self.slot_mut(kind) = Some(interceptor);
        self
    }

    fn slot(&self, kind: EmitKind) -> Option<&Arc<dyn Interceptor<D>>> {
        match kind {
            EmitKind::Send => self.send.as_ref(),
            EmitKind::Json => self.json.as_ref(),
            EmitKind::Status => self.status.as_ref(),
        }
    }

    fn slot_mut(&mut self, kind: EmitKind) -> &mut Option<Arc<dyn Interceptor<D>>> {
        match kind {
            EmitKind::Send => &mut self.send,
            EmitKind::Json => &mut self.json,
            EmitKind::Status => &mut self.status,
        }
    }
}

impl<D> Default for EmitHooks<D> {
    fn default() -> Self {
        Self::new()
    }
}

struct Layer<D> {
    id: Teardown,
    hooks: EmitHooks<D>,
}

/// An outbound response as seen by route handlers and validators.
///
/// Besides the emit operations the response carries the deferred error
/// channel: interceptors run inside an emit call and cannot return an error to
/// the pipeline, so they [`divert`](RouteResponse::divert) it instead and the
/// pipeline drains it once the chain has finished.
pub struct RouteResponse<D> {
    status: StatusCode,
    headers: HeaderMap,
    layers: Vec<Layer<D>>,
    next_layer: u64,
    emission: Option<Emission<D>>,
    diverted: Vec<RouteError>,
    bad_request_active: bool,
}

impl<D: Send + 'static> RouteResponse<D> {
    /// Creates an empty response with status `200 OK`.
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            layers: Vec::new(),
            next_layer: 0,
            emission: None,
            diverted: Vec::new(),
            bad_request_active: false,
        }
    }

    /// Returns the current status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets the status code.
    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    /// Returns the response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the response headers mutably.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Emits a raw body.
    pub fn send(&mut self, body: D) -> BoxFuture<'_, ()> {
        self.emit(Emit::new(EmitKind::Send, body))
    }

    /// Emits a JSON body.
    pub fn json(&mut self, body: D) -> BoxFuture<'_, ()> {
        self.emit(Emit::new(EmitKind::Json, body))
    }

    /// Sets the status code, then emits a status-only body.
    ///
    /// The status is set first so that interceptors keyed by status code see
    /// the new value.
    pub fn send_status(&mut self, status: StatusCode) -> BoxFuture<'_, ()>
    where
        D: Payload,
    {
        self.status = status;
        self.emit(Emit::new(EmitKind::Status, D::status_body(status)))
    }

    /// Routes an emit call to the topmost layer hooking its kind, or to the
    /// transport if no layer does.
    ///
    /// Nothing happens until the returned future is polled, whether or not a
    /// layer is installed.
    pub fn emit(&mut self, emit: Emit<D>) -> BoxFuture<'_, ()> {
        let target = self
            .layers
            .iter()
            .rev()
            .find_map(|layer| layer.hooks.slot(emit.kind).map(|i| (layer.id, Arc::clone(i))));

        match target {
            Some((layer, interceptor)) => Box::pin(async move {
                interceptor.intercept(self, layer, emit).await;
            }),
            None => Box::pin(async move {
                self.commit(emit);
            }),
        }
    }

    fn commit(&mut self, emit: Emit<D>) {
        if self.emission.is_some() {
            tracing::warn!(
                kind = %emit.kind,
                http.status_code = self.status.as_u16(),
                "Response already emitted; dropping second emission"
            );
            return;
        }
        self.emission = Some(Emission {
            status: self.status,
            kind: emit.kind,
            body: emit.body,
        });
    }

    /// Installs an interception layer on top of any existing ones.
    pub fn install(&mut self, hooks: EmitHooks<D>) -> Teardown {
        let id = Teardown(self.next_layer);
        self.next_layer += 1;
        self.layers.push(Layer { id, hooks });
        id
    }

    /// Removes a layer and every layer installed above it.
    ///
    /// Returns false if the layer was already removed; restoring twice is a
    /// no-op.
    pub fn restore(&mut self, teardown: Teardown) -> bool {
        match self.layers.iter().position(|layer| layer.id == teardown) {
            Some(index) => {
                self.layers.truncate(index);
                true
            }
            None => false,
        }
    }

    /// Removes every interception layer.
    pub fn restore_all(&mut self) {
        self.layers.clear();
    }

    /// Returns the number of installed layers.
    pub fn installed_layers(&self) -> usize {
        self.layers.len()
    }

    /// Returns true if `teardown` is still installed.
    pub fn is_installed(&self, teardown: Teardown) -> bool {
        self.layers.iter().any(|layer| layer.id == teardown)
    }

    /// Returns true once the transport has accepted an emission.
    pub fn is_emitted(&self) -> bool {
        self.emission.is_some()
    }

    /// Returns the committed emission.
    pub fn emission(&self) -> Option<&Emission<D>> {
        self.emission.as_ref()
    }

    /// Takes the committed emission.
    pub fn take_emission(&mut self) -> Option<Emission<D>> {
        self.emission.take()
    }

    /// Hands an error to the continuation/error channel.
    pub fn divert(&mut self, error: RouteError) {
        self.diverted.push(error);
    }

    /// Returns the errors diverted so far.
    pub fn diverted(&self) -> &[RouteError] {
        &self.diverted
    }

    /// Drains the diverted errors.
    pub fn take_diverted(&mut self) -> Vec<RouteError> {
        std::mem::take(&mut self.diverted)
    }

    /// Returns true while a bad-request handler is responding.
    pub fn is_bad_request_active(&self) -> bool {
        self.bad_request_active
    }

    pub(crate) fn set_bad_request_active(&mut self, active: bool) {
        self.bad_request_active = active;
    }
}

impl<D: Send + 'static> Default for RouteResponse<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: fmt::Debug> fmt::Debug for RouteResponse<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("layers", &self.layers.len())
            .field("emission", &self.emission)
            .field("diverted", &self.diverted)
            .field("bad_request_active", &self.bad_request_active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Restores its layer and forwards the body wrapped in an envelope.
    struct Envelope {
        calls: AtomicUsize,
    }

    impl Interceptor<Value> for Envelope {
        fn intercept<'a>(
            &'a self,
            response: &'a mut RouteResponse<Value>,
            layer: Teardown,
            emit: Emit<Value>,
        ) -> BoxFuture<'a, ()> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                response.restore(layer);
                let body = json!({ "data": emit.body });
                response.emit(emit.with_body(body)).await;
            })
        }
    }

    fn envelope() -> Arc<Envelope> {
        Arc::new(Envelope {
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_emit_without_layers_commits() {
        let mut response = RouteResponse::<Value>::new();
        response.set_status(StatusCode::CREATED).json(json!({"id": 1})).await;

        let emission = response.emission().unwrap();
        assert_eq!(emission.status, StatusCode::CREATED);
        assert_eq!(emission.kind, EmitKind::Json);
        assert_eq!(emission.body, json!({"id": 1}));
    }

    #[tokio::test]
    async fn test_emit_is_lazy_without_layers() {
        let mut response = RouteResponse::<Value>::new();
        drop(response.json(json!("dropped")));
        assert!(response.emission().is_none());

        let interceptor = envelope();
        response.install(EmitHooks::all(interceptor.clone()));
        drop(response.json(json!("dropped")));
        assert!(response.emission().is_none());
        assert_eq!(interceptor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_second_emission_dropped() {
        let mut response = RouteResponse::<Value>::new();
        response.send(json!("first")).await;
        response.send(json!("second")).await;
        assert_eq!(response.emission().unwrap().body, json!("first"));
    }

    #[tokio::test]
    async fn test_send_status_sets_status_first() {
        let mut response = RouteResponse::<Value>::new();
        response.send_status(StatusCode::NO_CONTENT).await;

        let emission = response.emission().unwrap();
        assert_eq!(emission.status, StatusCode::NO_CONTENT);
        assert_eq!(emission.kind, EmitKind::Status);
        assert_eq!(emission.body, json!(204));
    }

    #[tokio::test]
    async fn test_interceptor_runs_once_and_restores() {
        let interceptor = envelope();
        let mut response = RouteResponse::<Value>::new();
        let teardown = response.install(EmitHooks::all(interceptor.clone()));
        assert!(response.is_installed(teardown));

        response.json(json!(1)).await;
        assert_eq!(response.emission().unwrap().body, json!({ "data": 1 }));
        assert_eq!(response.installed_layers(), 0);

        // restored: a second call never reaches the interceptor
        response.json(json!(2)).await;
        assert_eq!(interceptor.calls.load(Ordering::SeqCst), 1);
        assert!(!response.restore(teardown));
    }

    #[tokio::test]
    async fn test_only_hooked_kinds_are_intercepted() {
        let interceptor = envelope();
        let mut response = RouteResponse::<Value>::new();
        response.install(EmitHooks::new().on(EmitKind::Json, interceptor.clone()));

        response.send(json!("raw")).await;
        assert_eq!(interceptor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(response.emission().unwrap().body, json!("raw"));
        assert_eq!(response.installed_layers(), 1);
    }

    #[tokio::test]
    async fn test_stacked_layers_forward_downwards() {
        let inner = envelope();
        let outer = envelope();
        let mut response = RouteResponse::<Value>::new();
        response.install(EmitHooks::all(inner.clone()));
        response.install(EmitHooks::all(outer.clone()));

        response.json(json!("x")).await;
        assert_eq!(
            response.emission().unwrap().body,
            json!({ "data": { "data": "x" } })
        );
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(outer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_restore_removes_layers_above() {
        let mut response = RouteResponse::<Value>::new();
        let lower = response.install(EmitHooks::all(envelope()));
        let upper = response.install(EmitHooks::all(envelope()));

        assert!(response.restore(lower));
        assert!(!response.is_installed(upper));
        assert_eq!(response.installed_layers(), 0);
    }

    #[test]
    fn test_divert_and_drain() {
        let mut response = RouteResponse::<Value>::new();
        response.divert(RouteError::Panic("boom".into()));
        assert_eq!(response.diverted().len(), 1);
        assert_eq!(response.take_diverted().len(), 1);
        assert!(response.diverted().is_empty());
    }
}
