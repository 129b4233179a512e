//! The middleware trait and the continuation chain.
//!
//! A [`Middleware`] receives the exchange and a [`Next`] continuation. Calling
//! `next.run(exchange)` proceeds down the chain; returning `Err(RouteError)`
//! diverts to the pipeline's error handling. Not calling `next` at all
//! short-circuits the chain.
//!
//! # Example
//!
//! ```ignore
//! use warden_middleware::{BoxFuture, Exchange, Middleware, Next};
//! use warden_core::RouteResult;
//!
//! struct Timing;
//!
//! impl<D: Send + Sync + 'static> Middleware<D> for Timing {
//!     fn name(&self) -> &'static str {
//!         "timing"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         exchange: &'a mut Exchange<D>,
//!         next: Next<'a, D>,
//!     ) -> BoxFuture<'a, RouteResult> {
//!         Box::pin(async move {
//!             let result = next.run(exchange).await;
//!             tracing::debug!(elapsed = ?exchange.elapsed(), "done");
//!             result
//!         })
//!     }
//! }
//! ```

use crate::exchange::Exchange;
use crate::request::RouteRequest;
use crate::response::RouteResponse;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use warden_core::{RouteError, RouteResult};

pub use warden_core::BoxFuture;

/// A stage in the middleware chain.
///
/// # Invariants
///
/// - Middleware MUST call `next.run()` at most once
/// - Middleware SHOULD NOT swallow errors returned by `next.run()`
pub trait Middleware<D>: Send + Sync + 'static {
    /// Returns the name of this stage, used in logs.
    fn name(&self) -> &'static str;

    /// Processes the exchange.
    fn process<'a>(
        &'a self,
        exchange: &'a mut Exchange<D>,
        next: Next<'a, D>,
    ) -> BoxFuture<'a, RouteResult>;
}

/// The user's route logic, run at the end of the chain.
///
/// Implemented for every closure of the shape
/// `|request, response| Box::pin(async move { ... })`.
pub trait Route<D>: Send + Sync + 'static {
    /// Runs the route.
    fn call<'a>(
        &'a self,
        request: &'a RouteRequest<D>,
        response: &'a mut RouteResponse<D>,
    ) -> BoxFuture<'a, RouteResult>;
}

impl<D, F> Route<D> for F
where
    F: for<'a> Fn(&'a RouteRequest<D>, &'a mut RouteResponse<D>) -> BoxFuture<'a, RouteResult>
        + Send
        + Sync
        + 'static,
{
    fn call<'a>(
        &'a self,
        request: &'a RouteRequest<D>,
        response: &'a mut RouteResponse<D>,
    ) -> BoxFuture<'a, RouteResult> {
        self(request, response)
    }
}

/// Continuation to the rest of the chain.
///
/// Consumed by [`Next::run`], so it can only be invoked once.
pub struct Next<'a, D> {
    inner: NextInner<'a, D>,
}

enum NextInner<'a, D> {
    /// More middleware to process
    Chain {
        middleware: &'a dyn Middleware<D>,
        next: Box<Next<'a, D>>,
    },
    /// End of chain
    Route(&'a dyn Route<D>),
}

impl<'a, D> Next<'a, D>
where
    D: Send + Sync + 'static,
{
    /// Creates a `Next` that invokes `middleware`, then `next`.
    pub(crate) fn new(middleware: &'a dyn Middleware<D>, next: Next<'a, D>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates a terminal `Next` that invokes the route.
    pub(crate) fn route(route: &'a dyn Route<D>) -> Self {
        Self {
            inner: NextInner::Route(route),
        }
    }

    /// Invokes the next middleware, or the route.
    ///
    /// A panic in the route is caught and returned as [`RouteError::Panic`].
    pub async fn run(self, exchange: &mut Exchange<D>) -> RouteResult {
        match self.inner {
            NextInner::Chain { middleware, next } => middleware.process(exchange, *next).await,
            NextInner::Route(route) => {
                let request = &exchange.request;
                let response = &mut exchange.response;
                let call = async move { route.call(request, response).await };
                let outcome = AssertUnwindSafe(call).catch_unwind().await;
                match outcome {
                    Ok(result) => result,
                    Err(payload) => {
                        let error = RouteError::from_panic(payload.as_ref());
                        tracing::error!(
                            request_id = %exchange.request.request_id(),
                            error = %error,
                            "Route panicked"
                        );
                        Err(error)
                    }
                }
            }
        }
    }
}
