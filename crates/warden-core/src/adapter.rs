//! The validator adapter contract.
//!
//! An [`Adapter`] is the single integration point for a schema library. It
//! receives an arbitrary data value and an opaque schema and answers with an
//! [`Outcome`]. Warden never inspects either the schema or the adapter error.
//!
//! Adapters may be synchronous or asynchronous; both are driven through the
//! same boxed future so the middleware awaits them uniformly. A fault inside
//! the adapter itself (as opposed to a validation failure) is reported as
//! `Err(AdapterFault)`.
//!
//! # Example
//!
//! ```
//! use warden_core::{adapter, Adapter, Outcome};
//!
//! // An adapter whose "schema" is the maximum allowed value.
//! let at_most = adapter::from_fn(|data: u32, max: &u32| {
//!     if data <= *max {
//!         Outcome::Valid(data)
//!     } else {
//!         Outcome::Invalid(format!("{data} exceeds {max}"))
//!     }
//! });
//!
//! let outcome = futures_util::FutureExt::now_or_never(at_most.validate(7, &10));
//! assert_eq!(outcome.unwrap().unwrap(), Outcome::Valid(7));
//! ```

use crate::{AdapterFault, Outcome};
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What an adapter produces: an outcome, or a fault raised while validating.
pub type AdapterResult<D, E> = Result<Outcome<D, E>, AdapterFault>;

/// A shared, type-erased adapter.
pub type DynAdapter<S, D, E> = Arc<dyn Adapter<S, D, E>>;

/// Pluggable validation function `(data, schema) -> Outcome`.
///
/// # Type Parameters
///
/// - `S`: The schema type (opaque to Warden)
/// - `D`: The data type flowing through validation
/// - `E`: The adapter's error type
pub trait Adapter<S, D, E>: Send + Sync + 'static {
    /// Validates `data` against `schema`.
    ///
    /// On success the returned outcome carries the validated value, which may
    /// differ from the input (coerced, defaulted, stripped).
    fn validate<'a>(&'a self, data: D, schema: &'a S) -> BoxFuture<'a, AdapterResult<D, E>>;
}

impl<S, D, E, A> Adapter<S, D, E> for Arc<A>
where
    A: Adapter<S, D, E> + ?Sized,
{
    fn validate<'a>(&'a self, data: D, schema: &'a S) -> BoxFuture<'a, AdapterResult<D, E>> {
        (**self).validate(data, schema)
    }
}

/// Adapter built from an infallible synchronous closure. See [`from_fn`].
pub struct FnAdapter<F, S> {
    func: F,
    _schema: PhantomData<fn(&S)>,
}

/// Adapter built from a fallible synchronous closure. See [`try_from_fn`].
pub struct TryFnAdapter<F, S> {
    func: F,
    _schema: PhantomData<fn(&S)>,
}

/// Adapter built from an asynchronous closure. See [`from_async_fn`].
pub struct AsyncFnAdapter<F, S> {
    func: F,
    _schema: PhantomData<fn(S)>,
}

/// Creates an adapter from a synchronous closure returning an [`Outcome`].
pub fn from_fn<S, D, E, F>(func: F) -> FnAdapter<F, S>
where
    F: Fn(D, &S) -> Outcome<D, E> + Send + Sync + 'static,
{
    FnAdapter {
        func,
        _schema: PhantomData,
    }
}

/// Creates an adapter from a synchronous closure that may fault.
pub fn try_from_fn<S, D, E, F>(func: F) -> TryFnAdapter<F, S>
where
    F: Fn(D, &S) -> AdapterResult<D, E> + Send + Sync + 'static,
{
    TryFnAdapter {
        func,
        _schema: PhantomData,
    }
}

/// Creates an adapter from an asynchronous closure.
///
/// The schema is cloned into the closure so the returned future can be
/// `'static`; wrap large schemas in an `Arc`.
pub fn from_async_fn<S, D, E, F, Fut>(func: F) -> AsyncFnAdapter<F, S>
where
    S: Clone,
    F: Fn(D, S) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AdapterResult<D, E>> + Send + 'static,
{
    AsyncFnAdapter {
        func,
        _schema: PhantomData,
    }
}

impl<S, D, E, F> Adapter<S, D, E> for FnAdapter<F, S>
where
    S: Sync + 'static,
    D: Send + 'static,
    E: Send + 'static,
    F: Fn(D, &S) -> Outcome<D, E> + Send + Sync + 'static,
{
    fn validate<'a>(&'a self, data: D, schema: &'a S) -> BoxFuture<'a, AdapterResult<D, E>> {
        let outcome = (self.func)(data, schema);
        Box::pin(std::future::ready(Ok(outcome)))
    }
}

impl<S, D, E, F> Adapter<S, D, E> for TryFnAdapter<F, S>
where
    S: Sync + 'static,
    D: Send + 'static,
    E: Send + 'static,
    F: Fn(D, &S) -> AdapterResult<D, E> + Send + Sync + 'static,
{
    fn validate<'a>(&'a self, data: D, schema: &'a S) -> BoxFuture<'a, AdapterResult<D, E>> {
        Box::pin(std::future::ready((self.func)(data, schema)))
    }
}

impl<S, D, E, F, Fut> Adapter<S, D, E> for AsyncFnAdapter<F, S>
where
    S: Clone + Sync + 'static,
    D: 'static,
    E: 'static,
    F: Fn(D, S) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AdapterResult<D, E>> + Send + 'static,
{
    fn validate<'a>(&'a self, data: D, schema: &'a S) -> BoxFuture<'a, AdapterResult<D, E>> {
        Box::pin((self.func)(data, schema.clone()))
    }
}
