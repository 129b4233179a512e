//! Schema-map entries.
//!
//! A request or response schema map associates a key (region name or status
//! code) with a [`Rule`]. A rule is either a schema that is handed to the
//! configured [`Adapter`], or a self-contained check function that validates
//! the data directly and needs no adapter.

use crate::adapter::{AdapterResult, BoxFuture, DynAdapter};
use crate::{AdapterFault, Outcome};
use futures_util::FutureExt;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// A direct check function.
pub type Check<D, E> = Arc<dyn Fn(D) -> BoxFuture<'static, AdapterResult<D, E>> + Send + Sync>;

/// One entry of a request or response schema map.
pub enum Rule<S, D, E> {
    /// A schema validated by the configured adapter.
    Schema(Arc<S>),
    /// A check function that validates on its own.
    Check(Check<D, E>),
}

impl<S, D, E> Rule<S, D, E>
where
    S: Send + Sync + 'static,
    D: Send + 'static,
    E: Send + 'static,
{
    /// Creates a rule from a schema.
    pub fn schema(schema: S) -> Self {
        Self::Schema(Arc::new(schema))
    }

    /// Creates a rule from a synchronous check.
    pub fn check<F>(check: F) -> Self
    where
        F: Fn(D) -> Outcome<D, E> + Send + Sync + 'static,
    {
        Self::Check(Arc::new(move |data: D| -> BoxFuture<'static, AdapterResult<D, E>> {
            let outcome = check(data);
            Box::pin(std::future::ready(Ok(outcome)))
        }))
    }

    /// Creates a rule from an asynchronous check that may fault.
    pub fn async_check<F, Fut>(check: F) -> Self
    where
        F: Fn(D) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AdapterResult<D, E>> + Send + 'static,
    {
        Self::Check(Arc::new(
            move |data: D| -> BoxFuture<'static, AdapterResult<D, E>> { Box::pin(check(data)) },
        ))
    }

    /// Returns true if running this rule requires a configured adapter.
    pub const fn needs_adapter(&self) -> bool {
        matches!(self, Self::Schema(_))
    }

    /// Runs the rule against `data`.
    ///
    /// Returns `None` when the rule needs an adapter and none is given. A panic
    /// inside the adapter or check is reported as [`AdapterFault::Panicked`].
    pub fn run<'a>(
        &'a self,
        adapter: Option<&'a DynAdapter<S, D, E>>,
        data: D,
    ) -> Option<BoxFuture<'a, AdapterResult<D, E>>> {
        let fut: BoxFuture<'a, AdapterResult<D, E>> = match self {
            Self::Schema(schema) => {
                let adapter = adapter?;
                Box::pin(async move { adapter.validate(data, schema).await })
            }
            Self::Check(check) => {
                let check = Arc::clone(check);
                Box::pin(async move { check(data).await })
            }
        };

        Some(Box::pin(async move {
            match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => Err(AdapterFault::from_panic(payload.as_ref())),
            }
        }))
    }
}

impl<S, D, E> Clone for Rule<S, D, E> {
    fn clone(&self) -> Self {
        match self {
            Self::Schema(schema) => Self::Schema(Arc::clone(schema)),
            Self::Check(check) => Self::Check(Arc::clone(check)),
        }
    }
}

impl<S: fmt::Debug, D, E> fmt::Debug for Rule<S, D, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema(schema) => f.debug_tuple("Schema").field(schema).finish(),
            Self::Check(_) => f.write_str("Check(..)"),
        }
    }
}
