//! Per-request state flowing through the pipeline.

use crate::request::RouteRequest;
use crate::response::RouteResponse;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// One request/response pair travelling through the middleware chain.
///
/// Each exchange is owned by exactly one pipeline invocation; nothing in it is
/// shared with other requests.
///
/// # Example
///
/// ```
/// use http::Method;
/// use serde_json::Value;
/// use warden_middleware::{Exchange, RouteRequest};
///
/// #[derive(Debug, PartialEq)]
/// struct Tenant(&'static str);
///
/// let mut exchange = Exchange::new(RouteRequest::<Value>::new(Method::GET, "/"));
/// exchange.set_extension(Tenant("acme"));
/// assert_eq!(exchange.get_extension::<Tenant>(), Some(&Tenant("acme")));
/// ```
pub struct Exchange<D> {
    /// The inbound request.
    pub request: RouteRequest<D>,
    /// The outbound response.
    pub response: RouteResponse<D>,
    started_at: Instant,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl<D: Send + 'static> Exchange<D> {
    /// Creates an exchange with an empty response.
    pub fn new(request: RouteRequest<D>) -> Self {
        Self {
            request,
            response: RouteResponse::new(),
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }

    /// Returns when the exchange started.
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the time since the exchange started.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Stores a typed extension value.
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

    /// Splits the exchange into its request and response.
    pub fn into_parts(self) -> (RouteRequest<D>, RouteResponse<D>) {
        (self.request, self.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_extensions() {
        #[derive(Debug, PartialEq)]
        struct Attempt(u8);

        let mut exchange = Exchange::new(RouteRequest::<String>::new(Method::GET, "/"));
        assert!(exchange.get_extension::<Attempt>().is_none());

        exchange.set_extension(Attempt(2));
        assert_eq!(exchange.get_extension::<Attempt>(), Some(&Attempt(2)));
        assert_eq!(exchange.remove_extension::<Attempt>(), Some(Attempt(2)));
        assert!(exchange.get_extension::<Attempt>().is_none());
    }

    #[test]
    fn test_into_parts() {
        let exchange = Exchange::new(RouteRequest::<String>::new(Method::PUT, "/items/1"));
        let (request, response) = exchange.into_parts();
        assert_eq!(request.url(), "/items/1");
        assert!(!response.is_emitted());
    }
}
