//! The request side of an exchange.

use http::Method;
use indexmap::IndexMap;
use std::collections::HashMap;
use uuid::Uuid;

/// Identifying information about a request.
///
/// Handed to custom error handlers alongside the response so they can render
/// diagnostics without access to the full request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    method: Method,
    url: String,
    request_id: Uuid,
}

impl RequestHead {
    /// Creates a head with a fresh request ID (UUID v7).
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            request_id: Uuid::now_v7(),
        }
    }

    /// Replaces the generated request ID with a propagated one.
    #[must_use]
    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = request_id;
        self
    }

    /// Returns the request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the original request URL (path and query).
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the request ID.
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }
}

/// An inbound request as seen by the validators.
///
/// The request is a set of named regions (`body`, `query`, `params`,
/// `headers`, or anything else the caller defines). Validated values are
/// never written back over a region; they are grouped by region name under a
/// namespace, see [`RouteRequest::validated`].
///
/// # Example
///
/// ```
/// use http::Method;
/// use warden_middleware::RouteRequest;
///
/// let request = RouteRequest::new(Method::POST, "/users")
///     .with_region("body", "{\"username\":\"ada\"}".to_string());
///
/// assert!(request.region("body").is_some());
/// assert!(request.region("query").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct RouteRequest<D> {
    head: RequestHead,
    regions: IndexMap<String, D>,
    validated: HashMap<String, IndexMap<String, D>>,
}

impl<D> RouteRequest<D> {
    /// Creates a request with no regions.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self::from_head(RequestHead::new(method, url))
    }

    /// Creates a request from an existing head.
    pub fn from_head(head: RequestHead) -> Self {
        Self {
            head,
            regions: IndexMap::new(),
            validated: HashMap::new(),
        }
    }

    /// Adds a region.
    #[must_use]
    pub fn with_region(mut self, name: impl Into<String>, value: D) -> Self {
        self.insert_region(name, value);
        self
    }

    /// Inserts or replaces a region.
    pub fn insert_region(&mut self, name: impl Into<String>, value: D) -> Option<D> {
        self.regions.insert(name.into(), value)
    }

    /// Returns a region, or `None` if the request does not carry it.
    pub fn region(&self, name: &str) -> Option<&D> {
        self.regions.get(name)
    }

    /// Returns every region in insertion order.
    pub fn regions(&self) -> impl Iterator<Item = (&str, &D)> {
        self.regions.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Returns the request head.
    pub fn head(&self) -> &RequestHead {
        &self.head
    }

    /// Returns the request method.
    pub fn method(&self) -> &Method {
        self.head.method()
    }

    /// Returns the original request URL.
    pub fn url(&self) -> &str {
        self.head.url()
    }

    /// Returns the request ID.
    pub fn request_id(&self) -> Uuid {
        self.head.request_id()
    }

    /// Returns the validated regions stored under `namespace`.
    pub fn validated(&self, namespace: &str) -> Option<&IndexMap<String, D>> {
        self.validated.get(namespace)
    }

    /// Returns one validated region stored under `namespace`.
    pub fn validated_region(&self, namespace: &str, region: &str) -> Option<&D> {
        self.validated(namespace)?.get(region)
    }

    /// Replaces everything stored under `namespace`.
    pub fn set_validated(&mut self, namespace: impl Into<String>, regions: IndexMap<String, D>) {
        self.validated.insert(namespace.into(), regions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_head() {
        let head = RequestHead::new(Method::GET, "/users?page=2");
        assert_eq!(head.method(), Method::GET);
        assert_eq!(head.url(), "/users?page=2");
        assert_eq!(head.request_id().get_version_num(), 7);
    }

    #[test]
    fn test_regions_keep_insertion_order() {
        let request = RouteRequest::new(Method::GET, "/")
            .with_region("query", 1)
            .with_region("body", 2)
            .with_region("params", 3);
        let names: Vec<_> = request.regions().map(|(name, _)| name).collect();
        assert_eq!(names, ["query", "body", "params"]);
    }

    #[test]
    fn test_validated_namespace_replaced_not_merged() {
        let mut request = RouteRequest::new(Method::GET, "/").with_region("body", 1);

        let mut first = IndexMap::new();
        first.insert("body".to_string(), 10);
        first.insert("query".to_string(), 20);
        request.set_validated("validated", first);

        let mut second = IndexMap::new();
        second.insert("body".to_string(), 11);
        request.set_validated("validated", second);

        assert_eq!(request.validated_region("validated", "body"), Some(&11));
        assert_eq!(request.validated_region("validated", "query"), None);
        assert_eq!(request.region("body"), Some(&1));
        assert!(request.validated("other").is_none());
    }
}
