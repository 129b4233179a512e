//! Test client for in-memory route testing.

use crate::error::TestError;
use crate::request::{TestRequest, TestRequestBuilder};
use crate::response::TestResponse;
use bytes::Bytes;
use http::Method;
use serde_json::Value;
use std::sync::Arc;
use warden_middleware::{Pipeline, RouteRequest};

/// A client that drives one validated route without a server.
///
/// Each request goes through the same steps a host would take: the
/// `http::Request` is decoded into regions, handled by the [`Pipeline`], and
/// rendered back into an `http::Response`.
///
/// # Example
///
/// ```
/// use http::StatusCode;
/// use serde_json::{json, Value};
/// use warden_middleware::Pipeline;
/// use warden_test::TestClient;
///
/// # tokio_test::block_on(async {
/// let pipeline = Pipeline::<Value>::builder().build(|request, response| {
///     Box::pin(async move {
///         let params = request.region("params").cloned().unwrap_or_default();
///         response.json(params).await;
///         Ok(())
///     })
/// });
///
/// let client = TestClient::new(pipeline).with_param("id", "42");
/// let response = client.get("/users/42").send().await;
///
/// response
///     .assert_status(StatusCode::OK)
///     .assert_json_eq(&json!({ "id": "42" }));
/// # });
/// ```
#[must_use]
#[derive(Debug, Clone)]
pub struct TestClient {
    pipeline: Arc<Pipeline<Value>>,
    params: Vec<(String, String)>,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Creates a client for a pipeline.
    pub fn new(pipeline: Pipeline<Value>) -> Self {
        Self::shared(Arc::new(pipeline))
    }

    /// Creates a client for a pipeline that is also used elsewhere.
    pub fn shared(pipeline: Arc<Pipeline<Value>>) -> Self {
        Self {
            pipeline,
            params: Vec::new(),
            default_headers: Vec::new(),
        }
    }

    /// Adds a path parameter, as a router would have matched it.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Adds a header that will be included in all requests.
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Creates a GET request builder.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::get(uri))
    }

    /// Creates a POST request builder.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::post(uri))
    }

    /// Creates a PUT request builder.
    pub fn put(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::put(uri))
    }

    /// Creates a PATCH request builder.
    pub fn patch(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::patch(uri))
    }

    /// Creates a DELETE request builder.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::delete(uri))
    }

    /// Creates a request builder with a custom method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequestBuilder::new(method, uri))
    }

    /// Sends a built request through the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be decoded into regions or the
    /// rendered body cannot be collected.
    pub async fn send(&self, request: TestRequest) -> Result<TestResponse, TestError> {
        let http = request.into_http_request()?;
        let request = RouteRequest::from_http(http, self.params.iter().cloned())?;
        let response = self.pipeline.handle(request).await;
        TestResponse::from_http(response.into_http()).await
    }
}

/// A request builder bound to a test client.
#[must_use]
#[derive(Debug)]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: TestRequestBuilder,
}

impl<'a> TestClientRequest<'a> {
    fn new(client: &'a TestClient, builder: TestRequestBuilder) -> Self {
        let builder = client
            .default_headers
            .iter()
            .fold(builder, |builder, (name, value)| builder.header(name, value));
        Self { client, builder }
    }

    /// Appends a header to the request.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Sets the Content-Type header.
    pub fn content_type(mut self, content_type: impl AsRef<str>) -> Self {
        self.builder = self.builder.content_type(content_type);
        self
    }

    /// Sets the request ID header.
    pub fn request_id(mut self, id: impl AsRef<str>) -> Self {
        self.builder = self.builder.request_id(id);
        self
    }

    /// Sets the raw request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Sets the request body as JSON.
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Sets the request body as plain text.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.builder = self.builder.text(text);
        self
    }

    /// Appends a url-encoded query string.
    pub fn query<T: serde::Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.query(value);
        self
    }

    /// Sends the request and returns the response.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or decoded. Use
    /// [`try_send`](Self::try_send) to inspect those failures.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(e) => panic!("test request failed: {e}"),
        }
    }

    /// Sends the request and returns a Result.
    ///
    /// # Errors
    ///
    /// Returns the build, decode, or collect error.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        let request = self.builder.build()?;
        self.client.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use serde_json::json;
    use warden_core::RouteError;

    fn echo() -> TestClient {
        TestClient::new(Pipeline::<Value>::builder().build(|request, response| {
            Box::pin(async move {
                let regions: serde_json::Map<String, Value> = request
                    .regions()
                    .map(|(name, value)| (name.to_string(), value.clone()))
                    .collect();
                response.json(Value::Object(regions)).await;
                Ok(())
            })
        }))
    }

    #[tokio::test]
    async fn test_regions_are_decoded() {
        let client = echo().with_param("id", "9");
        let response = client
            .post("/users/9")
            .query(&[("notify", "yes")])
            .json(&json!({"name": "Alice"}))
            .send()
            .await;

        response
            .assert_status(StatusCode::OK)
            .assert_content_type("application/json")
            .assert_json_field("body", &json!({"name": "Alice"}))
            .assert_json_field("query", &json!({"notify": "yes"}))
            .assert_json_field("params", &json!({"id": "9"}));
    }

    #[tokio::test]
    async fn test_default_headers() {
        let client = echo().with_default_header("x-tenant", "acme");
        let response = client.get("/").header("x-trace", "1").send().await;
        let body = response.json_value().unwrap();
        assert_eq!(body["headers"]["x-tenant"], "acme");
        assert_eq!(body["headers"]["x-trace"], "1");
    }

    #[tokio::test]
    async fn test_text_body() {
        let response = echo().put("/notes/1").text("hello").send().await;
        response.assert_json_field("body", &json!("hello"));
    }

    #[tokio::test]
    async fn test_invalid_json_is_a_decode_error() {
        let result = echo()
            .post("/users")
            .content_type("application/json")
            .body("{not json")
            .try_send()
            .await;
        assert!(matches!(result, Err(TestError::Bridge(_))));
    }

    #[tokio::test]
    async fn test_route_error_renders_default() {
        let client = TestClient::new(Pipeline::<Value>::builder().build(|_request, _response| {
            Box::pin(async move { Err(RouteError::handler(anyhow::anyhow!("store offline"))) })
        }));

        client
            .delete("/users/1")
            .send()
            .await
            .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
            .assert_json_eq(&json!({"message": "Internal Server Error"}));
    }
}
