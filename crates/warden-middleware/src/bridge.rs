//! Bridge between `http` types and `serde_json::Value` exchanges.
//!
//! ## Request regions
//!
//! | region | source |
//! |--------|--------|
//! | `body` | JSON body, or the text body for non-JSON content; absent when empty |
//! | `query` | query string as an object of strings, `{}` without one |
//! | `params` | path parameters supplied by the caller's router |
//! | `headers` | header map as an object of strings, repeated values joined by `, ` |
//!
//! A valid `x-request-id` header is used as the request ID.
//!
//! ## Response rendering
//!
//! | emit | content type | body |
//! |------|--------------|------|
//! | `json` | `application/json` | serialised value |
//! | `send` with a string | `text/plain; charset=utf-8` | the string |
//! | `send` with anything else | `application/json` | serialised value |
//! | `send_status` | `text/plain; charset=utf-8` | canonical reason phrase |
//!
//! A response that never emitted renders its status with an empty body.

use crate::request::{RequestHead, RouteRequest};
use crate::response::{EmitKind, RouteResponse};
use bytes::Bytes;
use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use http_body_util::Full;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// The header name for request ID propagation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";

/// Errors converting an `http::Request` into a [`RouteRequest`].
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The body claims to be JSON but does not parse.
    #[error("request body is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// The body is neither JSON nor UTF-8 text.
    #[error("request body is not valid UTF-8")]
    NonUtf8Body,

    /// The query string does not decode.
    #[error("invalid query string: {0}")]
    InvalidQuery(#[from] serde_urlencoded::de::Error),
}

impl RouteRequest<Value> {
    /// Builds a request from an `http::Request` and the path parameters
    /// matched by the caller's router.
    ///
    /// # Errors
    ///
    /// Returns a [`BridgeError`] if the body or query string cannot be
    /// decoded. Repeated query keys become arrays; header values that are
    /// not visible ASCII are decoded lossily.
    ///
    /// # Example
    ///
    /// ```
    /// use bytes::Bytes;
    /// use serde_json::json;
    /// use warden_middleware::RouteRequest;
    ///
    /// let http = http::Request::post("/users/7?notify=yes")
    ///     .header("content-type", "application/json")
    ///     .body(Bytes::from_static(br#"{"username":"ada"}"#))
    ///     .unwrap();
    ///
    /// let request = RouteRequest::from_http(http, [("id", "7")]).unwrap();
    /// assert_eq!(request.url(), "/users/7?notify=yes");
    /// assert_eq!(request.region("body"), Some(&json!({ "username": "ada" })));
    /// assert_eq!(request.region("query"), Some(&json!({ "notify": "yes" })));
    /// assert_eq!(request.region("params"), Some(&json!({ "id": "7" })));
    /// ```
    pub fn from_http<I, K, V>(request: http::Request<Bytes>, params: I) -> Result<Self, BridgeError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let (parts, body) = request.into_parts();

        let url = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_string(), ToString::to_string);
        let mut head = RequestHead::new(parts.method, url);
        if let Some(id) = propagated_request_id(&parts.headers) {
            head = head.with_request_id(id);
        }

        let query = match parts.uri.query() {
            Some(query) => {
                let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)?;
                query_object(pairs)
            }
            None => Value::Object(Map::new()),
        };
        let params = object(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        let headers = headers_object(&parts.headers);

        let mut request = Self::from_head(head);
        if let Some(body) = decode_body(&parts.headers, &body)? {
            request.insert_region("body", body);
        }
        request.insert_region("query", query);
        request.insert_region("params", params);
        request.insert_region("headers", headers);
        Ok(request)
    }
}

impl RouteResponse<Value> {
    /// Renders the response as an `http::Response`.
    ///
    /// Pending interception layers are discarded.
    pub fn into_http(mut self) -> http::Response<Full<Bytes>> {
        let emission = self.take_emission();
        let mut headers = std::mem::take(self.headers_mut());

        let (status, content_type, body) = match emission {
            None => (self.status(), None, Bytes::new()),
            Some(emission) => {
                let (content_type, body) = match (emission.kind, emission.body) {
                    (EmitKind::Status, _) => (
                        TEXT_PLAIN,
                        Bytes::from_static(
                            emission
                                .status
                                .canonical_reason()
                                .unwrap_or_default()
                                .as_bytes(),
                        ),
                    ),
                    (EmitKind::Send, Value::String(text)) => (TEXT_PLAIN, Bytes::from(text)),
                    (EmitKind::Send | EmitKind::Json, value) => {
                        (APPLICATION_JSON, Bytes::from(value.to_string()))
                    }
                };
                (emission.status, Some(content_type), body)
            }
        };

        if let Some(content_type) = content_type {
            if !headers.contains_key(CONTENT_TYPE) {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
            }
        }

        let mut response = http::Response::new(Full::new(body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}

fn propagated_request_id(headers: &HeaderMap) -> Option<Uuid> {
    let value = headers.get(REQUEST_ID_HEADER)?.to_str().ok()?;
    Uuid::parse_str(value).ok()
}

fn object(pairs: impl IntoIterator<Item = (String, String)>) -> Value {
    Value::Object(
        pairs
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect(),
    )
}

/// Repeated keys collect into an array in order of appearance.
fn query_object(pairs: Vec<(String, String)>) -> Value {
    let mut map = Map::new();
    for (key, value) in pairs {
        let value = Value::String(value);
        match map.get_mut(&key) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(key, value);
            }
        }
    }
    Value::Object(map)
}

/// Values that are not visible ASCII (obs-text) are decoded lossily.
fn headers_object(headers: &HeaderMap) -> Value {
    let mut map = Map::new();
    for name in headers.keys() {
        let values: Vec<_> = headers
            .get_all(name)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()))
            .collect();
        map.insert(name.as_str().to_string(), Value::String(values.join(", ")));
    }
    Value::Object(map)
}

fn decode_body(headers: &HeaderMap, body: &Bytes) -> Result<Option<Value>, BridgeError> {
    if body.is_empty() {
        return Ok(None);
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());

    match content_type {
        Some(ct) if is_json(ct) => serde_json::from_slice(body)
            .map(Some)
            .map_err(BridgeError::InvalidJson),
        Some(_) => text(body).map(Some),
        // Without a content type, JSON wins when it parses.
        None => match serde_json::from_slice(body) {
            Ok(value) => Ok(Some(value)),
            Err(_) => text(body).map(Some),
        },
    }
}

fn is_json(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == APPLICATION_JSON || essence.ends_with("+json")
}

fn text(body: &Bytes) -> Result<Value, BridgeError> {
    std::str::from_utf8(body)
        .map(|text| Value::String(text.to_string()))
        .map_err(|_| BridgeError::NonUtf8Body)
}
