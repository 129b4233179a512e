//! # Warden Test
//!
//! In-memory testing for validated routes. Requests are built as
//! `http::Request`s, decoded into regions, run through a
//! [`Pipeline`](warden_middleware::Pipeline), and rendered back to
//! `http::Response`s, so a test sees exactly what a host would send.
//!
//! ## Example
//!
//! ```
//! use http::StatusCode;
//! use serde_json::{json, Value};
//! use warden_core::{adapter, Outcome};
//! use warden_middleware::{RouteValidator, ValidatorConfig};
//! use warden_test::TestClient;
//!
//! fn positive(data: Value, _schema: &()) -> Outcome<Value, String> {
//!     match data.as_i64() {
//!         Some(n) if n > 0 => Outcome::Valid(data),
//!         _ => Outcome::Invalid("expected a positive number".to_string()),
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let config = ValidatorConfig::builder().adapter(adapter::from_fn(positive)).build();
//! let pipeline = RouteValidator::new(config)
//!     .request_schema("body", ())
//!     .route(|_request, response| {
//!         Box::pin(async move {
//!             response.set_status(StatusCode::ACCEPTED).json(json!(1)).await;
//!             Ok(())
//!         })
//!     });
//!
//! let client = TestClient::new(pipeline);
//! client.post("/counter").json(&json!(5)).send().await.assert_status(StatusCode::ACCEPTED);
//! client
//!     .post("/counter")
//!     .json(&json!(-5))
//!     .send()
//!     .await
//!     .assert_status(StatusCode::BAD_REQUEST)
//!     .assert_json_eq(&json!({ "message": "Bad Request" }));
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/warden-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use request::{TestRequest, TestRequestBuilder};
pub use response::TestResponse;
