//! # Warden
//!
//! **Schema-agnostic validation middleware for HTTP routes**
//!
//! Warden validates the regions of an inbound request (`body`, `query`,
//! `params`, `headers`) before a route runs, and the first body a route emits
//! before it reaches the client. It knows no schema language; every check
//! goes through an [`Adapter`](core::Adapter), so any schema library can be
//! plugged in. A JSON Schema adapter ships behind the `json-schema` feature.
//!
//! ## Quick Start
//!
//! ```
//! use serde_json::json;
//! use warden::json_schema::{JsonSchema, JsonSchemaAdapter};
//! use warden::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = ConfigLoader::new().with_env_prefix("WARDEN").load()?.validation;
//! let config = ValidatorConfig::builder()
//!     .adapter(JsonSchemaAdapter::new())
//!     .settings(settings)
//!     .build();
//!
//! let user = JsonSchema::compile(&json!({
//!     "type": "object",
//!     "properties": { "name": { "type": "string" } },
//!     "required": ["name"]
//! }))?;
//!
//! let create_user = RouteValidator::new(config)
//!     .request_schema("body", user.clone())
//!     .response_schema(StatusCode::CREATED, user)
//!     .route(|request, response| {
//!         Box::pin(async move {
//!             let body = request.validated_region("validated", "body").cloned();
//!             response
//!                 .set_status(StatusCode::CREATED)
//!                 .json(body.unwrap_or_default())
//!                 .await;
//!             Ok(())
//!         })
//!     });
//! # let _ = create_user;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → ResponseInterceptor (arm) → RequestValidator → Route
//!                                                            ↓ emit
//! Response ← transport ← ResponseInterceptor (validate) ←────┘
//! ```
//!
//! Validation failures and route errors travel on the continuation channel to
//! the pipeline's error handler, which renders 400 for bad requests and 500
//! for everything else unless a custom handler takes over.

#![doc(html_root_url = "https://docs.rs/warden/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use warden_core as core;

// Re-export middleware types
pub use warden_middleware as middleware;

// Re-export configuration loading
pub use warden_config as config;

// Re-export logging setup
pub use warden_telemetry as telemetry;

#[cfg(feature = "json-schema")]
pub mod json_schema;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```
/// use warden::prelude::*;
/// ```
pub mod prelude {
    pub use warden_core::{
        adapter, Adapter, AdapterFault, Outcome, Payload, RouteError, RouteResult, Rule,
        StatusRange, ValidationError, ValidationErrorKind, ValidationSettings,
    };

    pub use warden_middleware::{
        Pipeline, RequestHead, RouteRequest, RouteResponse, RouteValidator, ValidatorConfig,
    };

    pub use warden_config::{ConfigLoader, WardenConfig};

    pub use warden_telemetry::{init_logging, LogConfig};

    pub use http::{Method, StatusCode};
}
