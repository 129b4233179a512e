//! Error types for Warden.
//!
//! Three layers of errors exist:
//!
//! | Type | Meaning |
//! |---|---|
//! | [`AdapterFault`] | The adapter itself broke (returned an error or panicked) |
//! | [`ValidationError`] | The typed validation taxonomy, generic over the adapter error |
//! | [`RouteError`] | What travels on the continuation/error channel |
//!
//! A [`ValidationError`] is first offered to its specific handler. When none
//! is configured it is converted into a [`RouteError`] and handed to the
//! pipeline's error handler, which can recover the typed error with
//! [`RouteError::validation_error`].

use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use thiserror::Error;

/// Result type for middleware stages and route handlers.
pub type RouteResult = Result<(), RouteError>;

/// A fault raised by an adapter while validating.
///
/// This is distinct from a validation failure: the adapter could not decide
/// at all. Faults always travel to the continuation/error channel.
#[derive(Debug, Error)]
pub enum AdapterFault {
    /// The adapter reported a failure.
    #[error("adapter failed: {0}")]
    Message(String),

    /// The adapter panicked.
    #[error("adapter panicked: {0}")]
    Panicked(String),

    /// Any other error raised by the adapter.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AdapterFault {
    /// Creates a fault with a message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Creates a fault from a caught panic payload.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        Self::Panicked(describe_panic(payload))
    }
}

/// The four kinds of validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    /// No adapter was configured.
    MissingValidator,
    /// No schema registered for the emitted status code.
    MissingSchema,
    /// One or more request regions failed validation.
    BadRequest,
    /// The emitted body failed validation.
    BadResponse,
}

impl ValidationErrorKind {
    /// Returns the human-readable kind name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingValidator => "missing validator",
            Self::MissingSchema => "missing schema",
            Self::BadRequest => "bad request",
            Self::BadResponse => "bad response",
        }
    }

    /// Returns the HTTP status a default handler responds with.
    #[must_use]
    pub const fn default_status_code(self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::MissingValidator | Self::MissingSchema | Self::BadResponse => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed request region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionIssue<E> {
    /// The region name (`body`, `query`, `params`, `headers`, ...).
    pub location: String,
    /// The adapter error for this region.
    pub error: E,
}

impl<E> RegionIssue<E> {
    /// Creates a region issue.
    pub fn new(location: impl Into<String>, error: E) -> Self {
        Self {
            location: location.into(),
            error,
        }
    }
}

/// Typed validation error, generic over the adapter error `E`.
///
/// Every variant carries the request method and original URL so a handler
/// can render a diagnostic without access to the request.
#[derive(Debug, Clone, Error)]
pub enum ValidationError<E> {
    /// Validation was attempted before an adapter was configured.
    #[error("Validator not set at ({method}) {url}")]
    MissingValidator {
        /// Request method.
        method: Method,
        /// Original request URL.
        url: String,
    },

    /// No schema is registered for the emitted status code.
    #[error("Response of {} is missing a validation schema at ({method}) {url}", .status.as_u16())]
    MissingSchema {
        /// The emitted status code.
        status: StatusCode,
        /// Request method.
        method: Method,
        /// Original request URL.
        url: String,
    },

    /// One or more request regions failed validation.
    #[error("Request at ({method}) {url} failed validation in {}", RegionList(.issues))]
    BadRequest {
        /// Request method.
        method: Method,
        /// Original request URL.
        url: String,
        /// One entry per failing region, in schema-map order.
        issues: Vec<RegionIssue<E>>,
    },

    /// The emitted body does not match the schema for its status code.
    #[error("Response of {} does not match the validation schema at ({method}) {url}", .status.as_u16())]
    BadResponse {
        /// The emitted status code.
        status: StatusCode,
        /// Request method.
        method: Method,
        /// Original request URL.
        url: String,
        /// The adapter error.
        error: E,
    },
}

impl<E> ValidationError<E> {
    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ValidationErrorKind {
        match self {
            Self::MissingValidator { .. } => ValidationErrorKind::MissingValidator,
            Self::MissingSchema { .. } => ValidationErrorKind::MissingSchema,
            Self::BadRequest { .. } => ValidationErrorKind::BadRequest,
            Self::BadResponse { .. } => ValidationErrorKind::BadResponse,
        }
    }

    /// Returns the request method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        match self {
            Self::MissingValidator { method, .. }
            | Self::MissingSchema { method, .. }
            | Self::BadRequest { method, .. }
            | Self::BadResponse { method, .. } => method,
        }
    }

    /// Returns the original request URL.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::MissingValidator { url, .. }
            | Self::MissingSchema { url, .. }
            | Self::BadRequest { url, .. }
            | Self::BadResponse { url, .. } => url,
        }
    }

    /// Returns the emitted status code for response-side errors.
    #[must_use]
    pub const fn response_status(&self) -> Option<StatusCode> {
        match self {
            Self::MissingSchema { status, .. } | Self::BadResponse { status, .. } => Some(*status),
            Self::MissingValidator { .. } | Self::BadRequest { .. } => None,
        }
    }

    /// Returns the failing regions of a bad request.
    #[must_use]
    pub fn issues(&self) -> &[RegionIssue<E>] {
        match self {
            Self::BadRequest { issues, .. } => issues,
            _ => &[],
        }
    }

    /// Returns the adapter error of a bad response.
    #[must_use]
    pub const fn adapter_error(&self) -> Option<&E> {
        match self {
            Self::BadResponse { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Returns the HTTP status a default handler responds with.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.kind().default_status_code()
    }
}

struct RegionList<'a, E>(&'a [RegionIssue<E>]);

impl<E> fmt::Display for RegionList<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&issue.location)?;
        }
        Ok(())
    }
}

/// The error carried by the continuation/error channel.
///
/// Returning `Err(RouteError)` from a middleware stage or route, or diverting
/// one from inside an emit interceptor, hands it to the pipeline's error
/// handler.
#[derive(Debug, Error)]
pub enum RouteError {
    /// A validation error with no specific handler configured.
    #[error("{message}")]
    Validation {
        /// The validation error kind.
        kind: ValidationErrorKind,
        /// The status a default handler responds with.
        status: StatusCode,
        /// Rendered error message.
        message: String,
        /// The typed [`ValidationError`].
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The adapter faulted.
    #[error(transparent)]
    Adapter(#[from] AdapterFault),

    /// A route or custom handler returned an error.
    #[error(transparent)]
    Handler(#[from] anyhow::Error),

    /// A route or custom handler panicked.
    #[error("handler panicked: {0}")]
    Panic(String),
}

impl RouteError {
    /// Wraps an arbitrary handler error.
    pub fn handler(error: impl Into<anyhow::Error>) -> Self {
        Self::Handler(error.into())
    }

    /// Creates an error from a caught panic payload.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        Self::Panic(describe_panic(payload))
    }

    /// Returns the validation error kind, if this is a validation error.
    #[must_use]
    pub const fn kind(&self) -> Option<ValidationErrorKind> {
        match self {
            Self::Validation { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Returns the HTTP status a default error handler responds with.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { status, .. } => *status,
            Self::Adapter(_) | Self::Handler(_) | Self::Panic(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Recovers the typed validation error.
    ///
    /// `E` must be the adapter error type the error was created with.
    #[must_use]
    pub fn validation_error<E>(&self) -> Option<&ValidationError<E>>
    where
        E: fmt::Debug + Send + Sync + 'static,
    {
        match self {
            Self::Validation { source, .. } => source.downcast_ref::<ValidationError<E>>(),
            _ => None,
        }
    }
}

impl<E> From<ValidationError<E>> for RouteError
where
    E: fmt::Debug + Send + Sync + 'static,
{
    fn from(error: ValidationError<E>) -> Self {
        Self::Validation {
            kind: error.kind(),
            status: error.status_code(),
            message: error.to_string(),
            source: Box::new(error),
        }
    }
}

/// Extracts a message from a caught panic payload.
fn describe_panic(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
