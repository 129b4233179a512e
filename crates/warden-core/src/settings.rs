//! Serialisable validation settings.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// An inclusive range of status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusRange {
    /// First code in the range.
    pub start: u16,
    /// Last code in the range (inclusive).
    pub end: u16,
}

impl StatusRange {
    /// Creates a range from `start` to `end`, inclusive.
    #[must_use]
    pub const fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    /// The server error range, `500..=511`.
    #[must_use]
    pub const fn server_errors() -> Self {
        Self::new(500, 511)
    }

    /// Returns true if `status` lies in the range.
    #[must_use]
    pub const fn contains(self, status: StatusCode) -> bool {
        let code = status.as_u16();
        code >= self.start && code <= self.end
    }

    /// Returns true if `start <= end`.
    #[must_use]
    pub const fn is_ordered(self) -> bool {
        self.start <= self.end
    }
}

impl Default for StatusRange {
    fn default() -> Self {
        Self::server_errors()
    }
}

impl From<RangeInclusive<u16>> for StatusRange {
    fn from(range: RangeInclusive<u16>) -> Self {
        Self::new(*range.start(), *range.end())
    }
}

/// The serialisable part of the validator configuration.
///
/// Everything that is plain data lives here so it can be loaded from a file
/// or the environment; adapters, handlers and rules are attached in code.
///
/// # Example
///
/// ```
/// use warden_core::ValidationSettings;
///
/// let settings: ValidationSettings =
///     serde_json::from_str(r#"{ "require_validator": true }"#).unwrap();
/// assert!(settings.require_validator);
/// assert_eq!(settings.validated_namespace, "validated");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationSettings {
    /// Where validated request regions are written.
    pub validated_namespace: String,

    /// Treat a status code without a response rule as an error.
    pub require_validator: bool,

    /// Status codes emitted without validation. `None` disables the exemption.
    pub exempt_statuses: Option<StatusRange>,

    /// Status code passed through while a bad-request handler is responding.
    pub bad_request_bypass: Option<u16>,

    /// Include error messages in default 5xx response bodies.
    pub expose_error_details: bool,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            validated_namespace: "validated".to_string(),
            require_validator: false,
            exempt_statuses: Some(StatusRange::server_errors()),
            bad_request_bypass: Some(400),
            expose_error_details: false,
        }
    }
}

impl ValidationSettings {
    /// Returns true if `status` is exempt from response validation.
    #[must_use]
    pub fn is_exempt(&self, status: StatusCode) -> bool {
        self.exempt_statuses
            .is_some_and(|range| range.contains(status))
    }

    /// Returns true if `status` is the bad-request bypass code.
    #[must_use]
    pub fn is_bad_request_bypass(&self, status: StatusCode) -> bool {
        self.bad_request_bypass == Some(status.as_u16())
    }
}
