//! Structured logging setup for Warden.
//!
//! Warden's middleware only emits `tracing` events and `metrics` counters; it
//! never installs a subscriber or exporter itself. This crate is the optional
//! one-call setup for applications that want Warden's logs formatted the
//! standard way:
//!
//! ```rust,ignore
//! use warden_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::production())?;
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
