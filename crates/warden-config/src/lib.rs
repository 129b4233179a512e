//! Layered configuration for Warden.
//!
//! Loads the serialisable part of Warden's configuration, the validation
//! settings and the log setup, from:
//! - Built-in defaults or a development/production preset
//! - A TOML or JSON file (unknown fields are rejected)
//! - Environment variables `PREFIX__SECTION__KEY`, optionally from `.env`
//!
//! # Example
//!
//! ```no_run
//! use warden_config::ConfigLoader;
//!
//! # fn main() -> Result<(), warden_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_optional_file("warden.toml")?
//!     .with_env_prefix("WARDEN")
//!     .load()?;
//!
//! warden_telemetry::init_logging(&config.logging).ok();
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [validation]
//! validated_namespace = "validated"
//! require_validator = false
//! exempt_statuses = { start = 500, end = 511 }
//! bad_request_bypass = 400
//! expose_error_details = false
//!
//! [logging]
//! enabled = true
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! - `WARDEN__VALIDATION__REQUIRE_VALIDATOR=true`
//! - `WARDEN__VALIDATION__EXEMPT_STATUSES=500-599` (or `none`)
//! - `WARDEN__VALIDATION__BAD_REQUEST_BYPASS=none`
//! - `WARDEN__LOGGING__FORMAT=pretty`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;

pub use config::WardenConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
