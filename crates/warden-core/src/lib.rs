//! # Warden Core
//!
//! Core types shared by every Warden crate.
//!
//! Warden validates inbound request data and outbound response bodies against
//! caller-supplied schemas. It does not know any schema language itself; all
//! schema checking is delegated to an [`Adapter`], so any schema library can be
//! plugged in.
//!
//! This crate provides:
//!
//! - [`Outcome`] - The success/failure result every adapter produces
//! - [`Adapter`] - The pluggable `(data, schema) -> Outcome` contract
//! - [`Rule`] - A schema-map entry: a schema for the adapter, or a direct check
//! - [`ValidationError`] - The typed error taxonomy (missing validator, missing
//!   schema, bad request, bad response)
//! - [`RouteError`] - The payload of the continuation/error channel
//! - [`ValidationSettings`] - The serialisable part of the validator configuration
//!
//! ## Example
//!
//! ```
//! use warden_core::{adapter, Adapter, Outcome};
//!
//! let trim = adapter::from_fn(|data: String, max_len: &usize| {
//!     let trimmed = data.trim().to_string();
//!     if trimmed.len() <= *max_len {
//!         Outcome::Valid(trimmed)
//!     } else {
//!         Outcome::Invalid(format!("longer than {max_len}"))
//!     }
//! });
//!
//! let result = futures_util::FutureExt::now_or_never(trim.validate("  hi  ".to_string(), &8));
//! assert_eq!(result.unwrap().unwrap(), Outcome::Valid("hi".to_string()));
//! ```

#![doc(html_root_url = "https://docs.rs/warden-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod adapter;
mod error;
mod outcome;
mod payload;
mod rule;
mod settings;

pub use adapter::{Adapter, AdapterResult, BoxFuture, DynAdapter};
pub use error::{
    AdapterFault, RegionIssue, RouteError, RouteResult, ValidationError, ValidationErrorKind,
};
pub use outcome::Outcome;
pub use payload::Payload;
pub use rule::{Check, Rule};
pub use settings::{StatusRange, ValidationSettings};
