//! Validation stages.
//!
//! A validated route runs its stages in this order:
//!
//! 1. [`response_validation`] - arm the response interceptor
//! 2. [`request_validation`] - validate request regions
//!
//! The interceptor is installed first so that a response emitted by the
//! bad-request handler passes through it, where the bad-request bypass lets
//! it out unvalidated.

pub mod request_validation;
pub mod response_validation;

// Re-export main types
pub use request_validation::RequestValidator;
pub use response_validation::ResponseInterceptor;
