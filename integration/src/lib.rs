#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations)]

//! Low-level framework for exchange-facing REST traffic: request-rate
//! budgeting, retry-with-backoff, and header-derived limit bookkeeping.
//!
//! This crate has no opinion about *what* is being called — it wraps an
//! arbitrary async operation and a path, classifies the path into a
//! [`RateLimitCategory`], and enforces the category's budget before letting
//! the caller proceed.

pub mod error;
pub mod rate_limit;

pub use error::IntegrationError;
pub use rate_limit::{RateLimitCategory, RateLimitStatus, RateLimiter};
