//! Tandem - Composite Rolling-Window Rate Limiter
//!
//! This crate gates callers so that no more than a configured number of
//! operations happen within each of several rolling time windows at once,
//! e.g. "at most 2 per second and at most 5 per 5 seconds". Callers are
//! suspended until every window admits them.

pub mod config;
pub mod error;
pub mod ratelimit;

pub use error::{Result, TandemError};
pub use ratelimit::{CompositeLimiter, Constraint};
