//! Resilient read-only HTTP access to the catalog service.
//!
//! Every request goes through [`FetchClient`], which owns the single
//! `reqwest::Client` of the run, the shared [`RequestThrottle`], and the
//! [`RetryPolicy`].

mod client;
mod retry_policy;
mod throttle;

pub use client::FetchClient;
pub use retry_policy::{Backoff, RetryPolicy};
pub use throttle::RequestThrottle;

use crate::error::ErrorKind;
use thiserror::Error;

/// How a response status is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    /// Overload, rate limit, or "request queued": back off and retry.
    Transient,
    /// Auth failures the service hands out while throttling: retry slower.
    Throttled,
    /// Anything else: fail immediately.
    Permanent,
}

impl StatusClass {
    pub fn of(status: u16) -> Self {
        match status {
            // 202 means the service queued the request and wants us back later.
            202 | 429 | 500 | 502 | 503 | 504 => StatusClass::Transient,
            401 | 403 => StatusClass::Throttled,
            200..=299 => StatusClass::Success,
            _ => StatusClass::Permanent,
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("gave up on {url} after {attempts} attempts: {last_failure}")]
    Exhausted {
        url: String,
        attempts: u32,
        last_failure: String,
    },

    #[error("HTTP {status} for {url}")]
    Rejected { url: String, status: u16 },

    #[error("invalid request for {url}: {message}")]
    InvalidRequest { url: String, message: String },
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Exhausted { .. } => ErrorKind::TransientNetwork,
            FetchError::Rejected { .. } | FetchError::InvalidRequest { .. } => {
                ErrorKind::PermanentRequest
            }
        }
    }
}
