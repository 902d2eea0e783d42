//! Failure taxonomy shared by the pipeline stages.
//!
//! Each module owns its own error type; `ErrorKind` is the common
//! classification used for audit lines and for deciding what is fatal.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    TransientNetwork,     // Retries exhausted - entry skipped
    PermanentRequest,     // Non-retryable HTTP status - entry skipped
    Parse,                // Malformed payload - entry skipped
    ResolutionMiss,       // No canonical id found - entry unresolved
    RegressionGuardAbort, // Undersized first run - whole run aborts
}

impl ErrorKind {
    /// Only the persistence guard may stop a run; everything else is
    /// contained at the entry boundary.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorKind::RegressionGuardAbort)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TransientNetwork => "transient_network",
            ErrorKind::PermanentRequest => "permanent_request",
            ErrorKind::Parse => "parse",
            ErrorKind::ResolutionMiss => "resolution_miss",
            ErrorKind::RegressionGuardAbort => "regression_guard_abort",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
