//! Error types for the Galaxy3D validation layer
//!
//! Usage violations are never errors: they are reported as `Violation`
//! records in the call's `CallReport`. This enum only covers failures of
//! the layer itself, its configuration, or the forwarded device.

use std::fmt;
use crate::report::CallReport;

/// Result type for validation layer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Validation layer errors
#[derive(Debug, Clone)]
pub enum Error {
    /// The layer could not be constructed (bad capability table, bad catalog)
    InitializationFailed(String),

    /// The layer's own bookkeeping is corrupt
    InternalInconsistency(String),

    /// The call violated at least one rule and `abort_on_violation` is set.
    /// The call was neither applied to the tracked state nor forwarded.
    CallAborted(CallReport),

    /// The forwarded device failed
    BackendError(String),

    /// A lock guarding shared layer state was poisoned by a panicking thread
    LockPoisoned(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::InternalInconsistency(msg) => write!(f, "Internal inconsistency: {}", msg),
            Error::CallAborted(report) => write!(
                f,
                "Call aborted: {} violation(s) reported for {}",
                report.len(),
                report.context().shape.name()
            ),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::LockPoisoned(what) => write!(f, "Lock poisoned: {}", what),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
