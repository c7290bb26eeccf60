//! Unified error types for the echoprobe harness.

use std::fmt;

/// Error type for conditions that abort a run.
///
/// Server misbehavior observed during a trial (truncated echo, content
/// mismatch, reset mid-exchange) is reported as a value in
/// `TrialOutcome`, never through this type. `HarnessError` is reserved
/// for problems that prevent a scenario from starting or that must not
/// be downgraded to "keep going".
#[derive(Debug)]
pub enum HarnessError {
    /// Could not open a socket to the target at all.
    Connect(std::io::Error),
    /// TLS setup or certificate validation failed.
    Tls(String),
    /// A caller-supplied parameter violates the harness contract.
    InvalidParameter(&'static str),
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarnessError::Connect(e) => write!(f, "connect failed: {}", e),
            HarnessError::Tls(msg) => write!(f, "tls: {}", msg),
            HarnessError::InvalidParameter(msg) => write!(f, "invalid parameter: {}", msg),
        }
    }
}

impl std::error::Error for HarnessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HarnessError::Connect(e) => Some(e),
            _ => None,
        }
    }
}
