//! Validation errors raised before any network I/O

use crate::validators::{FilenameError, HostnameError, MaxSessionsError};

/// Error returned when an endpoint or request fails validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The hostname is not a valid domain name
    #[error("hostname '{hostname}' is not valid: {reason}")]
    Hostname {
        hostname: String,
        reason: HostnameError,
    },
    /// The concurrent session limit is out of range
    #[error("invalid session limit {value}: {reason}")]
    MaxSessions {
        value: usize,
        reason: MaxSessionsError,
    },
    /// The requested filename is not a plain file name
    #[error("filename '{filename}' is not valid: {reason}")]
    Filename {
        filename: String,
        reason: FilenameError,
    },
    /// The session timeout is zero
    #[error("session timeout must be greater than zero")]
    ZeroTimeout,
}
