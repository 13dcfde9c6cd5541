//! Session limit validation

use crate::MAX_SESSIONS_CEILING;

/// Validation error for the concurrent session limit
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MaxSessionsError {
    /// Limit is zero
    #[error("maximum sessions must be at least 1")]
    Zero,
    /// Limit exceeds the ceiling
    #[error("maximum sessions must not exceed {MAX_SESSIONS_CEILING}")]
    AboveCeiling,
}

/// Validate the maximum number of concurrent sessions
///
/// The limit must be in `[1, MAX_SESSIONS_CEILING]`.
///
/// # Errors
///
/// Returns a `MaxSessionsError` variant describing the validation failure.
pub fn validate_max_sessions(max_sessions: usize) -> Result<(), MaxSessionsError> {
    if max_sessions == 0 {
        return Err(MaxSessionsError::Zero);
    }
    if max_sessions > MAX_SESSIONS_CEILING {
        return Err(MaxSessionsError::AboveCeiling);
    }
    Ok(())
}
