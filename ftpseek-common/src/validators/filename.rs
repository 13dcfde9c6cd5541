//! Filename validation
//!
//! Validates the name of the file being searched for.

/// Maximum length for filenames in bytes
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Validation error for filenames
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilenameError {
    /// Name is empty
    #[error("filename is empty")]
    Empty,
    /// Name exceeds maximum length
    #[error("filename exceeds {MAX_FILENAME_LENGTH} bytes")]
    TooLong,
    /// Name is `.` or `..`
    #[error("filename refers to a directory")]
    DotName,
    /// Name contains `/` or `\`
    #[error("filename contains a path separator")]
    ContainsPathSeparator,
    /// Name contains null bytes
    #[error("filename contains a null byte")]
    ContainsNull,
    /// Name contains control characters
    #[error("filename contains invalid characters")]
    InvalidCharacters,
}

/// Validate a filename to search for
///
/// Checks:
/// - Not empty, at most 255 bytes
/// - Not `.` or `..`
/// - No path separators (`/` or `\`)
/// - No null bytes or control characters
///
/// # Errors
///
/// Returns a `FilenameError` variant describing the validation failure.
pub fn validate_filename(name: &str) -> Result<(), FilenameError> {
    if name.is_empty() {
        return Err(FilenameError::Empty);
    }
    if name.len() > MAX_FILENAME_LENGTH {
        return Err(FilenameError::TooLong);
    }
    if name == "." || name == ".." {
        return Err(FilenameError::DotName);
    }

    for ch in name.chars() {
        if ch == '/' || ch == '\\' {
            return Err(FilenameError::ContainsPathSeparator);
        }
        if ch == '\0' {
            return Err(FilenameError::ContainsNull);
        }
        if ch.is_control() {
            return Err(FilenameError::InvalidCharacters);
        }
    }

    Ok(())
}
