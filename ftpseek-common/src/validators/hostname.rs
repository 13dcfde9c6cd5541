//! Hostname validation
//!
//! Validates domain names in presentation format (RFC 1035, RFC 3696).

/// Maximum hostname length in bytes.
///
/// The wire format allows 255 octets including the length octets of the first
/// and last labels, so the effective maximum is 253; 254 is accepted only when
/// the final character is the optional root dot.
pub const MAX_HOSTNAME_LENGTH: usize = 254;

/// Maximum length of a single label in bytes
pub const MAX_LABEL_LENGTH: usize = 63;

/// Validation error for hostnames
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostnameError {
    /// Hostname is empty
    #[error("hostname is empty")]
    Empty,
    /// Hostname exceeds maximum length
    #[error("hostname exceeds {MAX_HOSTNAME_LENGTH} characters")]
    TooLong,
    /// A label exceeds 63 characters
    #[error("hostname label exceeds {MAX_LABEL_LENGTH} characters")]
    LabelTooLong,
    /// Two consecutive dots or a leading dot
    #[error("hostname contains an empty label")]
    EmptyLabel,
    /// A label starts or ends with a hyphen
    #[error("hostname label starts or ends with a hyphen")]
    MisplacedHyphen,
    /// Character outside `[A-Za-z0-9_.-]`
    #[error("hostname contains invalid characters")]
    InvalidCharacters,
    /// Hostname has no letter, hyphen or underscore
    #[error("hostname is entirely numeric")]
    AllNumeric,
}

/// Validate a hostname
///
/// Checks:
/// - Not empty, at most 254 bytes (254 only with a trailing dot)
/// - Labels are 1-63 bytes, separated by single dots
/// - Only ASCII letters, digits, `_` and `-`
/// - No label starts or ends with `-`
/// - At least one non-numeric character
///
/// # Errors
///
/// Returns a `HostnameError` variant describing the first validation failure.
pub fn validate_hostname(hostname: &str) -> Result<(), HostnameError> {
    let bytes = hostname.as_bytes();
    let len = bytes.len();
    if len == 0 {
        return Err(HostnameError::Empty);
    }
    if len > MAX_HOSTNAME_LENGTH || (len == MAX_HOSTNAME_LENGTH && bytes[len - 1] != b'.') {
        return Err(HostnameError::TooLong);
    }

    let mut last = b'.';
    let mut non_numeric = false;
    let mut label_len = 0usize;

    for &c in bytes {
        match c {
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                non_numeric = true;
                label_len += 1;
            }
            b'0'..=b'9' => {
                label_len += 1;
            }
            b'-' => {
                // Byte before a hyphen cannot be a dot
                if last == b'.' {
                    return Err(HostnameError::MisplacedHyphen);
                }
                non_numeric = true;
                label_len += 1;
            }
            b'.' => {
                if last == b'-' {
                    return Err(HostnameError::MisplacedHyphen);
                }
                if last == b'.' || label_len == 0 {
                    return Err(HostnameError::EmptyLabel);
                }
                if label_len > MAX_LABEL_LENGTH {
                    return Err(HostnameError::LabelTooLong);
                }
                label_len = 0;
            }
            _ => return Err(HostnameError::InvalidCharacters),
        }
        last = c;
    }

    if last == b'-' {
        return Err(HostnameError::MisplacedHyphen);
    }
    if label_len > MAX_LABEL_LENGTH {
        return Err(HostnameError::LabelTooLong);
    }
    if !non_numeric {
        return Err(HostnameError::AllNumeric);
    }
    Ok(())
}
