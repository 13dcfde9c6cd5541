//! Input validation functions
//!
//! Validators run before any session is opened. Each returns a small error
//! enum describing the first problem found.

mod filename;
mod hostname;
mod max_sessions;

pub use filename::{FilenameError, MAX_FILENAME_LENGTH, validate_filename};
pub use hostname::{HostnameError, MAX_HOSTNAME_LENGTH, MAX_LABEL_LENGTH, validate_hostname};
pub use max_sessions::{MaxSessionsError, validate_max_sessions};
