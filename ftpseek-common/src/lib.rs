//! ftpseek Common Library
//!
//! Shared types, validators, and constants for locating files on a remote
//! FTP server.

use std::time::Duration;

pub mod endpoint;
pub mod entry;
mod error;
pub mod path;
pub mod validators;

pub use endpoint::{Credentials, ServerEndpoint};
pub use entry::{DirectoryEntry, EntryKind, RemoteEntry};
pub use error::ValidationError;

/// Default port for FTP control connections
pub const DEFAULT_FTP_PORT: u16 = 21;

/// Upper bound for the configured number of concurrent sessions.
///
/// This is the number of ports available for outbound connections and exists
/// only so a caller cannot ask for millions of sessions. Real FTP servers
/// usually refuse more than a handful of connections from a single IP.
pub const MAX_SESSIONS_CEILING: usize = 65535;

/// Default number of concurrent sessions against one server
pub const DEFAULT_MAX_SESSIONS: usize = 5;

/// Default timeout for connecting and for each command on a session
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Default username for anonymous FTP
pub const ANONYMOUS_USER: &str = "anonymous";

/// Default password for anonymous FTP
pub const ANONYMOUS_PASSWORD: &str = "anonymous";
