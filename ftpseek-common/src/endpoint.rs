//! Remote server description
//!
//! A [`ServerEndpoint`] can only be built through its validating constructor,
//! so every endpoint handed to the retrieval code has already passed hostname
//! and session-limit validation.

use std::time::Duration;

use crate::error::ValidationError;
use crate::validators::{validate_hostname, validate_max_sessions};
use crate::{DEFAULT_FTP_PORT, DEFAULT_SESSION_TIMEOUT};

/// Login credentials for the remote server
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// A remote FTP server and the limits used when talking to it
#[derive(Debug, Clone)]
pub struct ServerEndpoint {
    hostname: String,
    port: u16,
    credentials: Credentials,
    max_sessions: usize,
    timeout: Duration,
}

impl ServerEndpoint {
    /// Build a validated endpoint
    ///
    /// `max_sessions` is the number of concurrent connections the server
    /// accepts from a single IP. Most servers allow around 8; lower it if the
    /// server answers with "421 Too many connections".
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if the hostname is malformed or
    /// `max_sessions` is outside `[1, MAX_SESSIONS_CEILING]`.
    pub fn new(
        hostname: impl Into<String>,
        credentials: Credentials,
        max_sessions: usize,
    ) -> Result<Self, ValidationError> {
        let endpoint = Self {
            hostname: hostname.into(),
            port: DEFAULT_FTP_PORT,
            credentials,
            max_sessions,
            timeout: DEFAULT_SESSION_TIMEOUT,
        };
        endpoint.validate()?;
        Ok(endpoint)
    }

    /// Use a non-default control port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the connect and per-command timeout
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::ZeroTimeout` for a zero duration.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ValidationError> {
        if timeout.is_zero() {
            return Err(ValidationError::ZeroTimeout);
        }
        self.timeout = timeout;
        Ok(self)
    }

    /// Re-check the invariants established by [`ServerEndpoint::new`]
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_hostname(&self.hostname).map_err(|reason| ValidationError::Hostname {
            hostname: self.hostname.clone(),
            reason,
        })?;
        validate_max_sessions(self.max_sessions).map_err(|reason| {
            ValidationError::MaxSessions {
                value: self.max_sessions,
                reason,
            }
        })?;
        if self.timeout.is_zero() {
            return Err(ValidationError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
