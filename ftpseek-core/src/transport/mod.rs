//! Transport client abstraction
//!
//! The search and retrieval code only needs five operations from the wire
//! protocol: connect, authenticate, list one directory, stream one file from
//! an offset, and close. [`Transport`] opens sessions; [`Session`] performs the
//! rest. Implementations enforce their own connect and command timeouts.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWrite;

use ftpseek_common::{Credentials, RemoteEntry};

pub mod ftp;

/// Failure reported by a transport
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The control connection could not be established
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    /// An operation did not complete in time
    #[error("{operation} timed out after {}s", timeout.as_secs_f32())]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// The server rejected the credentials
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The listed path does not exist (as opposed to being empty)
    #[error("'{0}' does not exist on the server")]
    NoSuchPath(String),

    /// The resolved entry is a directory and cannot be transferred
    #[error("'{0}' is a directory, not a file")]
    NotAFile(String),

    /// The server answered with an unexpected reply
    #[error("unexpected server reply: {0}")]
    Protocol(String),

    /// The server closed the connection mid-conversation
    #[error("connection closed by server")]
    Closed,

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// One authenticated connection to the remote server
#[async_trait]
pub trait Session: Send {
    /// Log in with the given credentials
    async fn authenticate(&mut self, credentials: &Credentials) -> Result<(), TransportError>;

    /// List the entries of one directory
    ///
    /// Returns `TransportError::NoSuchPath` when the directory does not exist,
    /// and an empty vector when it exists but has no entries.
    async fn list(&mut self, path: &str) -> Result<Vec<RemoteEntry>, TransportError>;

    /// Stream the file at `path` from `offset` to end-of-stream into `sink`
    ///
    /// Returns the number of bytes written.
    async fn retrieve(
        &mut self,
        path: &str,
        offset: u64,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, TransportError>;

    /// Close the session
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Factory for sessions against a remote server
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open an unauthenticated session to `hostname:port`
    async fn connect(
        &self,
        hostname: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<Box<dyn Session>, TransportError>;
}
