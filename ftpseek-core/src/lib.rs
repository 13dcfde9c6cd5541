//! ftpseek core library
//!
//! Locates a file somewhere beneath a subtree of a remote FTP server and
//! retrieves it. The search fans out one task per directory, bounded by an
//! admission controller that caps concurrently open sessions, and halts all
//! queued work as soon as one task finds the file.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use ftpseek_common::{Credentials, ServerEndpoint};
//! use ftpseek_core::{FtpTransport, Retriever};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let endpoint = ServerEndpoint::new(
//!     "aftp.cmdl.noaa.gov",
//!     Credentials::new("anonymous", "anonymous"),
//!     5,
//! )?;
//! let retriever = Retriever::new(endpoint, Arc::new(FtpTransport::new()));
//! let data = retriever.get("co2_weekly_mlo.txt", "/products", 0).await?;
//! # let _ = data;
//! # Ok(())
//! # }
//! ```

pub mod admission;
pub mod cache;
mod error;
pub mod retrieve;
pub mod search;
mod session;
pub mod testing;
pub mod transport;

pub use admission::{Admission, AdmissionController, AdmissionError, AdmissionSlot};
pub use cache::{DEFAULT_LOCATION_CACHE_CAPACITY, LocationCache};
pub use error::RetrieveError;
pub use retrieve::Retriever;
pub use search::SearchCoordinator;
pub use transport::ftp::FtpTransport;
pub use transport::{Session, Transport, TransportError};
