//! Errors returned to callers of the retrieval API

use ftpseek_common::ValidationError;

use crate::admission::AdmissionError;
use crate::transport::TransportError;

/// Terminal outcome of a failed `get` or `get_meta` call
#[derive(Debug, thiserror::Error)]
pub enum RetrieveError {
    /// Endpoint or request failed validation; no I/O was attempted
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The directory the caller named does not exist on the server
    #[error("'{0}' does not exist on the server")]
    PathNotFound(String),

    /// The whole reachable subtree was searched without a match
    #[error("file '{filename}' not found under '{root}'")]
    NotFound { filename: String, root: String },

    /// The transport failed while listing or transferring
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A session slot could not be obtained
    #[error(transparent)]
    Admission(#[from] AdmissionError),
}

impl RetrieveError {
    /// Whether the error means the file or directory is absent
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::PathNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = RetrieveError::NotFound {
            filename: "co2.txt".to_string(),
            root: "/products".to_string(),
        };
        assert_eq!(err.to_string(), "file 'co2.txt' not found under '/products'");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_path_not_found_is_not_found() {
        assert!(RetrieveError::PathNotFound("/missing".to_string()).is_not_found());
    }

    #[test]
    fn test_transport_error_is_not_not_found() {
        let err = RetrieveError::from(TransportError::Protocol("421 Too many connections".into()));
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("421"));
    }
}
