//! Error Types
//!
//! Failures the oracle can surface. None of them are fatal: the controller
//! either shows a themed message or logs and carries on.

use thiserror::Error;

/// Errors from the oracle's collaborators
#[derive(Debug, Error)]
pub enum OracleError {
    /// A remote service (answer or persona generation) failed
    #[error("{service} service failed: {message}")]
    Service {
        /// Which service failed
        service: &'static str,
        /// What went wrong
        message: String,
    },

    /// The local cache could not be read or written
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A generated persona was missing required fields
    #[error("Invalid persona data: {0}")]
    InvalidPersona(String),
}

impl OracleError {
    /// Wrap a transport failure of the named service
    pub fn service(service: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Service {
            service,
            message: err.to_string(),
        }
    }
}

/// Local store failures
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem error
    #[error("Store I/O failed at {path}: {source}")]
    Io {
        /// File involved
        path: std::path::PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A stored document could not be encoded or decoded
    #[error("Store document {key} is malformed: {source}")]
    Serde {
        /// Logical key of the document
        key: String,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },
}
