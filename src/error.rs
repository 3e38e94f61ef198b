//! use certfetch::error::CertFetchError;

use thiserror::Error;

use crate::storage::StorageError;

/// Represents errors that can occur while resolving CA, CRL and certificate reads.
///
/// Variants fall into two families. Caller-fixable errors (see
/// [`CertFetchError::is_user_error`]) are rendered as an error envelope on
/// structured endpoints. Everything else is an internal failure.
#[derive(Debug, Error, Clone)]
pub enum CertFetchError {
    /// The supplied serial number is not a hex string.
    #[error("Invalid serial number: {0}")]
    InvalidSerial(String),

    /// A caller-fixable condition, such as a missing serial or an unconfigured issuer.
    #[error("{0}")]
    User(String),

    /// The requested path does not name a fetchable resource.
    #[error("Unsupported path: {0}")]
    UnsupportedPath(String),

    /// A stored record exists but cannot be decoded.
    #[error("Error decoding revocation entry for serial {serial}: {reason}")]
    CorruptedRecord { serial: String, reason: String },

    /// The storage backend failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Stored data is inconsistent or corrupted.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Error during data decoding.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),
}

impl CertFetchError {
    /// Returns true when the error is something the caller can fix and should
    /// be reported back to them rather than treated as a server fault.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            CertFetchError::InvalidSerial(_)
                | CertFetchError::User(_)
                | CertFetchError::UnsupportedPath(_)
                | CertFetchError::CorruptedRecord { .. }
        )
    }
}

impl From<der::Error> for CertFetchError {
    /// Converts a `der::Error` into a `CertFetchError`.
    fn from(err: der::Error) -> Self {
        CertFetchError::DecodingError(err.to_string())
    }
}

impl From<pem::PemError> for CertFetchError {
    fn from(err: pem::PemError) -> Self {
        CertFetchError::DecodingError(err.to_string())
    }
}

impl From<serde_json::Error> for CertFetchError {
    fn from(err: serde_json::Error) -> Self {
        CertFetchError::DecodingError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CertFetchError>;
