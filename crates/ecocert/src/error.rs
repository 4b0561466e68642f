//! Error types for certification engine operations

use thiserror::Error;

/// Errors raised by engine operations.
///
/// The first four variants are the domain outcomes every write path can
/// surface. The remaining variants come from the storage and configuration
/// seams.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Accommodation not found: {0}")]
    AccommodationNotFound(String),

    /// Reserved. Expiry is reported through the read path only.
    #[error("Certification expired at height {0}")]
    CertificationExpired(u64),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

/// Coarse classification of an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotAuthorized,
    InvalidInput,
    AccommodationNotFound,
    CertificationExpired,
    Storage,
}

impl ErrorKind {
    /// Stable numeric code for callers that cannot match on Rust enums.
    pub fn code(self) -> u32 {
        match self {
            ErrorKind::NotAuthorized => 100,
            ErrorKind::InvalidInput => 101,
            ErrorKind::AccommodationNotFound => 102,
            ErrorKind::CertificationExpired => 103,
            ErrorKind::Storage => 104,
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotAuthorized(_) => ErrorKind::NotAuthorized,
            Error::InvalidInput(_) | Error::Config(_) => ErrorKind::InvalidInput,
            Error::AccommodationNotFound(_) => ErrorKind::AccommodationNotFound,
            Error::CertificationExpired(_) => ErrorKind::CertificationExpired,
            Error::Database(_) | Error::Serialization(_) | Error::Io(_) => ErrorKind::Storage,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
