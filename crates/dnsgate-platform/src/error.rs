//! Platform-specific errors

use dnsgate_core::{Error, EstablishFailure};
use thiserror::Error;

/// Platform-specific errors
#[derive(Error, Debug)]
pub enum PlatformError {
    /// The host has not granted (or has revoked) tunnel permission
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The tunnel facility cannot be used right now
    #[error("Tunnel unavailable: {0}")]
    Unavailable(String),

    /// The descriptor handed over by the host is not usable
    #[error("Invalid tunnel descriptor {fd}: {message}")]
    InvalidDescriptor {
        /// Raw descriptor number
        fd: i32,
        /// Error message
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Platform result type
pub type Result<T> = std::result::Result<T, PlatformError>;

impl PlatformError {
    /// Establishment failure category reported to the session
    pub fn establish_failure(&self) -> EstablishFailure {
        match self {
            PlatformError::PermissionDenied(_) => EstablishFailure::PermissionDenied,
            PlatformError::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                EstablishFailure::PermissionDenied
            }
            PlatformError::Unavailable(_) => EstablishFailure::Unavailable,
            PlatformError::InvalidDescriptor { .. } | PlatformError::Io(_) => {
                EstablishFailure::Platform
            }
        }
    }
}

impl From<PlatformError> for Error {
    fn from(err: PlatformError) -> Self {
        Error::establish(err.establish_failure(), err.to_string())
    }
}
