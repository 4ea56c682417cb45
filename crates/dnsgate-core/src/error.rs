//! Error types for dnsgate-core
//!
//! Centralized error handling using `thiserror` for ergonomic error definitions.
//! Malformed packets never surface here: the parsers report invalidity as a
//! value and the decision engine turns it into a verdict.

use std::fmt;
use thiserror::Error;

/// Why the platform refused to hand out a tunnel channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstablishFailure {
    /// Tunnel permission was never granted or has been revoked
    PermissionDenied,
    /// The tunnel facility exists but cannot be used right now
    Unavailable,
    /// Any other platform failure
    Platform,
}

impl fmt::Display for EstablishFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EstablishFailure::PermissionDenied => "permission denied",
            EstablishFailure::Unavailable => "unavailable",
            EstablishFailure::Platform => "platform failure",
        };
        f.write_str(s)
    }
}

/// Main error type for dnsgate-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// The tunnel channel could not be established
    #[error("Failed to establish tunnel ({kind}): {message}")]
    TunnelEstablish {
        /// Failure category
        kind: EstablishFailure,
        /// Detailed error message
        message: String,
    },

    /// Tunnel channel read/write failed while the session was running
    #[error("Tunnel I/O error: {0}")]
    TunnelIo(#[source] std::io::Error),

    /// The tunnel channel reported end-of-stream while the session was running
    #[error("Tunnel channel closed by the platform")]
    TunnelClosed,

    /// The blocklist could not be loaded from its source
    #[error("Blocklist source '{source_name}' failed: {message}")]
    BlocklistSource {
        /// Name of the source (file path or label)
        source_name: String,
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path to the missing config file
        path: String,
    },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    ConfigValue {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a tunnel establishment error
    pub fn establish(kind: EstablishFailure, message: impl Into<String>) -> Self {
        Self::TunnelEstablish {
            kind,
            message: message.into(),
        }
    }

    /// Create a permission-denied establishment error
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::establish(EstablishFailure::PermissionDenied, message)
    }

    /// Create a blocklist source error
    pub fn blocklist_source(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BlocklistSource {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create a config value error
    pub fn config_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValue {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Whether this error ended a running session
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, Self::TunnelIo(_) | Self::TunnelClosed)
    }
}
