//! # Bridge Error Types
//!
//! Lifecycle calls return these to the caller. Streaming calls only log them.

use crate::registry::SubjectKind;
use thiserror::Error;
use vizlink_shared::{RESULT_ERROR, RESULT_PROVIDER_FAILURE};

/// Errors raised inside the bridge.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// Null/empty identifier, bad property list, non-finite transform.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation attempted before a session is active.
    #[error("no active session")]
    NotInitialized,

    /// Bus handle missing or dead.
    #[error("bus provider unavailable")]
    ProviderUnavailable,

    /// One-time subsystem load failed.
    #[error("subsystem bootstrap failed: {0}")]
    SubsystemBootstrapFailure(String),

    /// Subject exists with a different kind.
    #[error("subject '{subject}' is registered as {registered:?}, not {requested:?}")]
    KindMismatch {
        /// The subject name.
        subject: String,
        /// Kind fixed at registration.
        registered: SubjectKind,
        /// Kind the caller asked for.
        requested: SubjectKind,
    },

    /// Property value count does not match the declared schema.
    #[error("property count mismatch for '{subject}': expected {expected}, got {actual}")]
    SchemaMismatch {
        /// The subject name.
        subject: String,
        /// Declared schema length.
        expected: usize,
        /// Values supplied.
        actual: usize,
    },

    /// The bus transport rejected a message.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors returned by `Initialize`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InitError {
    /// Provider name was empty.
    #[error("provider name must not be empty")]
    InvalidArgument,

    /// One-time subsystem load failed.
    #[error("subsystem bootstrap failed: {0}")]
    SubsystemBootstrapFailed(String),

    /// Bus provider handle could not be created.
    #[error("provider creation failed: {0}")]
    ProviderCreationFailed(String),
}

impl InitError {
    /// Stable numeric result code for the embedding layer.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::InvalidArgument | Self::SubsystemBootstrapFailed(_) => RESULT_ERROR,
            Self::ProviderCreationFailed(_) => RESULT_PROVIDER_FAILURE,
        }
    }
}

/// Errors loading [`crate::config::BridgeConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
