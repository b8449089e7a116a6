//! Error types for Chatline
//!
//! This module defines all error types used throughout the crate,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Chatline operations
///
/// Covers transport negotiation, configuration loading and the persisted
/// log store. Most failures in the conversation core are logged and
/// swallowed; only registration with the dispatcher is fatal.
#[derive(Error, Debug)]
pub enum ChatlineError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Registering the client with the transport dispatcher failed
    #[error("Couldn't register client with the dispatcher: {0}")]
    Registration(String),

    /// Claiming a dispatch operation failed
    #[error("Failed to claim channel: {0}")]
    Claim(String),

    /// Generic transport failures (send, close, delegate, present)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Persisted log store errors
    #[error("Log store error: {0}")]
    LogStore(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// SQLite errors from the log store
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type alias for Chatline operations
///
/// Uses `anyhow::Error` so callers can attach context while still being
/// able to downcast to [`ChatlineError`].
pub type Result<T> = anyhow::Result<T>;
