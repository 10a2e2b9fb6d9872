//! Error types for relay-core

use std::path::PathBuf;

use thiserror::Error;

use crate::graph::Phase;

/// Result type alias for relay-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while routing a conversation
#[derive(Debug, Error)]
pub enum Error {
    /// Catalog errors (unknown agent, bad descriptor)
    #[error(transparent)]
    Registry(#[from] relay_registry::Error),

    /// Tool-process transport errors
    #[error(transparent)]
    Transport(#[from] relay_mcp::Error),

    /// Required credentials were not supplied; nothing was spawned
    #[error("agent '{agent}' is missing credentials: {}", missing.join(", "))]
    MissingCredentials { agent: String, missing: Vec<String> },

    /// The decision oracle could not produce a verdict
    #[error("decision oracle failed: {0}")]
    Oracle(String),

    /// The sub-agent model could not produce a step
    #[error("sub-agent model failed: {0}")]
    Model(String),

    /// The turn was cancelled; the last checkpoint is untouched
    #[error("turn cancelled for session '{session}'")]
    Cancelled { session: String },

    /// The session still has an interrupted turn to finish
    #[error("session '{session}' has an unfinished turn pending {pending}; resume it first")]
    TurnPending { session: String, pending: Phase },

    /// Session ids become file names, so they are restricted
    #[error("invalid session id '{0}'")]
    InvalidSessionId(String),

    /// Checkpoint storage failed
    #[error("checkpoint store error at {path}: {message}")]
    Checkpoint { path: PathBuf, message: String },

    /// Configuration file errors
    #[error("invalid configuration in {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
