//! Error types for the tool-process transport

use thiserror::Error;

/// Result type alias for transport operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to a tool process
#[derive(Debug, Error)]
pub enum Error {
    /// The process could not be started at all
    #[error("failed to spawn tool process for '{agent}': {source}")]
    Spawn {
        agent: String,
        #[source]
        source: std::io::Error,
    },

    /// The process started but the MCP handshake did not complete
    #[error("handshake with '{agent}' failed: {reason}")]
    Handshake { agent: String, reason: String },

    /// Writing to or reading from the process failed
    #[error("transport failure talking to '{agent}': {reason}")]
    Transport { agent: String, reason: String },

    /// The process exited while a request was outstanding
    #[error("tool process for '{agent}' exited")]
    ProcessExited { agent: String },

    /// No response arrived in time; the connection itself is still usable
    #[error("'{method}' on '{agent}' timed out after {timeout_ms}ms")]
    Timeout {
        agent: String,
        method: String,
        timeout_ms: u64,
    },

    /// The tool server answered with a JSON-RPC error object
    #[error("tool server error {code}: {message}")]
    Rpc { code: i32, message: String },

    /// A response arrived but did not have the expected shape
    #[error("malformed response from '{agent}': {reason}")]
    Protocol { agent: String, reason: String },

    /// An invoke was attempted on a connection that is not READY
    #[error("connection to '{agent}' is not ready (state: {state})")]
    NotReady { agent: String, state: String },

    /// Every attempt allowed by the restart policy failed
    #[error("could not connect to '{agent}' after {attempts} attempt(s): {last_error}")]
    RestartBudgetExhausted {
        agent: String,
        attempts: u32,
        last_error: String,
    },

    /// Error during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error means the process is gone or unusable, as opposed
    /// to a single call failing on a healthy connection.
    pub fn is_connection_loss(&self) -> bool {
        matches!(
            self,
            Error::Transport { .. } | Error::ProcessExited { .. } | Error::Io(_)
        )
    }
}
