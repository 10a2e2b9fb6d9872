//! Tool-process transport for relay.
//!
//! Every agent is backed by a child process that speaks MCP (JSON-RPC 2.0,
//! one message per line) on stdin/stdout. This crate launches those
//! processes and keeps one connection per (session, agent):
//!
//! ```text
//! [ ConnectionPool (one per session) ]
//!        |
//!        v
//! [ AgentConnection ] -- state machine + restart policy
//!        |
//!        v
//! [ ToolChannel ] <-- stdio --> [ tool process ]
//! ```
//!
//! It also carries the serving side ([`ToolServer`]) so tool processes can
//! be written in Rust, plus the `fixture-tool-server` binary used by the
//! integration tests.

pub mod channel;
pub mod connection;
pub mod error;
pub mod launch;
pub mod pool;
pub mod protocol;
pub mod server;

pub use channel::{Launcher, StdioChannel, StdioLauncher, ToolChannel};
pub use connection::{AgentConnection, ConnectionState, TransportSettings};
pub use error::{Error, Result};
pub use launch::LaunchSpec;
pub use pool::ConnectionPool;
pub use protocol::{ToolContent, ToolDefinition, ToolResult};
pub use server::{ToolHandler, ToolServer};
