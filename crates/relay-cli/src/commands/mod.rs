//! Command implementations for relay-cli

pub mod agents;
pub mod check;
pub mod route;
pub mod session;
pub mod tools;

pub use agents::{run_agents_list, run_agents_show};
pub use check::run_check;
pub use route::run_route;
pub use session::{run_session_clear, run_session_list, run_session_show};
pub use tools::{run_call, run_tools};
