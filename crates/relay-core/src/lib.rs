//! Agent routing and orchestration for relay.
//!
//! A turn alternates between two steps until the selector says stop:
//!
//! ```text
//! [ caller ] --TurnInput--> [ Router ]
//!                              |
//!                SELECT: Selector + DecisionOracle -> RoutingDecision
//!                              |
//!                EXECUTE: Executor + SubAgentModel + ConnectionPool
//!                              |
//!                       CheckpointStore (after every step)
//! ```
//!
//! - [`Router`] - opens sessions, runs and resumes turns
//! - [`Selector`] - validates oracle output against the registry
//! - [`Executor`] - runs one agent over its tool process
//! - [`resolver`] - launch specs and credential checks
//! - [`CheckpointStore`] - memory and file-backed snapshots

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod executor;
pub mod graph;
pub mod message;
pub mod model;
pub mod oracle;
pub mod resolver;
pub mod router;
pub mod selector;
pub mod session;
pub mod state;

pub use checkpoint::{
    Checkpoint, CheckpointStore, FileCheckpointStore, MemoryCheckpointStore, RoutingRecord,
};
pub use config::{RelayConfig, RouterSettings};
pub use error::{Error, Result};
pub use executor::Executor;
pub use graph::{Phase, route};
pub use message::{Failure, FailureKind, FailureStep, Message, Role};
pub use model::{ModelStep, ScriptedModel, SubAgentModel, SubAgentRequest, ToolExchange};
pub use oracle::{DecisionOracle, KeywordOracle, OracleVerdict, ScriptedOracle};
pub use resolver::Credentials;
pub use router::{Router, TurnInput, TurnOutput};
pub use selector::Selector;
pub use session::Session;
pub use state::{ConversationState, Next, RoutingDecision, RoutingInfo, TERMINAL_LABEL};
