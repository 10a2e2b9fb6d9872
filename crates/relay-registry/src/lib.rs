//! Agent registry for the relay router.
//!
//! This crate holds the immutable catalog of addressable agents. Each agent is
//! a named domain handler backed by a tool process; the catalog records how to
//! launch it, which credentials it needs, and how to brief a decision oracle
//! about it.
//!
//! - [`AgentDescriptor`] - launch and prompt metadata for one agent
//! - [`AgentRegistry`] - the name-keyed catalog, validated once at load
//! - [`SharedRegistry`] - atomic snapshot swapping for reloads
//! - [`load_registry`] - parse `[[agents]]` tables from a TOML file

pub mod config;
pub mod descriptor;
pub mod error;
pub mod registry;

/// Default configuration filename looked up by the CLI.
pub const CONFIG_FILENAME: &str = "relay.toml";

pub use config::{load_registry, parse_registry};
pub use descriptor::{AgentDescriptor, AgentProfile, AgentSummary, PromptInfo, RestartPolicy};
pub use error::{Error, Result};
pub use registry::{AgentRegistry, SharedRegistry};
