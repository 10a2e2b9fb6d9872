//! Agent descriptors as declared in `relay.toml`.
//!
//! # Example TOML
//!
//! ```toml
//! [[agents]]
//! name = "argent"
//! command = "node"
//! artifact = "build/index.js"
//! required_env = ["STARKNET_PRIVATE_KEY", "STARKNET_PUBLIC_ADDRESS"]
//! description = "Creates and manages Argent wallet accounts"
//!
//! [agents.prompt_info]
//! expertise = "Argent account deployment and key management"
//! tool_names = ["create_argent_account", "deploy_argent_account"]
//!
//! [agents.restart_policy]
//! enabled = true
//! max_attempts = 3
//! delay_ms = 500
//! ```

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    500
}

/// How a crashed or unreachable tool process is brought back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartPolicy {
    /// Whether to retry at all. A disabled policy allows exactly one attempt.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Consecutive connection attempts allowed before the connection closes.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Pause between attempts, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl RestartPolicy {
    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Number of connection attempts this policy permits in a row.
    pub fn attempt_budget(&self) -> u32 {
        if self.enabled {
            self.max_attempts.max(1)
        } else {
            1
        }
    }
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

/// What the decision oracle and sub-agent are told about an agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptInfo {
    /// Free-text area of expertise.
    #[serde(default)]
    pub expertise: String,
    /// Remote tool names the agent is expected to expose, in prompt order.
    #[serde(default)]
    pub tool_names: Vec<String>,
}

/// Immutable description of one addressable agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    /// Unique registry key.
    pub name: String,
    /// Runtime binary used to launch the tool process.
    pub command: String,
    /// Launch arguments. May contain `{{agent.dir}}` and `{{agent.artifact}}`.
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment variable names the tool process needs. Values are never
    /// stored here; they arrive per call.
    #[serde(default)]
    pub required_env: BTreeSet<String>,
    /// Human-readable summary.
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub prompt_info: PromptInfo,
    /// The agent's own root directory. Relative paths are resolved against
    /// the configuration file at load time.
    #[serde(default)]
    pub directory: PathBuf,
    /// Build artifact (entrypoint) relative to [`AgentDescriptor::directory`].
    #[serde(default)]
    pub artifact: Option<String>,
    #[serde(default)]
    pub restart_policy: RestartPolicy,
}

impl AgentDescriptor {
    /// Create a descriptor with just a name and launch command.
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            required_env: BTreeSet::new(),
            description: String::new(),
            prompt_info: PromptInfo::default(),
            directory: PathBuf::new(),
            artifact: None,
            restart_policy: RestartPolicy::default(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_required_env<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_env = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_prompt_info(mut self, prompt_info: PromptInfo) -> Self {
        self.prompt_info = prompt_info;
        self
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    pub fn with_artifact(mut self, artifact: impl Into<String>) -> Self {
        self.artifact = Some(artifact.into());
        self
    }

    pub fn with_restart_policy(mut self, policy: RestartPolicy) -> Self {
        self.restart_policy = policy;
        self
    }

    /// Absolute path of the build artifact, if one is declared.
    pub fn artifact_path(&self) -> Option<PathBuf> {
        self.artifact.as_ref().map(|a| self.directory.join(a))
    }

    /// Check the fields the router relies on.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Error::InvalidDescriptor {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if self.name.trim() != self.name {
            return Err(invalid("name must not have surrounding whitespace"));
        }
        if self.name.starts_with("__") {
            return Err(invalid("names starting with '__' are reserved"));
        }
        if self.command.trim().is_empty() {
            return Err(invalid("command must not be empty"));
        }
        if self.required_env.iter().any(|v| v.trim().is_empty()) {
            return Err(invalid("required_env entries must not be empty"));
        }
        if self
            .artifact
            .as_ref()
            .is_some_and(|a| PathBuf::from(a).is_absolute())
        {
            return Err(invalid("artifact must be relative to the agent directory"));
        }
        Ok(())
    }

    /// The slice of the descriptor exposed through `describe`.
    pub fn profile(&self) -> AgentProfile {
        AgentProfile {
            description: self.description.clone(),
            prompt_info: self.prompt_info.clone(),
        }
    }

    /// Short catalog entry used to brief a decision oracle.
    pub fn summary(&self) -> AgentSummary {
        AgentSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            expertise: self.prompt_info.expertise.clone(),
        }
    }
}

/// Result of `describe(name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub description: String,
    pub prompt_info: PromptInfo,
}

/// One line of the catalog handed to a decision oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub name: String,
    pub description: String,
    pub expertise: String,
}
