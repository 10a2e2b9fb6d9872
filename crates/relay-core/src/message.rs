//! Conversation messages.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// What went wrong when an agent step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    CredentialError,
    ConnectionError,
    TransportError,
    ModelError,
}

/// Where in the execute step the failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureStep {
    Credential,
    Connection,
    ToolInvoke,
    Model,
}

impl fmt::Display for FailureStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStep::Credential => write!(f, "credential"),
            FailureStep::Connection => write!(f, "connection"),
            FailureStep::ToolInvoke => write!(f, "tool-invoke"),
            FailureStep::Model => write!(f, "model"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub step: FailureStep,
    pub reason: String,
}

impl Failure {
    pub fn new(kind: FailureKind, step: FailureStep, reason: impl Into<String>) -> Self {
        Self {
            kind,
            step,
            reason: reason.into(),
        }
    }
}

/// One entry of the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// The agent whose execute step produced this message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producing_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            producing_agent: None,
            failure: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// An assistant message produced by `agent`.
    pub fn from_agent(agent: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            producing_agent: Some(agent.into()),
            ..Self::assistant(content)
        }
    }

    /// An assistant message reporting that `agent` could not complete its step.
    pub fn agent_failure(agent: impl Into<String>, failure: Failure) -> Self {
        let agent = agent.into();
        let content = format!(
            "Agent '{}' failed during {}: {}",
            agent, failure.step, failure.reason
        );
        Self {
            role: Role::Assistant,
            content,
            producing_agent: Some(agent),
            failure: Some(failure),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}
