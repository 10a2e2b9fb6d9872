//! The sub-agent model seam.
//!
//! During EXECUTE the chosen agent's model is stepped repeatedly: each step
//! either asks for a tool call or gives the final answer.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use relay_mcp::ToolDefinition;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::message::Message;

/// What the model wants to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelStep {
    CallTool { name: String, arguments: Value },
    Respond(String),
}

/// A completed tool call, as fed back to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolExchange {
    pub tool: String,
    pub arguments: Value,
    pub output: String,
    /// The tool reported failure (`isError`)
    pub is_error: bool,
}

/// Everything the model sees for one step.
#[derive(Debug, Clone, Copy)]
pub struct SubAgentRequest<'a> {
    pub agent: &'a str,
    pub system_prompt: &'a str,
    pub history: &'a [Message],
    pub tools: &'a [ToolDefinition],
    /// Tool calls already made in this EXECUTE step, oldest first
    pub exchanges: &'a [ToolExchange],
}

#[async_trait]
pub trait SubAgentModel: Send + Sync {
    async fn step(&self, request: SubAgentRequest<'_>) -> Result<ModelStep>;
}

/// Replays recorded model steps in order, then answers with a fixed reply.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    steps: Mutex<VecDeque<Result<ModelStep>>>,
}

impl ScriptedModel {
    pub fn new<I>(steps: I) -> Self
    where
        I: IntoIterator<Item = ModelStep>,
    {
        Self {
            steps: Mutex::new(steps.into_iter().map(Ok).collect()),
        }
    }

    pub fn then_fail(self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.lock().push_back(Err(Error::Model(message)));
        self
    }

    pub fn remaining(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<ModelStep>>> {
        self.steps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SubAgentModel for ScriptedModel {
    async fn step(&self, request: SubAgentRequest<'_>) -> Result<ModelStep> {
        self.lock().pop_front().unwrap_or_else(|| {
            Ok(ModelStep::Respond(format!(
                "{} has nothing further to add",
                request.agent
            )))
        })
    }
}
