//! EXECUTE: run the selected agent and turn its work into one message.
//!
//! Failures never escape as errors. Missing credentials, a tool process
//! that will not start, a broken pipe mid-call or a failing model each
//! become an assistant message tagged with the agent and the step, and
//! the turn goes back to SELECT.

use std::sync::Arc;

use relay_mcp::{ConnectionPool, ToolDefinition};
use relay_registry::{AgentDescriptor, AgentRegistry};

use crate::error::Error;
use crate::message::{Failure, FailureKind, FailureStep, Message};
use crate::model::{ModelStep, SubAgentModel, SubAgentRequest, ToolExchange};
use crate::resolver::{self, Credentials};

pub struct Executor {
    model: Arc<dyn SubAgentModel>,
    max_tool_calls: u32,
}

impl Executor {
    pub fn new(model: Arc<dyn SubAgentModel>, max_tool_calls: u32) -> Self {
        Self {
            model,
            max_tool_calls,
        }
    }

    /// Run `agent` against the conversation so far.
    pub async fn execute(
        &self,
        registry: &AgentRegistry,
        agent: &str,
        history: &[Message],
        pool: &mut ConnectionPool,
        credentials: &Credentials,
    ) -> Message {
        let descriptor = match registry.get(agent) {
            Ok(descriptor) => descriptor,
            Err(e) => return failure(agent, FailureKind::ConnectionError, FailureStep::Connection, e),
        };

        let spec = match resolver::resolve_descriptor(descriptor, credentials) {
            Ok(spec) => spec,
            Err(e) => return failure(agent, FailureKind::CredentialError, FailureStep::Credential, e),
        };

        let connection = match pool.connect(&spec, &descriptor.restart_policy).await {
            Ok(connection) => connection,
            Err(e) => return failure(agent, FailureKind::ConnectionError, FailureStep::Connection, e),
        };

        let tools: Vec<ToolDefinition> = connection.tools().to_vec();
        let system_prompt = system_prompt(descriptor);
        let mut exchanges: Vec<ToolExchange> = Vec::new();

        loop {
            if exchanges.len() >= self.max_tool_calls as usize {
                tracing::warn!(agent, calls = exchanges.len(), "Tool call budget ran out");
                return Message::from_agent(
                    agent,
                    format!(
                        "Stopped after {} tool calls: the step budget ran out before a final answer.",
                        exchanges.len()
                    ),
                );
            }

            let request = SubAgentRequest {
                agent,
                system_prompt: &system_prompt,
                history,
                tools: &tools,
                exchanges: &exchanges,
            };
            let step = match self.model.step(request).await {
                Ok(step) => step,
                Err(e) => return failure(agent, FailureKind::ModelError, FailureStep::Model, e),
            };

            match step {
                ModelStep::Respond(text) => {
                    tracing::debug!(agent, calls = exchanges.len(), "Agent responded");
                    return Message::from_agent(agent, text);
                }
                ModelStep::CallTool { name, arguments } => {
                    let result = match connection.invoke(&name, arguments.clone()).await {
                        Ok(result) => result,
                        Err(e) => {
                            return failure(
                                agent,
                                FailureKind::TransportError,
                                FailureStep::ToolInvoke,
                                e,
                            );
                        }
                    };
                    if result.is_error() {
                        tracing::info!(agent, tool = %name, "Tool reported an error");
                    }
                    exchanges.push(ToolExchange {
                        tool: name,
                        arguments,
                        output: result.text_content(),
                        is_error: result.is_error(),
                    });
                }
            }
        }
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("max_tool_calls", &self.max_tool_calls)
            .finish_non_exhaustive()
    }
}

/// The instruction handed to the agent's model.
pub fn system_prompt(descriptor: &AgentDescriptor) -> String {
    let info = &descriptor.prompt_info;
    let mut prompt = format!("You are the '{}' agent.", descriptor.name);
    if !info.expertise.trim().is_empty() {
        prompt.push_str(&format!(" Your expertise: {}.", info.expertise.trim()));
    }
    if info.tool_names.is_empty() {
        prompt.push_str(" You have no tools; answer from the conversation alone.");
    } else {
        prompt.push_str(&format!(
            " Use only these tools: {}.",
            info.tool_names.join(", ")
        ));
    }
    prompt.push_str(" Report the outcome of your work in one reply.");
    prompt
}

fn failure(
    agent: &str,
    kind: FailureKind,
    step: FailureStep,
    error: impl Into<Error>,
) -> Message {
    let error = error.into();
    tracing::warn!(agent, step = %step, error = %error, "Agent step failed");
    Message::agent_failure(agent, Failure::new(kind, step, error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_registry::PromptInfo;

    #[test]
    fn test_system_prompt_lists_expertise_and_tools() {
        let descriptor = AgentDescriptor::new("argent", "node").with_prompt_info(PromptInfo {
            expertise: "Argent account deployment".to_string(),
            tool_names: vec![
                "create_argent_account".to_string(),
                "deploy_argent_account".to_string(),
            ],
        });
        let prompt = system_prompt(&descriptor);
        assert!(prompt.contains("'argent'"));
        assert!(prompt.contains("Argent account deployment"));
        assert!(prompt.contains("create_argent_account, deploy_argent_account"));
    }

    #[test]
    fn test_system_prompt_without_tools() {
        let prompt = system_prompt(&AgentDescriptor::new("notes", "node"));
        assert!(prompt.contains("no tools"));
        assert!(!prompt.contains("expertise"));
    }
}
