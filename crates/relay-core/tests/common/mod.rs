//! Shared fixtures: an in-process tool server behind the `Launcher` seam.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use relay_core::{
    Credentials, DecisionOracle, MemoryCheckpointStore, RouterSettings, Router, SubAgentModel,
};
use relay_mcp::protocol::{JsonRpcRequest, JsonRpcResponse};
use relay_mcp::{
    Error, LaunchSpec, Launcher, Result, ToolChannel, ToolDefinition, ToolHandler, ToolResult,
    ToolServer,
};
use relay_registry::{AgentDescriptor, AgentRegistry, PromptInfo, RestartPolicy, SharedRegistry};
use serde_json::{Value, json};

/// Demo tools every in-process agent exposes.
struct DemoTools {
    agent: String,
}

#[async_trait]
impl ToolHandler for DemoTools {
    fn name(&self) -> &str {
        &self.agent
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        ["echo", "create_argent_account", "fail", "hang", "crash"]
            .into_iter()
            .map(|name| ToolDefinition {
                name: name.to_string(),
                description: String::new(),
                input_schema: json!({"type": "object"}),
            })
            .collect()
    }

    async fn call(&self, name: &str, arguments: Value) -> ToolResult {
        match name {
            "echo" => ToolResult::text(arguments["text"].as_str().unwrap_or_default()),
            "create_argent_account" => ToolResult::text("account 0x04a1 deployed"),
            "fail" => ToolResult::error("insufficient balance"),
            other => ToolResult::error(format!("{other} is handled by the channel")),
        }
    }
}

/// A tool "process" that is really a `ToolServer` in memory.
struct InProcessChannel {
    agent: String,
    server: ToolServer<DemoTools>,
    alive: bool,
    next_id: u64,
}

impl InProcessChannel {
    async fn exchange(&mut self, request: &JsonRpcRequest) -> Result<Option<JsonRpcResponse>> {
        let line = serde_json::to_string(request)?;
        match self.server.handle_message(&line).await? {
            Some(response) => Ok(Some(serde_json::from_str(&response)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ToolChannel for InProcessChannel {
    async fn request(&mut self, method: &str, params: Value, _timeout: Duration) -> Result<Value> {
        if !self.alive {
            return Err(Error::ProcessExited {
                agent: self.agent.clone(),
            });
        }
        if method == "tools/call" {
            match params["name"].as_str() {
                Some("hang") => return std::future::pending::<Result<Value>>().await,
                Some("crash") => {
                    self.alive = false;
                    return Err(Error::ProcessExited {
                        agent: self.agent.clone(),
                    });
                }
                _ => {}
            }
        }

        self.next_id += 1;
        let request = JsonRpcRequest::new(self.next_id, method, params);
        let response = self.exchange(&request).await?.ok_or_else(|| Error::Protocol {
            agent: self.agent.clone(),
            reason: "no response".to_string(),
        })?;
        match (response.result, response.error) {
            (_, Some(error)) => Err(Error::Rpc {
                code: error.code,
                message: error.message,
            }),
            (Some(result), None) => Ok(result),
            (None, None) => Err(Error::Protocol {
                agent: self.agent.clone(),
                reason: "empty response".to_string(),
            }),
        }
    }

    async fn notify(&mut self, method: &str, params: Value) -> Result<()> {
        self.exchange(&JsonRpcRequest::notification(method, params))
            .await
            .map(|_| ())
    }

    fn is_alive(&mut self) -> bool {
        self.alive
    }

    async fn close(&mut self) {
        self.alive = false;
    }
}

/// Records every launch; agents listed in `broken` never start.
#[derive(Default)]
pub struct InProcessLauncher {
    launches: Mutex<Vec<LaunchSpec>>,
    broken: BTreeSet<String>,
}

impl InProcessLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn breaking(agents: &[&str]) -> Self {
        Self {
            launches: Mutex::new(Vec::new()),
            broken: agents.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn launch_count(&self) -> usize {
        self.launches.lock().unwrap().len()
    }

    pub fn launches_for(&self, agent: &str) -> usize {
        self.launches
            .lock()
            .unwrap()
            .iter()
            .filter(|spec| spec.agent == agent)
            .count()
    }

    /// Environment variable names of each launch of `agent`.
    pub fn env_names(&self, agent: &str) -> Vec<Vec<String>> {
        self.launches
            .lock()
            .unwrap()
            .iter()
            .filter(|spec| spec.agent == agent)
            .map(|spec| spec.env.keys().cloned().collect())
            .collect()
    }
}

#[async_trait]
impl Launcher for InProcessLauncher {
    async fn launch(&self, spec: &LaunchSpec) -> Result<Box<dyn ToolChannel>> {
        self.launches.lock().unwrap().push(spec.clone());
        if self.broken.contains(&spec.agent) {
            return Err(Error::Spawn {
                agent: spec.agent.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such runtime"),
            });
        }
        Ok(Box::new(InProcessChannel {
            agent: spec.agent.clone(),
            server: ToolServer::new(DemoTools {
                agent: spec.agent.clone(),
            }),
            alive: true,
            next_id: 0,
        }))
    }
}

pub fn quick_restart(max_attempts: u32) -> RestartPolicy {
    RestartPolicy {
        enabled: true,
        max_attempts,
        delay_ms: 0,
    }
}

/// `argent` (needs two credentials) and `avnu` (needs none).
pub fn registry() -> AgentRegistry {
    AgentRegistry::from_descriptors(vec![
        AgentDescriptor::new("argent", "/usr/bin/node")
            .with_directory("/srv/agents/argent")
            .with_artifact("build/index.js")
            .with_required_env(["STARKNET_PRIVATE_KEY", "STARKNET_PUBLIC_ADDRESS"])
            .with_description("Creates and deploys Argent accounts")
            .with_prompt_info(PromptInfo {
                expertise: "Argent account creation".to_string(),
                tool_names: vec!["create_argent_account".to_string()],
            })
            .with_restart_policy(quick_restart(3)),
        AgentDescriptor::new("avnu", "/usr/bin/node")
            .with_directory("/srv/agents/avnu")
            .with_artifact("build/index.js")
            .with_description("Token swaps")
            .with_restart_policy(quick_restart(2)),
    ])
    .unwrap()
}

pub fn argent_credentials() -> Credentials {
    Credentials::new()
        .with("STARKNET_PRIVATE_KEY", "0xprivate")
        .with("STARKNET_PUBLIC_ADDRESS", "0xpublic")
        .with("OPENAI_API_KEY", "not-for-agents")
}

pub fn settings() -> RouterSettings {
    RouterSettings {
        max_hops: 4,
        max_tool_calls: 3,
        ..RouterSettings::default()
    }
}

pub struct Harness {
    pub router: Router,
    pub launcher: Arc<InProcessLauncher>,
    pub store: Arc<MemoryCheckpointStore>,
}

pub fn harness(
    oracle: Arc<dyn DecisionOracle>,
    model: Arc<dyn SubAgentModel>,
    launcher: InProcessLauncher,
    settings: RouterSettings,
) -> Harness {
    let launcher = Arc::new(launcher);
    let store = Arc::new(MemoryCheckpointStore::new());
    let router = Router::new(
        SharedRegistry::new(registry()),
        oracle,
        model,
        store.clone(),
        &settings,
    )
    .with_launcher(launcher.clone());
    Harness {
        router,
        launcher,
        store,
    }
}
