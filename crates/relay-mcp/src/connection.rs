//! Per-agent connection lifecycle.
//!
//! ```text
//! UNCONNECTED -> CONNECTING -> READY -> CRASHED -> CONNECTING ...
//!                     |                    |
//!                     +------> CLOSED <----+
//! ```
//!
//! Attempts are consecutive connection attempts; reaching READY resets
//! them. When the restart policy's budget is spent the connection goes to
//! CLOSED and the caller gets one error. The next `ensure_ready` starts over
//! as if the connection were new.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use relay_registry::RestartPolicy;
use serde_json::{Value, json};

use crate::channel::{Launcher, ToolChannel};
use crate::error::{Error, Result};
use crate::launch::LaunchSpec;
use crate::protocol::{
    Implementation, InitializeParams, InitializeResult, ListToolsResult, PROTOCOL_VERSION,
    ToolCallParams, ToolDefinition, ToolResult,
};

/// Timeouts applied to requests on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportSettings {
    /// Limit for each `tools/call`
    pub request_timeout: Duration,
    /// Limit for each handshake request
    pub handshake_timeout: Duration,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            handshake_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unconnected,
    Connecting,
    Ready,
    Crashed,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Unconnected => "unconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Ready => "ready",
            ConnectionState::Crashed => "crashed",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// One agent's tool process as seen by one session.
pub struct AgentConnection {
    agent: String,
    policy: RestartPolicy,
    settings: TransportSettings,
    launcher: Arc<dyn Launcher>,
    state: ConnectionState,
    attempts: u32,
    channel: Option<Box<dyn ToolChannel>>,
    tools: Vec<ToolDefinition>,
}

impl AgentConnection {
    pub fn new(
        agent: impl Into<String>,
        policy: RestartPolicy,
        settings: TransportSettings,
        launcher: Arc<dyn Launcher>,
    ) -> Self {
        Self {
            agent: agent.into(),
            policy,
            settings,
            launcher,
            state: ConnectionState::Unconnected,
            attempts: 0,
            channel: None,
            tools: Vec::new(),
        }
    }

    pub fn agent(&self) -> &str {
        &self.agent
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Replace the restart policy; takes effect on the next `ensure_ready`.
    pub fn set_policy(&mut self, policy: RestartPolicy) {
        self.policy = policy;
    }

    /// Consecutive failed-or-in-progress attempts since the last READY.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Tools advertised during the last successful handshake.
    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// Bring the connection to READY, spawning or restarting as needed.
    pub async fn ensure_ready(&mut self, spec: &LaunchSpec) -> Result<&[ToolDefinition]> {
        self.check_liveness().await;

        match self.state {
            ConnectionState::Ready => return Ok(&self.tools),
            ConnectionState::Unconnected | ConnectionState::Closed => self.attempts = 0,
            ConnectionState::Crashed | ConnectionState::Connecting => {}
        }

        let budget = self.policy.attempt_budget();
        let mut last_error = String::new();
        loop {
            if self.attempts >= budget {
                let attempts = self.attempts;
                self.state = ConnectionState::Closed;
                self.attempts = 0;
                tracing::error!(
                    agent = %self.agent,
                    attempts,
                    error = %last_error,
                    "Restart budget exhausted; connection closed"
                );
                return Err(Error::RestartBudgetExhausted {
                    agent: self.agent.clone(),
                    attempts,
                    last_error,
                });
            }

            if self.attempts > 0 && self.policy.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.policy.delay_ms)).await;
            }

            self.attempts += 1;
            self.state = ConnectionState::Connecting;
            tracing::info!(agent = %self.agent, attempt = self.attempts, "Connecting to tool process");

            match self.connect(spec).await {
                Ok(()) => {
                    self.state = ConnectionState::Ready;
                    self.attempts = 0;
                    tracing::info!(
                        agent = %self.agent,
                        tools = self.tools.len(),
                        "Tool process ready"
                    );
                    return Ok(&self.tools);
                }
                Err(e) => {
                    tracing::warn!(
                        agent = %self.agent,
                        attempt = self.attempts,
                        error = %e,
                        "Connection attempt failed"
                    );
                    self.state = ConnectionState::Crashed;
                    last_error = e.to_string();
                }
            }
        }
    }

    /// Call a remote tool on a READY connection.
    ///
    /// Errors reported by the tool server (JSON-RPC error objects or
    /// `isError` results) come back as an error [`ToolResult`]. A timeout
    /// fails only this call. Anything that means the process is gone moves
    /// the connection to CRASHED.
    pub async fn invoke(&mut self, tool: &str, arguments: Value) -> Result<ToolResult> {
        let channel = match (self.state, self.channel.as_mut()) {
            (ConnectionState::Ready, Some(channel)) => channel,
            _ => {
                return Err(Error::NotReady {
                    agent: self.agent.clone(),
                    state: self.state.to_string(),
                });
            }
        };

        let params = serde_json::to_value(ToolCallParams {
            name: tool.to_string(),
            arguments,
        })?;

        tracing::debug!(agent = %self.agent, tool, "Invoking tool");
        match channel
            .request("tools/call", params, self.settings.request_timeout)
            .await
        {
            Ok(value) => serde_json::from_value(value).map_err(|e| Error::Protocol {
                agent: self.agent.clone(),
                reason: format!("invalid tools/call result: {e}"),
            }),
            Err(Error::Rpc { code, message }) => {
                Ok(ToolResult::error(format!("{message} (code {code})")))
            }
            Err(e @ Error::Timeout { .. }) => Err(e),
            Err(e) => {
                tracing::warn!(agent = %self.agent, error = %e, "Tool process lost during invoke");
                self.state = ConnectionState::Crashed;
                self.teardown().await;
                Err(e)
            }
        }
    }

    /// Stop the process. The connection can be brought up again later.
    pub async fn close(&mut self) {
        self.teardown().await;
        self.state = ConnectionState::Closed;
        self.attempts = 0;
    }

    async fn check_liveness(&mut self) {
        if self.state != ConnectionState::Ready {
            return;
        }
        let alive = self.channel.as_mut().is_some_and(|c| c.is_alive());
        if !alive {
            tracing::warn!(agent = %self.agent, "Tool process exited unexpectedly");
            self.state = ConnectionState::Crashed;
            self.teardown().await;
        }
    }

    async fn connect(&mut self, spec: &LaunchSpec) -> Result<()> {
        self.teardown().await;
        let mut channel = self.launcher.launch(spec).await?;
        match handshake(channel.as_mut(), &self.agent, self.settings.handshake_timeout).await {
            Ok(tools) => {
                self.tools = tools;
                self.channel = Some(channel);
                Ok(())
            }
            Err(e) => {
                channel.close().await;
                Err(e)
            }
        }
    }

    async fn teardown(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close().await;
        }
    }
}

impl fmt::Debug for AgentConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConnection")
            .field("agent", &self.agent)
            .field("state", &self.state)
            .field("attempts", &self.attempts)
            .field("tools", &self.tools.len())
            .finish()
    }
}

/// `initialize`, `notifications/initialized`, then `tools/list`.
async fn handshake(
    channel: &mut dyn ToolChannel,
    agent: &str,
    timeout: Duration,
) -> Result<Vec<ToolDefinition>> {
    let failed = |reason: String| Error::Handshake {
        agent: agent.to_string(),
        reason,
    };

    let params = serde_json::to_value(InitializeParams {
        protocol_version: PROTOCOL_VERSION.to_string(),
        capabilities: json!({}),
        client_info: Implementation {
            name: "relay".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    })?;

    let init = channel
        .request("initialize", params, timeout)
        .await
        .map_err(|e| failed(format!("initialize: {e}")))?;
    let init: InitializeResult =
        serde_json::from_value(init).map_err(|e| failed(format!("initialize result: {e}")))?;
    if init.protocol_version != PROTOCOL_VERSION {
        tracing::warn!(
            agent,
            server_version = %init.protocol_version,
            "Tool server speaks a different protocol revision"
        );
    }
    tracing::debug!(
        agent,
        server = %init.server_info.name,
        version = %init.server_info.version,
        "Handshake initialized"
    );

    channel
        .notify("notifications/initialized", Value::Null)
        .await
        .map_err(|e| failed(format!("initialized notification: {e}")))?;

    let listed = channel
        .request("tools/list", json!({}), timeout)
        .await
        .map_err(|e| failed(format!("tools/list: {e}")))?;
    let listed: ListToolsResult =
        serde_json::from_value(listed).map_err(|e| failed(format!("tools/list result: {e}")))?;
    Ok(listed.tools)
}
