//! The set of connections one session owns.

use std::collections::BTreeMap;
use std::sync::Arc;

use relay_registry::RestartPolicy;

use crate::channel::Launcher;
use crate::connection::{AgentConnection, ConnectionState, TransportSettings};
use crate::error::Result;
use crate::launch::LaunchSpec;

/// Lazily created connections keyed by agent name.
///
/// A pool belongs to exactly one session; two sessions selecting the same
/// agent get two processes. Dropping the pool kills whatever is still
/// running.
pub struct ConnectionPool {
    launcher: Arc<dyn Launcher>,
    settings: TransportSettings,
    connections: BTreeMap<String, AgentConnection>,
}

impl ConnectionPool {
    pub fn new(launcher: Arc<dyn Launcher>, settings: TransportSettings) -> Self {
        Self {
            launcher,
            settings,
            connections: BTreeMap::new(),
        }
    }

    /// A READY connection for `spec.agent`, created on first use.
    ///
    /// `policy` is applied on every call, so an existing connection follows
    /// the agent's current restart policy.
    pub async fn connect(
        &mut self,
        spec: &LaunchSpec,
        policy: &RestartPolicy,
    ) -> Result<&mut AgentConnection> {
        let connection = self
            .connections
            .entry(spec.agent.clone())
            .or_insert_with(|| {
                AgentConnection::new(
                    spec.agent.clone(),
                    *policy,
                    self.settings,
                    Arc::clone(&self.launcher),
                )
            });
        connection.set_policy(*policy);
        connection.ensure_ready(spec).await?;
        Ok(connection)
    }

    pub fn get(&self, agent: &str) -> Option<&AgentConnection> {
        self.connections.get(agent)
    }

    /// State of the connection to `agent`; UNCONNECTED if never selected.
    pub fn state(&self, agent: &str) -> ConnectionState {
        self.connections
            .get(agent)
            .map_or(ConnectionState::Unconnected, AgentConnection::state)
    }

    /// Agents this pool has ever connected to, sorted.
    pub fn agents(&self) -> impl Iterator<Item = &str> {
        self.connections.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Close every connection. The pool stays usable afterwards.
    pub async fn close_all(&mut self) {
        for connection in self.connections.values_mut() {
            connection.close().await;
        }
        tracing::debug!(count = self.connections.len(), "Closed all tool connections");
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("connections", &self.connections)
            .finish_non_exhaustive()
    }
}
