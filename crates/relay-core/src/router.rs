//! The router: runs turns through SELECT and EXECUTE until TERMINAL.
//!
//! Every transition is saved to the checkpoint store before the session
//! moves on, so a session reopened from the store picks up exactly at the
//! pending step.

use std::sync::Arc;

use chrono::Utc;
use relay_mcp::{ConnectionPool, Launcher, StdioLauncher, TransportSettings};
use relay_registry::{AgentRegistry, SharedRegistry};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::checkpoint::{Checkpoint, CheckpointStore, RoutingRecord, validate_session_id};
use crate::config::RouterSettings;
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::graph::{self, Phase};
use crate::message::Message;
use crate::model::SubAgentModel;
use crate::oracle::DecisionOracle;
use crate::resolver::Credentials;
use crate::selector::Selector;
use crate::session::Session;
use crate::state::{RoutingDecision, RoutingInfo};

/// What the caller submits for one turn.
#[derive(Debug, Clone, Default)]
pub struct TurnInput {
    pub messages: Vec<Message>,
    pub credentials: Credentials,
}

impl TurnInput {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            credentials: Credentials::default(),
        }
    }

    /// A single user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(vec![Message::user(content)])
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }
}

/// What the caller gets back when a turn reaches TERMINAL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutput {
    pub messages: Vec<Message>,
    pub routing_info: RoutingInfo,
}

pub struct Router {
    registry: SharedRegistry,
    selector: Selector,
    executor: Executor,
    store: Arc<dyn CheckpointStore>,
    launcher: Arc<dyn Launcher>,
    transport: TransportSettings,
}

impl Router {
    pub fn new(
        registry: SharedRegistry,
        oracle: Arc<dyn DecisionOracle>,
        model: Arc<dyn SubAgentModel>,
        store: Arc<dyn CheckpointStore>,
        settings: &RouterSettings,
    ) -> Self {
        Self {
            registry,
            selector: Selector::new(oracle, settings.max_hops),
            executor: Executor::new(model, settings.max_tool_calls),
            store,
            launcher: Arc::new(StdioLauncher),
            transport: settings.transport(),
        }
    }

    /// Use a different way of starting tool processes.
    pub fn with_launcher(mut self, launcher: Arc<dyn Launcher>) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Open a session, restoring it from its last checkpoint if there is one.
    ///
    /// A restored session whose pending step is not TERMINAL was interrupted
    /// mid-turn; [`Router::resume`] finishes that turn.
    pub async fn open_session(&self, id: &str) -> Result<Session> {
        validate_session_id(id)?;
        let checkpoint = match self.store.load(id).await? {
            Some(checkpoint) => {
                tracing::info!(
                    session = %id,
                    sequence = checkpoint.sequence,
                    pending = %checkpoint.pending,
                    "Restored session from checkpoint"
                );
                checkpoint
            }
            None => Checkpoint::initial(id),
        };
        let pool = ConnectionPool::new(Arc::clone(&self.launcher), self.transport);
        Ok(Session::new(checkpoint, pool))
    }

    /// Append the input to the conversation and run until TERMINAL.
    ///
    /// A session interrupted mid-turn is rejected with
    /// [`Error::TurnPending`]; finish it with [`Router::resume`] first. Input
    /// without any non-blank message ends the turn without consulting the
    /// oracle.
    pub async fn run_turn(&self, session: &mut Session, input: TurnInput) -> Result<TurnOutput> {
        if session.pending() != Phase::Terminal {
            return Err(Error::TurnPending {
                session: session.id().to_string(),
                pending: session.pending(),
            });
        }

        tracing::info!(
            session = %session.id(),
            messages = input.messages.len(),
            credentials = ?input.credentials,
            "Starting turn"
        );

        let has_content = input.messages.iter().any(|m| !m.content.trim().is_empty());
        let current = &session.checkpoint;
        let start = Checkpoint {
            pending: Phase::START,
            hops: 0,
            state: current.state.with_messages(input.messages),
            ..current.clone()
        };
        self.commit(session, start).await?;

        if !has_content {
            tracing::info!(session = %session.id(), "Empty input; ending turn");
            let end = successor_of_select(
                &session.checkpoint,
                RoutingDecision::terminal("empty input"),
            );
            self.commit(session, end).await?;
        }
        self.drive(session, &input.credentials).await
    }

    /// Finish an interrupted turn from the session's pending step.
    ///
    /// Credentials are not checkpointed, so they are supplied again here.
    pub async fn resume(&self, session: &mut Session, credentials: Credentials) -> Result<TurnOutput> {
        tracing::info!(session = %session.id(), pending = %session.pending(), "Resuming turn");
        self.drive(session, &credentials).await
    }

    /// Stop every tool process the session owns.
    pub async fn close_session(&self, session: &mut Session) {
        session.pool.close_all().await;
        tracing::debug!(session = %session.id(), "Session closed");
    }

    /// Forget a session's stored checkpoint.
    pub async fn forget_session(&self, id: &str) -> Result<()> {
        validate_session_id(id)?;
        self.store.delete(id).await
    }

    async fn drive(&self, session: &mut Session, credentials: &Credentials) -> Result<TurnOutput> {
        let registry = self.registry.snapshot();
        let token = session.cancel.clone();

        loop {
            let next = match session.checkpoint.pending {
                Phase::Terminal => break,
                Phase::Select => {
                    let Some(decision) = self.select_step(&registry, session, &token).await else {
                        return Err(self.abort(session).await);
                    };
                    successor_of_select(&session.checkpoint, decision)
                }
                Phase::Execute => {
                    let Some(message) =
                        self.execute_step(&registry, session, credentials, &token).await
                    else {
                        return Err(self.abort(session).await);
                    };
                    successor_of_execute(&session.checkpoint, message)
                }
            };
            self.commit(session, next).await?;
        }

        let state = &session.checkpoint.state;
        tracing::info!(
            session = %session.id(),
            messages = state.messages.len(),
            hops = session.checkpoint.hops,
            "Turn complete"
        );
        Ok(TurnOutput {
            messages: state.messages.clone(),
            routing_info: state.routing_info.clone(),
        })
    }

    async fn select_step(
        &self,
        registry: &AgentRegistry,
        session: &Session,
        token: &CancellationToken,
    ) -> Option<RoutingDecision> {
        let checkpoint = &session.checkpoint;
        let decision = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            decision = self.selector.select(registry, &checkpoint.state, checkpoint.hops) => Some(decision),
        };
        let decision = decision?;
        tracing::info!(
            session = %checkpoint.session_id,
            next = %decision.next,
            reasoning = %decision.reasoning,
            "Routing decision"
        );
        Some(decision)
    }

    async fn execute_step(
        &self,
        registry: &AgentRegistry,
        session: &mut Session,
        credentials: &Credentials,
        token: &CancellationToken,
    ) -> Option<Message> {
        let Some(agent) = session.checkpoint.state.next.agent().map(str::to_string) else {
            // Only reachable from a hand-edited checkpoint; SELECT again.
            tracing::warn!(session = %session.id(), "EXECUTE pending without an agent");
            return Some(Message::assistant("No agent was selected."));
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => None,
            message = self.executor.execute(
                registry,
                &agent,
                &session.checkpoint.state.messages,
                &mut session.pool,
                credentials,
            ) => Some(message),
        }
    }

    /// Save `next` and only then make it the session's state.
    async fn commit(&self, session: &mut Session, mut next: Checkpoint) -> Result<()> {
        next.sequence = session.checkpoint.sequence + 1;
        self.store.save(&next).await?;
        tracing::debug!(
            session = %next.session_id,
            sequence = next.sequence,
            pending = %next.pending,
            "Checkpoint saved"
        );
        session.checkpoint = next;
        Ok(())
    }

    async fn abort(&self, session: &mut Session) -> Error {
        session.pool.close_all().await;
        session.cancel = CancellationToken::new();
        tracing::info!(
            session = %session.id(),
            sequence = session.checkpoint.sequence,
            "Turn cancelled; keeping last checkpoint"
        );
        Error::Cancelled {
            session: session.id().to_string(),
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("selector", &self.selector)
            .field("executor", &self.executor)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

fn successor_of_select(current: &Checkpoint, decision: RoutingDecision) -> Checkpoint {
    let state = current.state.with_decision(&decision, Utc::now());
    let mut trail = current.trail.clone();
    trail.push(RoutingRecord {
        next: decision.next,
        reasoning: decision.reasoning,
    });
    Checkpoint {
        pending: graph::advance(Phase::Select, &state),
        state,
        trail,
        ..current.clone()
    }
}

fn successor_of_execute(current: &Checkpoint, message: Message) -> Checkpoint {
    let state = current.state.with_messages([message]);
    Checkpoint {
        pending: graph::advance(Phase::Execute, &state),
        hops: current.hops + 1,
        state,
        ..current.clone()
    }
}
