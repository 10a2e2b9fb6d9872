//! One conversation and the resources it owns.

use relay_mcp::ConnectionPool;
use tokio_util::sync::CancellationToken;

use crate::checkpoint::{Checkpoint, RoutingRecord};
use crate::graph::Phase;
use crate::state::ConversationState;

/// A conversation with its own state, connections and cancellation handle.
///
/// The router only mutates a session through `&mut`, so at most one step
/// runs per session at a time. Fields mirror the last saved checkpoint;
/// nothing here changes until the next snapshot has been stored.
pub struct Session {
    pub(crate) checkpoint: Checkpoint,
    pub(crate) pool: ConnectionPool,
    pub(crate) cancel: CancellationToken,
}

impl Session {
    pub(crate) fn new(checkpoint: Checkpoint, pool: ConnectionPool) -> Self {
        Self {
            checkpoint,
            pool,
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.checkpoint.session_id
    }

    pub fn state(&self) -> &ConversationState {
        &self.checkpoint.state
    }

    /// Routing decisions made so far, oldest first.
    pub fn trail(&self) -> &[RoutingRecord] {
        &self.checkpoint.trail
    }

    /// The step that would run next if the session were resumed.
    pub fn pending(&self) -> Phase {
        self.checkpoint.pending
    }

    /// Sequence number of the last saved checkpoint.
    pub fn sequence(&self) -> u64 {
        self.checkpoint.sequence
    }

    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// A handle that cancels the turn currently running on this session.
    ///
    /// Take it before calling `run_turn`/`resume`. A cancelled handle is
    /// replaced once the cancellation has been handled, so a handle stops
    /// at most one turn.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id())
            .field("sequence", &self.checkpoint.sequence)
            .field("pending", &self.checkpoint.pending)
            .field("messages", &self.checkpoint.state.messages.len())
            .field("pool", &self.pool)
            .finish()
    }
}
