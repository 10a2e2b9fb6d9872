//! The two-step dispatch loop as a pure transition function.
//!
//! ```text
//! START -> SELECT --(next is an agent)--> EXECUTE
//!            ^  \                            |
//!            |   +--(next is TERMINAL)--> TERMINAL
//!            +-------------------------------+
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::state::{ConversationState, Next};

/// The step a session will run next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    Select,
    Execute,
    Terminal,
}

impl Phase {
    /// Where every turn starts.
    pub const START: Phase = Phase::Select;
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Select => write!(f, "SELECT"),
            Phase::Execute => write!(f, "EXECUTE"),
            Phase::Terminal => write!(f, "TERMINAL"),
        }
    }
}

/// The edge out of SELECT.
pub fn route(state: &ConversationState) -> Phase {
    match state.next {
        Next::Agent(_) => Phase::Execute,
        Next::Terminal => Phase::Terminal,
    }
}

/// The phase that follows `completed`, given the state it produced.
pub fn advance(completed: Phase, state: &ConversationState) -> Phase {
    match completed {
        Phase::Select => route(state),
        Phase::Execute => Phase::Select,
        Phase::Terminal => Phase::Terminal,
    }
}
