//! Conversation state and routing decisions.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::{Message, Role};

/// Wire label of [`Next::Terminal`].
pub const TERMINAL_LABEL: &str = "__end__";

/// Where the conversation goes after SELECT.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Next {
    Agent(String),
    Terminal,
}

impl Next {
    pub fn agent(&self) -> Option<&str> {
        match self {
            Next::Agent(name) => Some(name),
            Next::Terminal => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Next::Terminal)
    }
}

impl From<String> for Next {
    fn from(label: String) -> Self {
        if label == TERMINAL_LABEL {
            Next::Terminal
        } else {
            Next::Agent(label)
        }
    }
}

impl From<Next> for String {
    fn from(next: Next) -> Self {
        match next {
            Next::Agent(name) => name,
            Next::Terminal => TERMINAL_LABEL.to_string(),
        }
    }
}

impl fmt::Display for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Next::Agent(name) => f.write_str(name),
            Next::Terminal => f.write_str(TERMINAL_LABEL),
        }
    }
}

/// Metadata about the latest routing decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl RoutingInfo {
    /// Last write wins, field by field.
    pub fn merge(&mut self, update: RoutingInfo) {
        if update.reasoning.is_some() {
            self.reasoning = update.reasoning;
        }
        if update.timestamp.is_some() {
            self.timestamp = update.timestamp;
        }
    }
}

/// Output of one SELECT step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub next: Next,
    pub reasoning: String,
}

impl RoutingDecision {
    pub fn terminal(reasoning: impl Into<String>) -> Self {
        Self {
            next: Next::Terminal,
            reasoning: reasoning.into(),
        }
    }

    pub fn agent(name: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self {
            next: Next::Agent(name.into()),
            reasoning: reasoning.into(),
        }
    }
}

/// Everything one session knows about its conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationState {
    pub messages: Vec<Message>,
    pub next: Next,
    #[serde(default)]
    pub routing_info: RoutingInfo,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            next: Next::Terminal,
            routing_info: RoutingInfo::default(),
        }
    }
}

impl ConversationState {
    pub fn latest(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The most recent message with the user role.
    pub fn latest_user(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::User)
    }

    /// A copy of this state with `messages` appended.
    pub fn with_messages<I>(&self, messages: I) -> Self
    where
        I: IntoIterator<Item = Message>,
    {
        let mut next = self.clone();
        next.messages.extend(messages);
        next
    }

    /// A copy of this state with the decision applied.
    pub fn with_decision(&self, decision: &RoutingDecision, at: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.next = decision.next.clone();
        next.routing_info.merge(RoutingInfo {
            reasoning: Some(decision.reasoning.clone()),
            timestamp: Some(at),
        });
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_terminal_serializes_as_sentinel() {
        assert_eq!(serde_json::to_value(Next::Terminal).unwrap(), json!("__end__"));
        assert_eq!(
            serde_json::to_value(Next::Agent("argent".to_string())).unwrap(),
            json!("argent")
        );
        let parsed: Next = serde_json::from_value(json!("__end__")).unwrap();
        assert!(parsed.is_terminal());
    }

    #[test]
    fn test_routing_info_merge_is_last_write_wins() {
        let mut info = RoutingInfo {
            reasoning: Some("first".to_string()),
            timestamp: None,
        };
        let at = Utc::now();
        info.merge(RoutingInfo {
            reasoning: None,
            timestamp: Some(at),
        });
        assert_eq!(info.reasoning.as_deref(), Some("first"));
        assert_eq!(info.timestamp, Some(at));

        info.merge(RoutingInfo {
            reasoning: Some("second".to_string()),
            timestamp: None,
        });
        assert_eq!(info.reasoning.as_deref(), Some("second"));
    }

    #[test]
    fn test_with_decision_leaves_original_untouched() {
        let state = ConversationState::default().with_messages([Message::user("swap 1 ETH")]);
        let decided = state.with_decision(&RoutingDecision::agent("avnu", "swap request"), Utc::now());

        assert!(state.next.is_terminal());
        assert_eq!(decided.next.agent(), Some("avnu"));
        assert_eq!(decided.routing_info.reasoning.as_deref(), Some("swap request"));
        assert_eq!(decided.messages, state.messages);
    }

    #[test]
    fn test_latest_user_skips_agent_replies() {
        let state = ConversationState::default().with_messages([
            Message::user("create an account"),
            Message::from_agent("argent", "done"),
        ]);
        assert_eq!(state.latest_user().unwrap().content, "create an account");
        assert_eq!(state.latest().unwrap().role, Role::Assistant);
    }
}
