//! Decision oracles
//!
//! An oracle looks at the conversation and the agent catalog and proposes
//! which agent should act next. Its answer is only a suggestion; the
//! selector validates it against the registry.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use relay_registry::AgentSummary;

use crate::error::{Error, Result};
use crate::message::{Message, Role};

/// An oracle's raw answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleVerdict {
    /// Proposed agent label; `None` means no agent fits.
    pub candidate: Option<String>,
    pub reasoning: String,
}

impl OracleVerdict {
    pub fn pick(candidate: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self {
            candidate: Some(candidate.into()),
            reasoning: reasoning.into(),
        }
    }

    pub fn no_match(reasoning: impl Into<String>) -> Self {
        Self {
            candidate: None,
            reasoning: reasoning.into(),
        }
    }
}

/// Proposes the next agent for a conversation.
#[async_trait]
pub trait DecisionOracle: Send + Sync {
    async fn decide(&self, messages: &[Message], catalog: &[AgentSummary]) -> Result<OracleVerdict>;
}

/// Picks the agent whose name is mentioned in the latest message, if that
/// message came from the user.
///
/// Deterministic and offline. Once an agent has answered, the latest
/// message is an assistant message and the oracle stops routing.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordOracle;

#[async_trait]
impl DecisionOracle for KeywordOracle {
    async fn decide(&self, messages: &[Message], catalog: &[AgentSummary]) -> Result<OracleVerdict> {
        let Some(latest) = messages.last() else {
            return Ok(OracleVerdict::no_match("no messages"));
        };
        if latest.role != Role::User {
            return Ok(OracleVerdict::no_match("latest message is not from the user"));
        }

        let mentioned = latest
            .content
            .split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
            .filter(|word| !word.is_empty())
            .find_map(|word| {
                catalog
                    .iter()
                    .find(|agent| agent.name.eq_ignore_ascii_case(word))
            });

        Ok(match mentioned {
            Some(agent) => OracleVerdict::pick(
                agent.name.clone(),
                format!("message mentions '{}'", agent.name),
            ),
            None => OracleVerdict::no_match("no agent is mentioned"),
        })
    }
}

/// Replays a fixed sequence of verdicts, then answers no-match.
///
/// Used to reproduce a recorded conversation exactly.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    verdicts: Mutex<VecDeque<Result<OracleVerdict>>>,
}

impl ScriptedOracle {
    pub fn new<I>(verdicts: I) -> Self
    where
        I: IntoIterator<Item = OracleVerdict>,
    {
        Self {
            verdicts: Mutex::new(verdicts.into_iter().map(Ok).collect()),
        }
    }

    /// Queue a failure to be returned in order.
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.verdicts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(Err(Error::Oracle(message)));
        self
    }

    /// Verdicts not yet consumed.
    pub fn remaining(&self) -> usize {
        self.verdicts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[async_trait]
impl DecisionOracle for ScriptedOracle {
    async fn decide(&self, _messages: &[Message], _catalog: &[AgentSummary]) -> Result<OracleVerdict> {
        self.verdicts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .unwrap_or_else(|| Ok(OracleVerdict::no_match("script exhausted")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn catalog() -> Vec<AgentSummary> {
        ["argent", "avnu", "vesu"]
            .into_iter()
            .map(|name| AgentSummary {
                name: name.to_string(),
                description: String::new(),
                expertise: String::new(),
            })
            .collect()
    }

    #[rstest]
    #[case("I want to create a new Argent account", Some("argent"))]
    #[case("swap on avnu, then lend on vesu", Some("avnu"))]
    #[case("What's the weather today?", None)]
    #[case("argentina is lovely", None)]
    #[tokio::test]
    async fn test_keyword_oracle(#[case] text: &str, #[case] expected: Option<&str>) {
        let verdict = KeywordOracle
            .decide(&[Message::user(text)], &catalog())
            .await
            .unwrap();
        assert_eq!(verdict.candidate.as_deref(), expected);
    }

    #[tokio::test]
    async fn test_keyword_oracle_stops_after_agent_reply() {
        let messages = vec![
            Message::user("create an argent account"),
            Message::from_agent("argent", "Account created"),
        ];
        let verdict = KeywordOracle.decide(&messages, &catalog()).await.unwrap();
        assert!(verdict.candidate.is_none());
    }

    #[tokio::test]
    async fn test_scripted_oracle_replays_then_exhausts() {
        let oracle = ScriptedOracle::new([OracleVerdict::pick("avnu", "swap")]).then_fail("offline");
        assert_eq!(oracle.remaining(), 2);

        let first = oracle.decide(&[], &catalog()).await.unwrap();
        assert_eq!(first.candidate.as_deref(), Some("avnu"));
        assert!(oracle.decide(&[], &catalog()).await.is_err());
        let exhausted = oracle.decide(&[], &catalog()).await.unwrap();
        assert!(exhausted.candidate.is_none());
    }
}
