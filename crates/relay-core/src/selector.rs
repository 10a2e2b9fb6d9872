//! SELECT: choose the next agent or end the turn.
//!
//! The selector is the only place a turn ends. Whatever the oracle says is
//! checked against the registry; anything that is not an exact agent name
//! becomes TERMINAL.

use std::sync::Arc;

use relay_registry::AgentRegistry;

use crate::oracle::DecisionOracle;
use crate::state::{ConversationState, RoutingDecision};

pub struct Selector {
    oracle: Arc<dyn DecisionOracle>,
    max_hops: u32,
}

impl Selector {
    pub fn new(oracle: Arc<dyn DecisionOracle>, max_hops: u32) -> Self {
        Self { oracle, max_hops }
    }

    pub fn max_hops(&self) -> u32 {
        self.max_hops
    }

    /// Decide where the conversation goes next.
    ///
    /// `hops` is the number of EXECUTE steps already run in this turn.
    /// Never fails: oracle errors and unknown labels clamp to TERMINAL.
    pub async fn select(
        &self,
        registry: &AgentRegistry,
        state: &ConversationState,
        hops: u32,
    ) -> RoutingDecision {
        if hops >= self.max_hops {
            tracing::info!(hops, max_hops = self.max_hops, "Hop budget spent");
            return RoutingDecision::terminal(format!(
                "hop budget of {} spent for this turn",
                self.max_hops
            ));
        }

        let has_content = state
            .latest()
            .is_some_and(|m| !m.content.trim().is_empty());
        if !has_content {
            return RoutingDecision::terminal("latest message is empty");
        }

        let catalog = registry.catalog();
        let verdict = match self.oracle.decide(&state.messages, &catalog).await {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!(error = %e, "Decision oracle failed; ending turn");
                return RoutingDecision::terminal(format!("oracle failed: {e}"));
            }
        };

        match verdict.candidate {
            None => RoutingDecision::terminal(verdict.reasoning),
            Some(label) => {
                let label = label.trim();
                if registry.contains(label) {
                    tracing::debug!(agent = %label, "Oracle choice accepted");
                    RoutingDecision::agent(label, verdict.reasoning)
                } else {
                    tracing::warn!(label = %label, "Oracle proposed an unknown agent; clamping");
                    RoutingDecision::terminal(format!(
                        "no registered agent named '{label}': {}",
                        verdict.reasoning
                    ))
                }
            }
        }
    }
}

impl std::fmt::Debug for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selector")
            .field("max_hops", &self.max_hops)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use crate::oracle::{OracleVerdict, ScriptedOracle};
    use crate::state::Next;
    use relay_registry::AgentDescriptor;
    use rstest::rstest;

    fn registry() -> AgentRegistry {
        AgentRegistry::from_descriptors(vec![
            AgentDescriptor::new("argent", "node"),
            AgentDescriptor::new("avnu", "node"),
        ])
        .unwrap()
    }

    fn scripted(verdict: OracleVerdict) -> Selector {
        Selector::new(Arc::new(ScriptedOracle::new([verdict])), 6)
    }

    fn asking(text: &str) -> ConversationState {
        ConversationState::default().with_messages([Message::user(text)])
    }

    #[tokio::test]
    async fn test_create_argent_account_routes_to_argent() {
        let selector = scripted(OracleVerdict::pick("argent", "account creation"));
        let decision = selector
            .select(&registry(), &asking("I want to create a new Argent account"), 0)
            .await;
        assert_eq!(decision.next, Next::Agent("argent".to_string()));
        assert_eq!(decision.reasoning, "account creation");
    }

    #[tokio::test]
    async fn test_unknown_label_is_terminal() {
        let selector = scripted(OracleVerdict::pick("weather", "forecast request"));
        let decision = selector
            .select(&registry(), &asking("What's the weather today?"), 0)
            .await;
        assert_eq!(decision.next, Next::Terminal);
        assert!(decision.reasoning.contains("weather"));
    }

    #[rstest]
    #[case::padded(" argent\n", Next::Agent("argent".to_string()))]
    #[case::wrong_case("Argent", Next::Terminal)]
    #[case::empty("", Next::Terminal)]
    #[case::sentinel("__end__", Next::Terminal)]
    #[tokio::test]
    async fn test_label_validation(#[case] label: &str, #[case] expected: Next) {
        let selector = scripted(OracleVerdict::pick(label, "because"));
        let decision = selector.select(&registry(), &asking("hi"), 0).await;
        assert_eq!(decision.next, expected);
    }

    #[rstest]
    #[case::no_messages(ConversationState::default())]
    #[case::blank(asking("   \n\t"))]
    #[tokio::test]
    async fn test_empty_input_skips_oracle(#[case] state: ConversationState) {
        let oracle = Arc::new(ScriptedOracle::new([OracleVerdict::pick("argent", "x")]));
        let selector = Selector::new(oracle.clone(), 6);

        let decision = selector.select(&registry(), &state, 0).await;

        assert_eq!(decision.next, Next::Terminal);
        assert_eq!(oracle.remaining(), 1);
    }

    #[tokio::test]
    async fn test_oracle_failure_is_terminal() {
        let selector = Selector::new(Arc::new(ScriptedOracle::new([]).then_fail("rate limited")), 6);
        let decision = selector.select(&registry(), &asking("swap"), 0).await;
        assert_eq!(decision.next, Next::Terminal);
        assert!(decision.reasoning.contains("rate limited"));
    }

    #[tokio::test]
    async fn test_hop_budget_forces_terminal() {
        let oracle = Arc::new(ScriptedOracle::new([OracleVerdict::pick("avnu", "again")]));
        let selector = Selector::new(oracle.clone(), 2);

        let decision = selector.select(&registry(), &asking("swap"), 2).await;

        assert_eq!(decision.next, Next::Terminal);
        assert_eq!(oracle.remaining(), 1);
    }
}
