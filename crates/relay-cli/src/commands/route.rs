//! Selector dry run

use std::sync::Arc;

use colored::Colorize;
use relay_core::{ConversationState, KeywordOracle, Message, Next, RelayConfig, Selector};

use crate::error::Result;

/// Run the route command: one SELECT step, nothing is spawned.
pub async fn run_route(config: &RelayConfig, message: &str) -> Result<()> {
    let selector = Selector::new(Arc::new(KeywordOracle), config.router.max_hops);
    let state = ConversationState::default().with_messages([Message::user(message)]);
    let decision = selector.select(&config.registry, &state, 0).await;

    match &decision.next {
        Next::Agent(name) => println!("{} {}", "=>".blue().bold(), name.green().bold()),
        Next::Terminal => println!("{} {}", "=>".blue().bold(), "no agent".dimmed()),
    }
    println!("{}: {}", "Reasoning".dimmed(), decision.reasoning);
    Ok(())
}
