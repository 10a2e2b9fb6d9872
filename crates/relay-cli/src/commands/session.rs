//! Session checkpoint commands

use colored::Colorize;
use relay_core::{Checkpoint, CheckpointStore, FileCheckpointStore, Phase, RelayConfig};

use crate::error::{CliError, Result};

fn store(config: &RelayConfig) -> FileCheckpointStore {
    FileCheckpointStore::new(config.router.checkpoint_dir.clone())
}

/// Run the `session list` command
pub fn run_session_list(config: &RelayConfig) -> Result<()> {
    let store = store(config);
    let ids = store.sessions()?;

    println!("{} {}", "Sessions in".bold(), store.dir().display());
    println!();
    if ids.is_empty() {
        println!("  {}", "None".dimmed());
    }
    for id in &ids {
        println!("  {}", id.cyan());
    }
    Ok(())
}

/// Run the `session show` command
pub async fn run_session_show(config: &RelayConfig, id: &str, json: bool) -> Result<()> {
    let checkpoint = store(config)
        .load(id)
        .await?
        .ok_or_else(|| CliError::user(format!("no checkpoint stored for session '{id}'")))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&checkpoint)?);
        return Ok(());
    }
    print_checkpoint(&checkpoint);
    Ok(())
}

/// Run the `session clear` command
pub async fn run_session_clear(config: &RelayConfig, id: &str) -> Result<()> {
    store(config).delete(id).await?;
    println!("{} Cleared session '{}'", "=>".blue().bold(), id.cyan());
    Ok(())
}

fn print_checkpoint(checkpoint: &Checkpoint) {
    println!("{} {}", "Session".bold(), checkpoint.session_id.cyan());
    println!();

    let pending = match checkpoint.pending {
        Phase::Terminal => "idle".green(),
        other => format!("interrupted before {other}").yellow(),
    };
    println!("{}:  {}", "Sequence".dimmed(), checkpoint.sequence);
    println!("{}:   {}", "Pending".dimmed(), pending);
    println!("{}:      {}", "Hops".dimmed(), checkpoint.hops);
    println!();

    println!("{}:", "Messages".bold());
    for message in &checkpoint.state.messages {
        let speaker = match &message.producing_agent {
            Some(agent) => format!("{} ({agent})", message.role),
            None => message.role.to_string(),
        };
        let speaker = if message.is_failure() {
            speaker.red()
        } else {
            speaker.normal()
        };
        println!("  {}: {}", speaker, message.content);
    }
    println!();

    println!("{}:", "Routing Trail".bold());
    for record in &checkpoint.trail {
        println!("  {} {} {}", "->".dimmed(), record.next, record.reasoning.dimmed());
    }
}
