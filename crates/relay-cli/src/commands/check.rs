//! Check command implementation

use std::path::Path;

use colored::Colorize;
use relay_core::{Credentials, RelayConfig};
use relay_registry::AgentDescriptor;

use crate::error::{CliError, Result};

/// Run the check command
///
/// Loading the config already validates every descriptor. This adds the
/// checks that depend on the machine: the runtime binary, the agent
/// directory and artifact, and the credentials available right now.
pub fn run_check(config: &RelayConfig, credentials: &Credentials) -> Result<()> {
    println!("{} {}", "Config".bold(), config.path.display());
    println!(
        "  max_hops = {}, max_tool_calls = {}, tool_timeout_ms = {}",
        config.router.max_hops, config.router.max_tool_calls, config.router.tool_timeout_ms
    );
    println!();

    let mut problems = 0;
    for agent in config.registry.iter() {
        let issues = agent_issues(agent);
        let missing = missing_credentials(agent, credentials);

        if issues.is_empty() && missing.is_empty() {
            println!("  {} {}", "ok".green().bold(), agent.name);
            continue;
        }
        if issues.is_empty() {
            println!("  {} {}", "warn".yellow().bold(), agent.name);
        } else {
            println!("  {} {}", "fail".red().bold(), agent.name);
        }
        for issue in &issues {
            println!("       {}", issue);
        }
        if !missing.is_empty() {
            println!(
                "       missing credentials: {} (pass with --env)",
                missing.join(", ").yellow()
            );
        }
        problems += issues.len();
    }

    println!();
    if problems > 0 {
        return Err(CliError::user(format!(
            "{problems} problem(s) found in {}",
            config.path.display()
        )));
    }
    println!("{} {} agents ready.", "Check:".dimmed(), config.registry.len());
    Ok(())
}

/// Launch prerequisites that are missing on disk.
fn agent_issues(agent: &AgentDescriptor) -> Vec<String> {
    let mut issues = Vec::new();
    if !Path::new(&agent.command).is_file() {
        issues.push(format!("runtime binary not found: {}", agent.command));
    }
    if !agent.directory.is_dir() {
        issues.push(format!(
            "agent directory not found: {}",
            agent.directory.display()
        ));
    }
    if let Some(artifact) = agent.artifact_path().filter(|a| !a.is_file()) {
        issues.push(format!("artifact not built: {}", artifact.display()));
    }
    issues
}

fn missing_credentials(agent: &AgentDescriptor, credentials: &Credentials) -> Vec<String> {
    agent
        .required_env
        .iter()
        .filter(|name| !credentials.contains(name))
        .cloned()
        .collect()
}
