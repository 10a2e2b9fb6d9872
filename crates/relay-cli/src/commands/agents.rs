//! Agent catalog commands

use colored::Colorize;
use relay_registry::{AgentDescriptor, AgentRegistry};

use crate::error::Result;

/// Run the `agents list` command
pub fn run_agents_list(registry: &AgentRegistry) -> Result<()> {
    println!("{}", "Registered Agents".bold());
    println!();

    if registry.is_empty() {
        println!("  {} (add [[agents]] tables to the config)", "None".dimmed());
        return Ok(());
    }

    for agent in registry.iter() {
        let requires = if agent.required_env.is_empty() {
            String::new()
        } else {
            let names: Vec<&str> = agent.required_env.iter().map(String::as_str).collect();
            format!(" (requires: {})", names.join(", ")).dimmed().to_string()
        };
        println!("  {:<14} {}{}", agent.name.green(), agent.description, requires);
    }

    println!();
    println!("{} {} agents registered.", "Total:".dimmed(), registry.len());
    Ok(())
}

/// Run the `agents show` command
pub fn run_agents_show(registry: &AgentRegistry, name: &str, json: bool) -> Result<()> {
    let agent = registry.get(name)?;
    if json {
        println!("{}", serde_json::to_string_pretty(agent)?);
        return Ok(());
    }
    print_descriptor(agent);
    Ok(())
}

fn print_descriptor(agent: &AgentDescriptor) {
    println!("{}", agent.name.bold());
    if !agent.description.is_empty() {
        println!("{}", agent.description);
    }
    println!();

    println!("{}:     {}", "Command".dimmed(), agent.command);
    if !agent.args.is_empty() {
        println!("{}:        {}", "Args".dimmed(), agent.args.join(" "));
    }
    println!("{}:   {}", "Directory".dimmed(), agent.directory.display());
    if let Some(artifact) = agent.artifact_path() {
        println!("{}:    {}", "Artifact".dimmed(), artifact.display());
    }

    let policy = &agent.restart_policy;
    let restart = if policy.enabled {
        format!("up to {} attempts, {}ms apart", policy.max_attempts, policy.delay_ms)
    } else {
        "disabled".to_string()
    };
    println!("{}:     {}", "Restart".dimmed(), restart);
    println!();

    println!("{}:", "Required Credentials".bold());
    if agent.required_env.is_empty() {
        println!("  {}", "None".dimmed());
    } else {
        for name in &agent.required_env {
            println!("  {} {}", "-".dimmed(), name.cyan());
        }
    }

    let info = &agent.prompt_info;
    if !info.expertise.is_empty() || !info.tool_names.is_empty() {
        println!();
        println!("{}:", "Prompt".bold());
        if !info.expertise.is_empty() {
            println!("  {}: {}", "Expertise".dimmed(), info.expertise);
        }
        if !info.tool_names.is_empty() {
            println!("  {}:     {}", "Tools".dimmed(), info.tool_names.join(", "));
        }
    }
}
