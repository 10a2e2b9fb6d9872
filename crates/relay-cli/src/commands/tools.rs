//! Commands that talk to a live tool process

use std::sync::Arc;

use colored::Colorize;
use relay_core::{Credentials, RelayConfig, resolver};
use relay_mcp::{ConnectionPool, LaunchSpec, StdioLauncher};
use relay_registry::RestartPolicy;
use serde_json::Value;

use crate::error::{CliError, Result};

/// Run the tools command: handshake with the agent and list its tools.
pub async fn run_tools(
    config: &RelayConfig,
    credentials: &Credentials,
    agent: &str,
    json: bool,
) -> Result<()> {
    let (spec, policy) = launch_spec(config, credentials, agent)?;
    let mut pool = stdio_pool(config);

    let listed = pool
        .connect(&spec, &policy)
        .await
        .map(|connection| connection.tools().to_vec());
    pool.close_all().await;
    let tools = listed?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tools)?);
        return Ok(());
    }

    println!("{} {}", "Tools for".bold(), agent.green().bold());
    println!();
    if tools.is_empty() {
        println!("  {}", "None advertised".dimmed());
    }
    for tool in &tools {
        println!("  {:<28} {}", tool.name.cyan(), tool.description);
    }
    Ok(())
}

/// Run the call command: invoke one tool and print its text output.
pub async fn run_call(
    config: &RelayConfig,
    credentials: &Credentials,
    agent: &str,
    tool: &str,
    args: &str,
) -> Result<()> {
    let arguments: Value = serde_json::from_str(args)?;
    if !arguments.is_object() {
        return Err(CliError::user("--args must be a JSON object"));
    }

    let (spec, policy) = launch_spec(config, credentials, agent)?;
    let mut pool = stdio_pool(config);

    let outcome = match pool.connect(&spec, &policy).await {
        Ok(connection) => connection.invoke(tool, arguments).await,
        Err(e) => Err(e),
    };
    pool.close_all().await;
    let result = outcome?;

    let output = result.text_content();
    if result.is_error() {
        return Err(CliError::user(format!(
            "tool '{tool}' reported an error: {output}"
        )));
    }
    println!("{output}");
    Ok(())
}

fn launch_spec(
    config: &RelayConfig,
    credentials: &Credentials,
    agent: &str,
) -> Result<(LaunchSpec, RestartPolicy)> {
    let descriptor = config.registry.get(agent)?;
    let spec = resolver::resolve_descriptor(descriptor, credentials)?;
    Ok((spec, descriptor.restart_policy))
}

fn stdio_pool(config: &RelayConfig) -> ConnectionPool {
    ConnectionPool::new(Arc::new(StdioLauncher), config.router.transport())
}
