//! Loading the agent catalog from `relay.toml`.
//!
//! Only the `[[agents]]` tables are read here; other sections of the file
//! (such as `[router]`) belong to other crates and are ignored.

use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

use crate::descriptor::AgentDescriptor;
use crate::error::{Error, Result};
use crate::registry::AgentRegistry;

#[derive(Debug, Default, Deserialize)]
struct AgentsFile {
    #[serde(default)]
    agents: Vec<AgentDescriptor>,
}

/// Read and validate the agent catalog from a TOML file.
///
/// Relative agent directories are resolved against the directory that
/// contains `path`.
pub fn load_registry(path: &Path) -> Result<AgentRegistry> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(Error::Io(e)),
    };

    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let base_dir = std::path::absolute(&base_dir).unwrap_or(base_dir);

    let agents = parse_agents(&content).map_err(|source| Error::ConfigParse {
        path: path.to_path_buf(),
        source,
    })?;
    build(agents, &base_dir)
}

/// Parse a catalog from TOML text, resolving directories against `base_dir`.
pub fn parse_registry(content: &str, base_dir: &Path) -> Result<AgentRegistry> {
    let agents = parse_agents(content).map_err(|source| Error::ConfigParse {
        path: base_dir.to_path_buf(),
        source,
    })?;
    build(agents, base_dir)
}

fn parse_agents(content: &str) -> std::result::Result<Vec<AgentDescriptor>, toml::de::Error> {
    let file: AgentsFile = toml::from_str(content)?;
    Ok(file.agents)
}

fn build(agents: Vec<AgentDescriptor>, base_dir: &Path) -> Result<AgentRegistry> {
    let agents = agents
        .into_iter()
        .map(|mut descriptor| {
            descriptor.directory = resolve_directory(base_dir, &descriptor);
            descriptor.command = resolve_command(&descriptor);
            descriptor
        })
        .collect::<Vec<_>>();
    AgentRegistry::from_descriptors(agents)
}

/// An empty directory defaults to `<base_dir>/<name>`; relative ones are
/// joined onto `base_dir`.
fn resolve_directory(base_dir: &Path, descriptor: &AgentDescriptor) -> PathBuf {
    if descriptor.directory.as_os_str().is_empty() {
        base_dir.join(&descriptor.name)
    } else if descriptor.directory.is_absolute() {
        descriptor.directory.clone()
    } else {
        base_dir.join(&descriptor.directory)
    }
}

/// Resolve the runtime binary once, at load time.
///
/// Tool processes are spawned with a cleared environment, so a bare
/// `node` must already be an absolute path by then. Commands with a path
/// component are taken relative to the agent directory.
fn resolve_command(descriptor: &AgentDescriptor) -> String {
    let command = Path::new(&descriptor.command);
    if command.is_absolute() {
        return descriptor.command.clone();
    }

    let has_separator = command.components().count() > 1
        || matches!(command.components().next(), Some(Component::CurDir));
    if has_separator {
        return descriptor
            .directory
            .join(command)
            .to_string_lossy()
            .into_owned();
    }

    match which::which(command) {
        Ok(path) => path.to_string_lossy().into_owned(),
        Err(e) => {
            tracing::warn!(
                agent = %descriptor.name,
                command = %descriptor.command,
                error = %e,
                "Runtime binary not found on PATH; spawning will fail"
            );
            descriptor.command.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directory_is_named_after_agent() {
        let registry = parse_registry(
            r#"
[[agents]]
name = "argent"
command = "/usr/bin/node"
"#,
            Path::new("/srv/relay"),
        )
        .unwrap();
        assert_eq!(
            registry.lookup("argent").unwrap().directory,
            PathBuf::from("/srv/relay/argent")
        );
    }

    #[test]
    fn test_relative_command_resolves_against_agent_directory() {
        let registry = parse_registry(
            r#"
[[agents]]
name = "scarb"
command = "./bin/scarb-mcp"
directory = "agents/scarb"
"#,
            Path::new("/srv/relay"),
        )
        .unwrap();
        let descriptor = registry.lookup("scarb").unwrap();
        assert_eq!(descriptor.directory, PathBuf::from("/srv/relay/agents/scarb"));
        assert!(descriptor.command.ends_with("bin/scarb-mcp"));
        assert!(descriptor.command.starts_with("/srv/relay/agents/scarb"));
    }

    #[test]
    fn test_unknown_sections_are_ignored() {
        let registry = parse_registry(
            r#"
[router]
max_hops = 3

[[agents]]
name = "swap"
command = "/usr/bin/node"
"#,
            Path::new("/srv/relay"),
        )
        .unwrap();
        assert_eq!(registry.len(), 1);
    }
}
