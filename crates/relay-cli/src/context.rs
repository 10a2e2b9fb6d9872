//! Shared command context: configuration and credentials.

use std::path::Path;

use relay_core::{Credentials, RelayConfig};
use relay_registry::AgentRegistry;

use crate::error::{CliError, Result};

/// Load `relay.toml`, with a hint when it does not exist.
pub fn load_config(path: &Path) -> Result<RelayConfig> {
    if !path.exists() {
        return Err(CliError::user(format!(
            "configuration file not found: {} (pass --config or set RELAY_CONFIG)",
            path.display()
        )));
    }
    Ok(RelayConfig::load(path)?)
}

/// Credentials for tool processes.
///
/// Values for every variable some agent declares are read from the process
/// environment once, here. `--env` flags are applied on top.
pub fn credentials(registry: &AgentRegistry, flags: &[(String, String)]) -> Credentials {
    let mut credentials: Credentials = registry
        .iter()
        .flat_map(|agent| agent.required_env.iter())
        .filter_map(|name| {
            std::env::var(name)
                .ok()
                .map(|value| (name.clone(), value))
        })
        .collect();

    for (name, value) in flags {
        credentials.insert(name.clone(), value.clone());
    }
    credentials
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_registry::AgentDescriptor;

    #[test]
    fn test_flags_apply_without_environment() {
        let registry = AgentRegistry::from_descriptors(vec![
            AgentDescriptor::new("argent", "/usr/bin/node")
                .with_required_env(["RELAY_CLI_TEST_UNSET_KEY"]),
        ])
        .unwrap();

        let credentials = credentials(
            &registry,
            &[("RELAY_CLI_TEST_UNSET_KEY".to_string(), "0xabc".to_string())],
        );
        assert_eq!(credentials.get("RELAY_CLI_TEST_UNSET_KEY"), Some("0xabc"));
    }

    #[test]
    fn test_undeclared_environment_is_ignored() {
        let registry = AgentRegistry::from_descriptors(vec![AgentDescriptor::new(
            "avnu",
            "/usr/bin/node",
        )])
        .unwrap();
        // PATH is set in any test environment but no agent declares it.
        assert!(credentials(&registry, &[]).is_empty());
    }

    #[test]
    fn test_missing_config_is_a_user_error() {
        let err = load_config(Path::new("/definitely/not/here/relay.toml")).unwrap_err();
        assert!(err.to_string().contains("configuration file not found"));
    }
}
