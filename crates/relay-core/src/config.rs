//! Router configuration
//!
//! `relay.toml` holds both the agent catalog (`[[agents]]`, read by
//! `relay-registry`) and the router limits (`[router]`, read here).
//!
//! ```toml
//! [router]
//! max_hops = 6
//! max_tool_calls = 8
//! tool_timeout_ms = 30000
//! checkpoint_dir = ".relay/checkpoints"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use relay_mcp::TransportSettings;
use relay_registry::AgentRegistry;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

fn default_max_hops() -> u32 {
    6
}

fn default_max_tool_calls() -> u32 {
    8
}

fn default_tool_timeout_ms() -> u64 {
    30_000
}

fn default_handshake_timeout_ms() -> u64 {
    30_000
}

fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from(".relay/checkpoints")
}

/// Limits and locations for the router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterSettings {
    /// EXECUTE steps allowed per turn before SELECT forces TERMINAL
    #[serde(default = "default_max_hops")]
    pub max_hops: u32,

    /// Tool calls allowed per EXECUTE step
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls: u32,

    #[serde(default = "default_tool_timeout_ms")]
    pub tool_timeout_ms: u64,

    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,

    /// Relative paths resolve against the config file's directory
    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: PathBuf,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            max_hops: default_max_hops(),
            max_tool_calls: default_max_tool_calls(),
            tool_timeout_ms: default_tool_timeout_ms(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
            checkpoint_dir: default_checkpoint_dir(),
        }
    }
}

impl RouterSettings {
    pub fn transport(&self) -> TransportSettings {
        TransportSettings {
            request_timeout: Duration::from_millis(self.tool_timeout_ms),
            handshake_timeout: Duration::from_millis(self.handshake_timeout_ms),
        }
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let invalid = |message: &str| Error::Config {
            path: path.to_path_buf(),
            message: message.to_string(),
        };
        if self.tool_timeout_ms == 0 {
            return Err(invalid("router.tool_timeout_ms must be greater than zero"));
        }
        if self.handshake_timeout_ms == 0 {
            return Err(invalid("router.handshake_timeout_ms must be greater than zero"));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct RouterSection {
    #[serde(default)]
    router: RouterSettings,
}

/// Everything loaded from one `relay.toml`.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub path: PathBuf,
    pub router: RouterSettings,
    pub registry: AgentRegistry,
}

impl RelayConfig {
    /// Load the router settings and the agent catalog from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let registry = relay_registry::load_registry(path)?;

        let content = std::fs::read_to_string(path)?;
        let section: RouterSection = toml::from_str(&content).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut router = section.router;
        router.validate(path)?;

        if router.checkpoint_dir.is_relative() {
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            router.checkpoint_dir = base.join(&router.checkpoint_dir);
        }

        tracing::debug!(
            path = %path.display(),
            agents = registry.len(),
            max_hops = router.max_hops,
            "Loaded relay configuration"
        );

        Ok(Self {
            path: path.to_path_buf(),
            router,
            registry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = RouterSettings::default();
        assert_eq!(settings.max_hops, 6);
        assert_eq!(settings.max_tool_calls, 8);
        assert_eq!(settings.transport().request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_load_without_router_section_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("relay.toml");
        std::fs::write(
            &path,
            "[[agents]]\nname = \"argent\"\ncommand = \"/usr/bin/node\"\n",
        )
        .unwrap();

        let config = RelayConfig::load(&path).unwrap();
        assert_eq!(config.router.max_hops, 6);
        assert_eq!(config.registry.len(), 1);
        assert_eq!(
            config.router.checkpoint_dir,
            temp.path().join(".relay/checkpoints")
        );
    }

    #[test]
    fn test_partial_router_section() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("relay.toml");
        std::fs::write(
            &path,
            "[router]\nmax_hops = 2\ncheckpoint_dir = \"/var/lib/relay\"\n",
        )
        .unwrap();

        let config = RelayConfig::load(&path).unwrap();
        assert_eq!(config.router.max_hops, 2);
        assert_eq!(config.router.max_tool_calls, 8);
        assert_eq!(config.router.checkpoint_dir, PathBuf::from("/var/lib/relay"));
        assert!(config.registry.is_empty());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("relay.toml");
        std::fs::write(&path, "[router]\ntool_timeout_ms = 0\n").unwrap();

        let err = RelayConfig::load(&path).unwrap_err();
        assert!(matches!(err, Error::Config { .. }), "got {err}");
    }
}
