//! What it takes to start one tool process.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// A fully resolved process launch: binary, argv, and the exact environment.
///
/// The environment holds credential values, so `Debug` prints variable
/// names only.
#[derive(Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub agent: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    /// Working directory for the child, if it should not inherit ours.
    pub working_dir: Option<PathBuf>,
}

impl LaunchSpec {
    pub fn new(agent: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            working_dir: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// `command` followed by `args`.
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

impl fmt::Debug for LaunchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchSpec")
            .field("agent", &self.agent)
            .field("command", &self.command)
            .field("args", &self.args)
            .field("env", &self.env.keys().collect::<Vec<_>>())
            .field("working_dir", &self.working_dir)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_env_values() {
        let spec = LaunchSpec::new("argent", "/usr/bin/node")
            .with_args(["/srv/argent/build/index.js"])
            .with_env("STARKNET_PRIVATE_KEY", "0xdeadbeef");
        let printed = format!("{spec:?}");
        assert!(printed.contains("STARKNET_PRIVATE_KEY"));
        assert!(!printed.contains("0xdeadbeef"));
    }

    #[test]
    fn test_argv() {
        let spec = LaunchSpec::new("argent", "node").with_args(["index.js", "--stdio"]);
        assert_eq!(spec.argv(), vec!["node", "index.js", "--stdio"]);
    }
}
