//! Turning an agent name plus caller credentials into a launchable process.
//!
//! Arguments may reference the agent's own files through placeholders:
//!
//! | Placeholder         | Value                            |
//! |---------------------|----------------------------------|
//! | `{{agent.dir}}`     | the agent's directory            |
//! | `{{agent.artifact}}`| `directory/artifact`             |
//!
//! Unknown placeholders are left as-is. An argument that is exactly the
//! declared artifact is rewritten to `directory/artifact` as well.

use std::collections::BTreeMap;
use std::fmt;

use relay_mcp::LaunchSpec;
use relay_registry::{AgentDescriptor, AgentRegistry};

use crate::error::{Error, Result};

/// Caller-supplied secrets for one turn.
///
/// Never checkpointed. `Debug` prints names only.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    values: BTreeMap<String, String>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Merge `other` over `self`; entries in `other` win.
    pub fn extend(&mut self, other: Credentials) {
        self.values.extend(other.values);
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Credentials {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

/// Resolve `agent` against the registry.
pub fn resolve(
    registry: &AgentRegistry,
    agent: &str,
    credentials: &Credentials,
) -> Result<LaunchSpec> {
    let descriptor = registry.get(agent)?;
    resolve_descriptor(descriptor, credentials)
}

/// Build the launch spec for one descriptor.
///
/// Fails with every missing credential name, sorted, before anything else
/// is computed.
pub fn resolve_descriptor(
    descriptor: &AgentDescriptor,
    credentials: &Credentials,
) -> Result<LaunchSpec> {
    let missing: Vec<String> = descriptor
        .required_env
        .iter()
        .filter(|name| !credentials.contains(name))
        .cloned()
        .collect();
    if !missing.is_empty() {
        tracing::warn!(agent = %descriptor.name, missing = ?missing, "Missing credentials");
        return Err(Error::MissingCredentials {
            agent: descriptor.name.clone(),
            missing,
        });
    }

    let mut spec = LaunchSpec::new(descriptor.name.clone(), descriptor.command.clone())
        .with_args(resolve_args(descriptor))
        .with_working_dir(descriptor.directory.clone());
    for name in &descriptor.required_env {
        if let Some(value) = credentials.get(name) {
            spec.env.insert(name.clone(), value.to_string());
        }
    }

    tracing::debug!(
        agent = %descriptor.name,
        argv = ?spec.argv(),
        env = ?spec.env.keys().collect::<Vec<_>>(),
        "Resolved launch spec"
    );
    Ok(spec)
}

fn resolve_args(descriptor: &AgentDescriptor) -> Vec<String> {
    let artifact_path = descriptor
        .artifact_path()
        .map(|p| p.to_string_lossy().into_owned());

    if descriptor.args.is_empty() {
        return artifact_path.into_iter().collect();
    }

    let ctx = TemplateContext {
        dir: descriptor.directory.to_string_lossy().into_owned(),
        artifact: artifact_path.clone(),
    };

    descriptor
        .args
        .iter()
        .map(|arg| match (&descriptor.artifact, &artifact_path) {
            (Some(artifact), Some(path)) if arg == artifact => path.clone(),
            _ => substitute(arg, &ctx),
        })
        .collect()
}

struct TemplateContext {
    dir: String,
    artifact: Option<String>,
}

/// Replace `{{...}}` placeholders in a single left-to-right pass.
fn substitute(s: &str, ctx: &TemplateContext) -> String {
    let mut result = String::with_capacity(s.len());
    let mut remaining = s;

    while let Some(start) = remaining.find("{{") {
        result.push_str(&remaining[..start]);

        let Some(end) = remaining[start..].find("}}") else {
            // Unclosed marker, copy the rest literally
            result.push_str(&remaining[start..]);
            remaining = "";
            break;
        };
        let end_abs = start + end + 2;
        let placeholder = &remaining[start..end_abs];

        match (remaining[start + 2..start + end].trim(), &ctx.artifact) {
            ("agent.dir", _) => result.push_str(&ctx.dir),
            ("agent.artifact", Some(artifact)) => result.push_str(artifact),
            _ => result.push_str(placeholder),
        }
        remaining = &remaining[end_abs..];
    }

    result.push_str(remaining);
    result
}
