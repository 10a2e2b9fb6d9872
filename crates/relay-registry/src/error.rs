use std::path::PathBuf;

/// Errors raised while loading or querying the agent catalog.
///
/// Everything except [`Error::UnknownAgent`] is a configuration error: the
/// registry refuses to load rather than run with an ambiguous catalog.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Two descriptors declared the same agent name.
    #[error("duplicate agent name '{name}'")]
    DuplicateAgent { name: String },

    /// A descriptor is missing a field the router cannot work without.
    #[error("invalid agent descriptor '{name}': {reason}")]
    InvalidDescriptor { name: String, reason: String },

    /// Agent name is not in the catalog.
    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    /// Agent configuration file not found.
    #[error("agent configuration not found: {0}")]
    ConfigNotFound(PathBuf),

    /// Agent configuration file is not valid TOML for the descriptor schema.
    #[error("failed to parse agent configuration at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// I/O error reading configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error means the catalog itself is unusable.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Error::UnknownAgent(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
