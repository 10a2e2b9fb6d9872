use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize logging to stderr.
///
/// `RUST_LOG` wins when set. Otherwise the relay crates log at `info`, or
/// at `debug` with `--verbose`. Stdout is left to command output.
pub fn init(verbose: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let default = if verbose {
        "warn,relay=debug,relay_core=debug,relay_mcp=debug,relay_registry=debug"
    } else {
        "warn,relay=info,relay_core=info,relay_mcp=info,relay_registry=info"
    };
    let filter_layer = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .compact();

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_init() {
        // Only the first init in a process succeeds.
        let _ = init(false);
        tracing::info!("logging initialised");
        assert!(init(true).is_err());
    }
}
