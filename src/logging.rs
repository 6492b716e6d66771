use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "GQLCHECK_LOG";

/// Installs a stderr subscriber; stdout is reserved for the result line.
///
/// `GQLCHECK_LOG` takes `EnvFilter` directives and wins over `verbose`.
pub fn init(verbose: bool) {
    let default = if verbose { "gqlcheck=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
