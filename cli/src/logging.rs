use tracing_subscriber::EnvFilter;

/// Installs the tracing subscriber on stderr.
///
/// `RUST_LOG` wins over the configured level; the default stays at `warn`
/// so log lines do not interleave with replies.
pub fn init_logging(level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or("warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
