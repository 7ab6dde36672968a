use tracing_subscriber::EnvFilter;

/// Map `-v` repetitions to a default filter directive.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "coldstart=info",
        2 => "coldstart=debug",
        _ => "coldstart=trace",
    }
}

/// Install the global subscriber. Logs go to stderr so the report on stdout
/// stays machine-readable. `RUST_LOG` wins over `-v` when set.
pub fn init(verbosity: u8) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {}", e))
}
