use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber on stderr
///
/// `RUST_LOG` wins over `log_level`; an unparsable level falls back to info.
pub fn setup_logging(log_level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .with_target(false),
        )
        .try_init()?;

    Ok(())
}

/// Level after applying `-q` flags to the configured one
pub fn effective_level(configured: &str, quiet: u8) -> &str {
    match quiet {
        0 => configured,
        1 => "warn",
        _ => "error",
    }
}
