//! Logging setup

/// Install a `tracing` fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise logs at `debug` or `info`. An already
/// installed global subscriber is left in place.
pub fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };

    let result = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()),
        )
        .with_target(false)
        .with_line_number(debug)
        .with_file(debug)
        .try_init();

    if result.is_err() {
        tracing::debug!("global subscriber already installed");
    }
}
