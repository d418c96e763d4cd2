/// Logging setup.
///
/// There is no config file driving this: verbosity comes from `-v/--verbose`
/// and `--debug-dns`, same as every other option, with `RUST_LOG` free to
/// override either for ad hoc debugging.
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber. `verbose` drops the default
/// level to `debug`; `RUST_LOG`, if set, always wins.
pub fn init_logging(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pulsescan={default_directive}")));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).without_time())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_does_not_panic() {
        // tracing_subscriber::registry().init() can only succeed once per
        // process; just exercise the filter-construction path directly.
        let _ = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("pulsescan=debug"));
    }
}
