use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Log to stderr so stdout stays clean for reports and `--json`.
/// `RUST_LOG` wins over the verbosity flag when set.
pub fn init(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter)
        .init();
}
