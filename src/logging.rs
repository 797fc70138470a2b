//! Tracing subscriber setup for the daemon.

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize the global tracing subscriber.
///
/// `verbosity` is the number of `-v` flags: 0=warn, 1=info, 2=debug,
/// 3+=trace. `RUST_LOG` directives are honored on top of that level.
pub fn init(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
