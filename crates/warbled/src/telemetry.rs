//! Logging setup for the daemon.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// `filter` takes `RUST_LOG` syntax (`info`, `warbled=debug,warble=trace`).
/// An unparsable filter falls back to `info` rather than failing startup.
pub fn init(filter: &str) -> Result<()> {
    let env_filter = match EnvFilter::try_new(filter) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Invalid log filter {:?} ({}), using info", filter, e);
            EnvFilter::new("info")
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}
