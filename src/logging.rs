//! Tracing setup shared by the binaries.
//!
//! Library code only emits events; installing a subscriber is the
//! binaries' job. `BREWSCOUT_LOG` takes `EnvFilter` syntax (e.g. `debug`,
//! `brewscout::session=trace`) and defaults to `warn`. Output goes to stderr
//! so stdout stays machine-readable.

use tracing_subscriber::EnvFilter;

pub const ENV_LOG: &str = "BREWSCOUT_LOG";

const DEFAULT_DIRECTIVE: &str = "warn";

/// Install the global fmt subscriber. Safe to call more than once.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
