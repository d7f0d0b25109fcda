//! Console logging for the `harvest` binary.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "harvest=info";

/// Installs a console subscriber filtered by `RUST_LOG`, or [`DEFAULT_FILTER`]
/// when the variable is absent. `verbose` lowers the default to debug.
pub fn init(verbose: bool) {
    let default_filter = if verbose { "harvest=debug" } else { DEFAULT_FILTER };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init();
}
