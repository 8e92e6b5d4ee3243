//! Tracing bootstrap for hosts embedding the store.
//!
//! The store logs rollbacks, recoveries and save failures through `tracing`
//! under the `nbstore_fs` and `nbstore_core` targets. Hosts that already run
//! a subscriber need nothing from this module.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Filter used when `RUST_LOG` is unset: store events at `info`, the rest
/// at `warn`.
pub const DEFAULT_FILTER: &str = "warn,nbstore_fs=info,nbstore_core=info";

type InitError = Box<dyn std::error::Error + Send + Sync>;

/// Install a global subscriber writing compact logs to stdout.
///
/// The filter comes from `RUST_LOG`, defaulting to [`DEFAULT_FILTER`].
/// Fails if a global subscriber is already set.
pub fn init() -> Result<(), InitError> {
    let fmt_layer = fmt::layer().with_target(true).compact();
    tracing_subscriber::registry()
        .with(filter()?)
        .with(fmt_layer)
        .try_init()?;
    Ok(())
}

/// Route store logs into the test harness's captured output.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_for_tests() {
    let Ok(filter) = filter() else { return };
    let fmt_layer = fmt::layer().with_test_writer().without_time();
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn filter() -> Result<EnvFilter, InitError> {
    Ok(EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[test]
    fn init_for_tests_is_repeatable() {
        init_for_tests();
        init_for_tests();
        assert!(init().is_err());
        tracing::info!(path = "a/b.ipynb", "logging ready");
    }
}
