//! Logging setup for the Shoutout binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified default log level.
///
/// Both the library crate (`crate_name`) and the binary get `default_log_level`.
/// `RUST_LOG` overrides the whole filter when set.
///
/// # Examples
///
/// ```no_run
/// use shoutout_shared::logger::setup_logger;
///
/// setup_logger("shoutout_server", "shoutout-server", "info");
/// ```
pub fn setup_logger(crate_name: &str, binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(crate_name, binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the fallback filter directive used when `RUST_LOG` is not set.
fn default_filter(crate_name: &str, binary_name: &str, default_log_level: &str) -> String {
    format!(
        "{}={level},{}={level},tower_http={level}",
        crate_name.replace('-', "_"),
        binary_name.replace('-', "_"),
        level = default_log_level,
    )
}
