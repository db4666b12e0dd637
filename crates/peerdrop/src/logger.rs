//! Logging setup for the server binary.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a `tracing` subscriber that writes formatted events to stderr.
///
/// `RUST_LOG` wins when set. Otherwise this crate and `binary_name` log at
/// `default_level`, and the lower layers (`peerdrop_room`,
/// `peerdrop_transport`) follow the same level.
pub fn setup_logger(binary_name: &str, default_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                let binary = binary_name.replace('-', "_");
                format!(
                    "peerdrop={default_level},peerdrop_room={default_level},\
                     peerdrop_transport={default_level},{binary}={default_level}"
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
