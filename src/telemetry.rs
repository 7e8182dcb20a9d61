//! Logging setup.

use tracing_subscriber::EnvFilter;

/// Installs the fmt subscriber. `RUST_LOG` wins over the default directive.
/// Calling it twice is harmless; the first subscriber stays.
pub fn init(log_enabled: bool) {
    let default = if log_enabled {
        "action_api=info,tower_http=info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
