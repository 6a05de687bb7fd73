use tracing_subscriber::{fmt, prelude::*, EnvFilter};


/// Installs a stderr fmt subscriber filtered by `filter` and `RUST_LOG`.
///
/// Returns `false` when a global subscriber was already set.
pub fn init_tracing(filter: &str) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .try_init()
        .is_ok()
}
