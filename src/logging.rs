//! Log output for the command-line tool.

use tracing_subscriber::EnvFilter;

/// Install a stderr subscriber.
///
/// `RUST_LOG` wins when set; otherwise warnings are shown, or debug output
/// for this crate when `verbose` is set. Repeated calls are ignored.
pub fn init(verbose: bool) {
    let default = if verbose { "warn,chadwick=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
