//! Subscriber setup shared by the binaries.

use tracing_subscriber::EnvFilter;

/// Install a stderr `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `tutorgram=info`, or `tutorgram=debug`
/// with `verbose`.
pub fn init(verbose: bool) {
    let default = if verbose { "tutorgram=debug" } else { "tutorgram=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
