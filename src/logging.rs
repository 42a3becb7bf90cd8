//! Diagnostic logging
//!
//! Everything goes to stderr so stdout stays reserved for the mined event.

use std::io;

use tracing::level_filters::LevelFilter;
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive that overrides the
/// verbosity flag.
pub const LOG_ENV: &str = "NIP13_LOG";

/// Level used when [`LOG_ENV`] is unset.
pub fn default_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::ERROR
    }
}

/// Build the stderr subscriber for a run.
pub fn subscriber(verbose: bool) -> impl Subscriber + Send + Sync {
    let filter = EnvFilter::builder()
        .with_default_directive(default_level(verbose).into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .finish()
}

/// Run `f` with the run's subscriber installed for the current thread.
pub fn scoped<R>(verbose: bool, f: impl FnOnce() -> R) -> R {
    tracing::subscriber::with_default(subscriber(verbose), f)
}
