//! Tracing bootstrap for the CLI.

use std::env;

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn,poolsync=info,poolsync_client=info";
const VERBOSE_FILTER: &str = "info,poolsync=debug,poolsync_client=debug,poolsync_core=debug";

/// Install the global subscriber.
///
/// Precedence:
/// 1) `RUST_LOG`
/// 2) `POOLSYNC_LOG`
/// 3) built-in default (`--verbose` selects a chattier one)
pub fn init(verbose: bool) {
    let env_filter = filter_from_env(verbose);
    let _ = tracing_subscriber::fmt()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .try_init();
}

fn filter_from_env(verbose: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    if let Some(filter) = env::var("POOLSYNC_LOG")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .and_then(|v| EnvFilter::try_new(v).ok())
    {
        return filter;
    }

    EnvFilter::new(if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER })
}
