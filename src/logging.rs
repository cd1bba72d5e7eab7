//! Tracing subscriber set-up.
//!
//! Logs go to stderr so they never mix with command output on stdout.

use tracing_subscriber::EnvFilter;

/// Environment variable holding an explicit filter directive.
pub const LOG_ENV: &str = "GIT_REVIEW_LOG";

/// Pick the filter: `GIT_REVIEW_LOG` if set and valid, otherwise `debug`
/// for `--verbose` and `warn` by default.
pub fn filter(verbose: bool, directive: Option<&str>) -> EnvFilter {
    if let Some(directive) = directive
        && let Ok(filter) = EnvFilter::try_new(directive)
    {
        return filter;
    }
    EnvFilter::new(if verbose { "debug" } else { "warn" })
}

pub fn init(verbose: bool) {
    let directive = std::env::var(LOG_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(filter(verbose, directive.as_deref()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
