//! Logging setup for the zbundle CLI.
//!
//! Library code logs through `tracing` macros; the binary installs a single
//! fmt subscriber. Each event is written under the stdout lock, so lines from
//! the watcher and the build never interleave.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Pick the log filter for the given flags.
///
/// 1. `verbose`: debug for this crate
/// 2. `quiet`: errors only
/// 3. `RUST_LOG` when set
/// 4. info for this crate
pub fn build_filter(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("zbundle=debug")
    } else if quiet {
        EnvFilter::new("zbundle=error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("zbundle=info"))
    }
}

/// Whether ANSI colors should be used.
///
/// Honors the `NO_COLOR` convention in addition to the flag.
pub fn use_color(no_color: bool) -> bool {
    !no_color && std::env::var_os("NO_COLOR").is_none()
}

/// Initialize the tracing subscriber.
///
/// Calling it again after a subscriber is installed has no effect.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(use_color(no_color))
        .compact();

    let _ = tracing_subscriber::registry()
        .with(build_filter(verbose, quiet))
        .with(fmt_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_flags() {
        assert_eq!(build_filter(true, false).to_string(), "zbundle=debug");
        assert_eq!(build_filter(false, true).to_string(), "zbundle=error");
        assert_eq!(build_filter(true, true).to_string(), "zbundle=debug");
    }

    #[test]
    fn test_no_color_flag() {
        assert!(!use_color(true));
    }

    #[test]
    fn test_init_logger_twice() {
        init_logger(false, true, true);
        init_logger(true, false, true);
    }
}
