//! # Logging
//!
//! Installs the global `tracing` subscriber.
//!
//! ```text
//! RUST_LOG set? ──yes──► use RUST_LOG
//!      │
//!      no
//!      ▼
//! [logging].filter / SHIFTBOOK_LOG ──► DEFAULT_LOG_FILTER if unparsable
//! ```

use tracing_subscriber::EnvFilter;

use crate::config::{LoggingSettings, DEFAULT_LOG_FILTER};

/// Builds the filter for the given settings. `RUST_LOG` wins when set.
pub fn env_filter(settings: &LoggingSettings) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Installs a formatted subscriber.
///
/// Returns `false` if a global subscriber was already set (tests, or a host
/// binary that configured its own).
pub fn init_tracing(settings: &LoggingSettings) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(settings))
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        let settings = LoggingSettings::default();
        let _ = init_tracing(&settings);
        assert!(!init_tracing(&settings));
    }

    #[test]
    fn test_bad_filter_falls_back() {
        let settings = LoggingSettings {
            filter: "shiftbook=[".to_string(),
        };
        // Must not panic
        let _ = env_filter(&settings);
    }
}
