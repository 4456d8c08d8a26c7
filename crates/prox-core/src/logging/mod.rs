//! Structured logging for prox.
//!
//! Two output modes, both on stderr:
//! - Human-readable console output for interactive use
//! - JSON lines for scripted use
//!
//! stdout is reserved for command payloads (record summaries, JSON).

pub mod config;

pub use config::{LogConfig, LogFormat, LogLevel};

use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Build the event filter for `config`.
///
/// A `RUST_LOG` directive is used verbatim; otherwise the level applies to
/// the prox crates only.
pub fn build_filter(config: &LogConfig) -> EnvFilter {
    if let Some(directive) = &config.directive {
        if let Ok(filter) = EnvFilter::try_new(directive) {
            return filter;
        }
    }
    EnvFilter::new(format!(
        "prox_core={level},prox={level}",
        level = config.level
    ))
}

/// Initialize the global subscriber.
///
/// Calling it a second time leaves the first subscriber in place.
pub fn init_logging(config: &LogConfig) {
    let filter = build_filter(config);

    let result = match config.format {
        LogFormat::Human => {
            let use_ansi = std::io::stderr().is_terminal();
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(use_ansi);

            if config.timestamps {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer)
                    .try_init()
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer.without_time())
                    .try_init()
            }
        }
        LogFormat::Jsonl => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("global subscriber already installed");
    }
}

/// Initialize logging from the environment alone (tests and simple cases).
pub fn init_default_logging() {
    init_logging(&LogConfig::from_env(None, None));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_from_level() {
        let filter = build_filter(&LogConfig::default().with_level(LogLevel::Debug));
        let text = filter.to_string();
        assert!(text.contains("prox_core=debug"));
        assert!(text.contains("prox=debug"));
    }

    #[test]
    fn test_filter_from_directive() {
        let config = LogConfig {
            directive: Some("prox_core::collect=trace".to_string()),
            ..LogConfig::default()
        };
        assert_eq!(build_filter(&config).to_string(), "prox_core::collect=trace");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_default_logging();
        init_default_logging();
    }
}
