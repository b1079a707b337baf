//! Structured logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "lifeline=info";
const VERBOSE_FILTER: &str = "lifeline=debug";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parses a format name, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "pretty" | "text" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Event filter.
    pub filter: EnvFilter,
    /// Optional log file; stderr otherwise.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Builds logging configuration from settings.
    ///
    /// Filter precedence: `LIFELINE_LOG`, then `RUST_LOG`, then the
    /// configured level, then `lifeline=debug` when verbose, else
    /// `lifeline=info`.
    #[must_use]
    pub fn from_settings(settings: &LoggingSettings, verbose: bool) -> Self {
        let directive = filter_directive(
            std::env::var("LIFELINE_LOG").ok(),
            std::env::var("RUST_LOG").ok(),
            settings.level.clone(),
            verbose,
        );
        let filter = EnvFilter::try_new(&directive).unwrap_or_else(|e| {
            eprintln!("invalid log filter {directive:?}: {e}; using {DEFAULT_FILTER}");
            EnvFilter::new(DEFAULT_FILTER)
        });

        Self {
            format: settings
                .format
                .as_deref()
                .and_then(LogFormat::parse)
                .unwrap_or_default(),
            filter,
            file: settings.file.clone(),
        }
    }
}

fn filter_directive(
    lifeline_log: Option<String>,
    rust_log: Option<String>,
    configured: Option<String>,
    verbose: bool,
) -> String {
    [lifeline_log, rust_log, configured]
        .into_iter()
        .flatten()
        .find(|v| !v.trim().is_empty())
        .unwrap_or_else(|| {
            if verbose {
                VERBOSE_FILTER.to_string()
            } else {
                DEFAULT_FILTER.to_string()
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("json", Some(LogFormat::Json); "json")]
    #[test_case(" Pretty ", Some(LogFormat::Pretty); "pretty mixed case")]
    #[test_case("xml", None; "unknown")]
    fn test_log_format_parse(input: &str, expected: Option<LogFormat>) {
        assert_eq!(LogFormat::parse(input), expected);
    }

    #[test]
    fn test_filter_precedence() {
        let s = |v: &str| Some(v.to_string());
        assert_eq!(
            filter_directive(s("a=trace"), s("b=debug"), s("c=warn"), true),
            "a=trace"
        );
        assert_eq!(filter_directive(None, s("  "), s("c=warn"), false), "c=warn");
        assert_eq!(filter_directive(None, None, None, true), VERBOSE_FILTER);
        assert_eq!(filter_directive(None, None, None, false), DEFAULT_FILTER);
    }
}
