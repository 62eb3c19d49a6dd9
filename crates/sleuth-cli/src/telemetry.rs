// Logging setup
//
// Design Decision: Logs go to stderr so scan output on stdout stays pipeable.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_FILTER: &str = "warn,sleuth_cli=info";

/// Configuration for console logging
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Whether to enable console logging
    pub enable_console: bool,
    /// Log filter (e.g., "info", "debug", "sleuth_core=debug")
    pub log_filter: Option<String>,
    /// Colorize output
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enable_console: true,
            log_filter: None,
            ansi: true,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `RUST_LOG`: Full filter directive
    /// - `LOG_LEVEL`: Level applied to the sleuth crates only
    /// - `NO_COLOR`: Disable colored output when set
    pub fn from_env() -> Self {
        Self {
            enable_console: true,
            log_filter: std::env::var("RUST_LOG")
                .ok()
                .or_else(|| std::env::var("LOG_LEVEL").ok().map(|l| sleuth_filter(&l))),
            ansi: std::env::var_os("NO_COLOR").is_none(),
        }
    }

    /// Silence everything below errors
    pub fn quiet(mut self) -> Self {
        self.log_filter = Some("error".to_string());
        self
    }

    fn filter(&self) -> EnvFilter {
        self.log_filter
            .as_ref()
            .and_then(|f| EnvFilter::try_new(f).ok())
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
    }
}

fn sleuth_filter(level: &str) -> String {
    format!("warn,sleuth_cli={level},sleuth_core={level},sleuth_history={level}")
}

/// Install the global subscriber
pub fn init_telemetry(config: TelemetryConfig) {
    let console_layer = if config.enable_console {
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(config.ansi)
                .with_target(true)
                .with_filter(config.filter()),
        )
    } else {
        None
    };

    tracing_subscriber::registry().with(console_layer).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_expands_to_sleuth_crates() {
        assert_eq!(
            sleuth_filter("debug"),
            "warn,sleuth_cli=debug,sleuth_core=debug,sleuth_history=debug"
        );
    }

    #[test]
    fn test_quiet_overrides_filter() {
        let config = TelemetryConfig {
            log_filter: Some("debug".to_string()),
            ..Default::default()
        }
        .quiet();
        assert_eq!(config.log_filter.as_deref(), Some("error"));
    }

    #[test]
    fn test_invalid_filter_falls_back_to_default() {
        let config = TelemetryConfig {
            log_filter: Some("sleuth_cli=loud".to_string()),
            ..Default::default()
        };
        assert!(config.filter().to_string().contains("sleuth_cli=info"));
    }
}
