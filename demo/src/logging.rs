//! Logging context.
//!
//! There is no implicit global logger: the binary calls [`init`] once at startup to install the
//! subscriber, then constructs a [`Logger`] and hands it by reference to whatever needs it. The
//! SDK receives the logger as a [`tracing::Span`] through its client options.

use std::collections::BTreeMap;
use std::io::IsTerminal;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Name the demo's video client logs under.
pub const DEMO_LOGGER_NAME: &str = "VDC-web:BasicDemo";

#[derive(Debug, Clone, clap::Args)]
pub struct LogConfig {
    /// Default log level; `RUST_LOG` directives take precedence.
    #[arg(long = "log-level", env = "VDC_LOG_LEVEL", default_value = "debug")]
    pub level: LevelFilter,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::DEBUG,
        }
    }
}

/// Install the process-wide tracing subscriber.
///
/// Must be called at most once, before any [`Logger`] is used.
pub fn init(config: &LogConfig) -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(config.level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init()
        .map_err(|e| eyre::eyre!("install tracing subscriber: {e}"))
}

/// A named logger carrying metadata that is attached to everything logged through it.
#[derive(Debug, Clone)]
pub struct Logger {
    name: String,
    meta: BTreeMap<String, String>,
    aggregates: BTreeMap<String, String>,
}

impl Logger {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            meta: BTreeMap::new(),
            aggregates: BTreeMap::new(),
        }
    }

    /// The logger the demo hands to its video clients.
    pub fn for_video_client() -> Self {
        Self::new(DEMO_LOGGER_NAME)
            .with_meta("client", "VDC")
            .with_meta("chain", "VideoClient")
            .with_aggregate("message", "sample message")
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Attach a value that a log collector should aggregate on rather than index.
    pub fn with_aggregate(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.aggregates.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.meta.get(key).map(String::as_str)
    }

    pub fn aggregate(&self, key: &str) -> Option<&str> {
        self.aggregates.get(key).map(String::as_str)
    }

    /// A fresh span carrying this logger's name and metadata.
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "logger",
            name = %self.name,
            meta = ?self.meta,
            aggregates = ?self.aggregates,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_client_logger_metadata() {
        let logger = Logger::for_video_client();
        assert_eq!(logger.name(), "VDC-web:BasicDemo");
        assert_eq!(logger.meta("client"), Some("VDC"));
        assert_eq!(logger.meta("chain"), Some("VideoClient"));
        assert_eq!(logger.aggregate("message"), Some("sample message"));
        assert_eq!(logger.meta("message"), None);
    }
}
