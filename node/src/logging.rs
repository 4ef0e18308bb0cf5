//! Structured logging for the CREST node, driven by [`NodeConfig`].
//!
//! The config names a format (`"human"` for development, `"json"` for log
//! aggregation) and a default level filter; `RUST_LOG` overrides the level
//! at runtime. Installation is fallible rather than panicking so embedders
//! (and tests) that already carry a subscriber get an error back.

use crate::config::NodeConfig;
use crate::error::NodeError;
use std::str::FromStr;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Selects the output format for structured logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines for local development.
    #[default]
    Human,
    /// Newline-delimited JSON for log aggregation pipelines.
    Json,
}

impl FromStr for LogFormat {
    type Err = NodeError;

    fn from_str(raw: &str) -> Result<Self, NodeError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "human" => Ok(LogFormat::Human),
            "json" => Ok(LogFormat::Json),
            other => Err(NodeError::Logging(format!("unknown log format {other:?}"))),
        }
    }
}

/// Install the global tracing subscriber described by `config`.
///
/// Fails if the config names an unknown format or if a subscriber is
/// already installed in this process.
pub fn init_logging(config: &NodeConfig) -> Result<(), NodeError> {
    let format: LogFormat = config.log_format.parse()?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Human => registry
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(true))
            .try_init(),
    }
    .map_err(|e| NodeError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("human".parse::<LogFormat>().unwrap(), LogFormat::Human);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" Human ".parse::<LogFormat>().unwrap(), LogFormat::Human);
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(matches!(
            "syslog".parse::<LogFormat>(),
            Err(NodeError::Logging(_))
        ));
    }

    #[test]
    fn init_rejects_bad_config_before_installing() {
        let config = NodeConfig {
            log_format: "carrier-pigeon".into(),
            ..NodeConfig::default()
        };
        assert!(matches!(
            init_logging(&config),
            Err(NodeError::Logging(_))
        ));
    }
}
