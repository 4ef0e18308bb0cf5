//! Node configuration with TOML file support.

use crate::NodeError;
use crest_types::ConsensusParams;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a CREST node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Run without a network: a single node closes ledgers by itself.
    #[serde(default)]
    pub standalone: bool,

    /// Hex-encoded 32-byte validator seed. Absent means observe-only.
    #[serde(default)]
    pub validator_seed: Option<String>,

    /// Consensus timing and thresholds.
    #[serde(default)]
    pub consensus: ConsensusParams,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            standalone: false,
            validator_seed: None,
            consensus: ConsensusParams::default(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

impl NodeConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, NodeError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, NodeError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// Decode the validator seed, if configured.
    pub fn seed_bytes(&self) -> Result<Option<[u8; 32]>, NodeError> {
        let Some(raw) = self.validator_seed.as_deref() else {
            return Ok(None);
        };
        if raw.len() != 64 || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(NodeError::BadSeed("expected 64 hex characters".into()));
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in raw.as_bytes().chunks(2).enumerate() {
            let hex = std::str::from_utf8(chunk)
                .map_err(|_| NodeError::BadSeed("invalid utf-8".into()))?;
            bytes[i] = u8::from_str_radix(hex, 16)
                .map_err(|_| NodeError::BadSeed("invalid hex".into()))?;
        }
        Ok(Some(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_observer_mode() {
        let config = NodeConfig::default();
        assert!(!config.standalone);
        assert!(config.validator_seed.is_none());
        assert_eq!(config.log_format, "human");
        assert_eq!(config.consensus.flag_ledger_interval, 256);
    }

    #[test]
    fn parses_minimal_toml() {
        let config = NodeConfig::from_toml_str("standalone = true\n").unwrap();
        assert!(config.standalone);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn parses_consensus_overrides() {
        let raw = r#"
standalone = true
log_level = "debug"

[consensus]
flag_ledger_interval = 128
censorship_warn_interval = 15
slow_round_ms = 5000
ledger_min_close_ms = 2000
ledger_min_consensus_ms = 1950
min_consensus_pct = 80
suppression_hold_secs = 300
use_rounded_close_time = true
"#;
        let config = NodeConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.consensus.flag_ledger_interval, 128);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn seed_roundtrip() {
        let config = NodeConfig {
            validator_seed: Some("ab".repeat(32)),
            ..NodeConfig::default()
        };
        assert_eq!(config.seed_bytes().unwrap(), Some([0xAB; 32]));
    }

    #[test]
    fn bad_seed_rejected() {
        let config = NodeConfig {
            validator_seed: Some("xyz".into()),
            ..NodeConfig::default()
        };
        assert!(matches!(config.seed_bytes(), Err(NodeError::BadSeed(_))));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(NodeConfig::from_toml_str("standalone = maybe").is_err());
    }
}
