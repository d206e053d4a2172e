//! Bridge configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use chainview_utils::LogFormat;

use crate::BridgeError;

/// Longest accepted poll interval. The interval must stay bounded so that
/// change notifications keep flowing even with no node events.
pub const MAX_POLL_INTERVAL_MS: u64 = 60_000;

/// Options the bridge is built from.
///
/// Can be loaded from a TOML file via [`BridgeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Milliseconds between reconciliation cycles.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Client name advertised in the sub-version string.
    #[serde(default = "default_client_name")]
    pub client_name: String,

    /// Node data directory.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log file name, relative to `data_dir`.
    #[serde(default = "default_log_file_name")]
    pub log_file_name: String,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_client_name() -> String {
    "chainview".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./chainview_data")
}

fn default_log_file_name() -> String {
    "debug.log".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl BridgeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, BridgeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| BridgeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, BridgeError> {
        let config: Self = toml::from_str(s).map_err(|e| BridgeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, BridgeError> {
        toml::to_string_pretty(self).map_err(|e| BridgeError::Config(e.to_string()))
    }

    /// Reject values the bridge cannot run with.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.poll_interval_ms == 0 || self.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(BridgeError::Config(format!(
                "poll_interval_ms must be in 1..={MAX_POLL_INTERVAL_MS}, got {}",
                self.poll_interval_ms
            )));
        }
        if self.client_name.trim().is_empty() {
            return Err(BridgeError::Config("client_name must not be empty".into()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Full path of the node log file.
    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join(&self.log_file_name)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            client_name: default_client_name(),
            data_dir: default_data_dir(),
            log_file_name: default_log_file_name(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = BridgeConfig::default();
        let toml_str = config.to_toml_string().expect("serializable");
        let parsed = BridgeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.poll_interval_ms, config.poll_interval_ms);
        assert_eq!(parsed.client_name, config.client_name);
        assert_eq!(parsed.log_format, LogFormat::Human);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = BridgeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_file(), PathBuf::from("./chainview_data/debug.log"));
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            poll_interval_ms = 1000
            log_format = "json"
            data_dir = "/var/lib/node"
        "#;
        let config = BridgeConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.log_file(), PathBuf::from("/var/lib/node/debug.log"));
        assert_eq!(config.client_name, "chainview"); // default
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = BridgeConfig::from_toml_str("poll_interval_ms = 0").unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }

    #[test]
    fn unbounded_interval_is_rejected() {
        let config = BridgeConfig {
            poll_interval_ms: MAX_POLL_INTERVAL_MS + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "client_name = \"observer\"").expect("write");
        let config =
            BridgeConfig::from_toml_file(file.path().to_str().expect("utf-8 path")).expect("load");
        assert_eq!(config.client_name, "observer");
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = BridgeConfig::from_toml_file("/nonexistent/chainview.toml");
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }
}
