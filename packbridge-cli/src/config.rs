//! Configuration for the packbridge CLI.

use std::path::Path;

use packbridge_core::BridgeConfig;
use serde::{Deserialize, Serialize};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Server address, station identity and timeouts.
    pub bridge: BridgeConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl CliConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the default configuration to a file (for bootstrapping).
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let text = toml::to_string_pretty(&CliConfig::default()).unwrap();
        assert!(text.contains("server_url"));
        assert!(text.contains("request_timeout_ms"));
        assert!(text.contains("machine_uuid"));
    }

    #[test]
    fn roundtrip_config() {
        let text = toml::to_string_pretty(&CliConfig::default()).unwrap();
        let parsed: CliConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.bridge.request_timeout_ms, 5000);
        assert_eq!(parsed.logging.level, "info");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let parsed: CliConfig = toml::from_str(
            r#"
            [bridge]
            server_url = "ws://10.0.0.5:8080/api/ws"

            [bridge.station]
            machine_uuid = "PACK-01"
            machine_id = 12
            "#,
        )
        .unwrap();
        assert_eq!(parsed.bridge.dial_timeout_ms, 5000);
        assert_eq!(
            parsed.bridge.server_address(),
            "ws://10.0.0.5:8080/api/ws?machine_uuid=PACK-01&machine_id=12"
        );
        assert_eq!(parsed.logging.level, "info");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = CliConfig::load(Path::new("/nonexistent/packbridge.toml"));
        assert_eq!(cfg.bridge, BridgeConfig::default());
    }

    #[test]
    fn write_default_then_load() {
        let path = std::env::temp_dir().join(format!(
            "packbridge-test-{}.toml",
            std::process::id()
        ));
        CliConfig::write_default(&path).unwrap();
        let cfg = CliConfig::load(&path);
        assert_eq!(cfg.bridge.reconnect_interval_ms, 5000);
        let _ = std::fs::remove_file(&path);
    }
}
