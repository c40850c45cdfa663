//! Server configuration.
//!
//! Resolution order: built-in defaults → TOML file → env vars / CLI
//! flags (applied by `main.rs`). The struct round-trips through TOML
//! so `--config-template` can print a ready-to-edit file.

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CinderConfig {
    /// Address to bind.
    pub bind: String,
    /// Port to listen on.
    pub port: u16,
    /// Password clients must AUTH with. Empty disables authentication.
    pub requirepass: String,
    /// Maximum concurrent client connections.
    pub maxclients: usize,
}

impl Default for CinderConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 6379,
            requirepass: String::new(),
            maxclients: 10_000,
        }
    }
}

impl CinderConfig {
    /// Loads a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config '{}': {e}", path.display()))?;
        toml::from_str(&raw).map_err(|e| format!("failed to parse config '{}': {e}", path.display()))
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| e.to_string())
    }

    /// The password, or `None` when authentication is disabled.
    pub fn requirepass(&self) -> Option<String> {
        if self.requirepass.is_empty() {
            None
        } else {
            Some(self.requirepass.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_toml() {
        let cfg = CinderConfig::default();
        let rendered = cfg.to_toml().unwrap();
        let parsed: CinderConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.port, 6379);
        assert_eq!(parsed.bind, "127.0.0.1");
        assert_eq!(parsed.requirepass(), None);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let parsed: CinderConfig = toml::from_str("port = 7000\nrequirepass = \"s3cret\"").unwrap();
        assert_eq!(parsed.port, 7000);
        assert_eq!(parsed.maxclients, 10_000);
        assert_eq!(parsed.requirepass(), Some("s3cret".into()));
    }
}
