//! Startup-time configuration.
//!
//! Mirrors `original_source/components/config_manager/include/config_manager.h`'s
//! `port_config_t` / `config_t.node_info` shape, loaded once from a TOML file
//! instead of the original's NVS-backed `config_manager`. Persistence and live
//! reload are the out-of-scope external config provider (spec §6); this type
//! is only the value the core is constructed from.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::merge::MergeMode;

/// Default per-source timeout, per spec §3/§4.4.
pub const DEFAULT_TIMEOUT_MS: u32 = 2_500;
/// Minimum clamp for a configured per-source timeout, per spec §4.4.
pub const MIN_TIMEOUT_MS: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortConfig {
    /// The universe this port ingests from (both Art-Net and sACN sources).
    pub universe_primary: u16,
    pub merge_mode: MergeMode,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u32,
}

fn default_timeout_ms() -> u32 {
    DEFAULT_TIMEOUT_MS
}

impl PortConfig {
    /// Clamps the configured timeout to the spec's 100ms minimum.
    pub fn effective_timeout_ms(&self) -> u32 {
        self.timeout_ms.max(MIN_TIMEOUT_MS)
    }
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            universe_primary: 0,
            merge_mode: MergeMode::Htp,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfoConfig {
    pub short_name: String,
    pub long_name: String,
}

impl Default for NodeInfoConfig {
    fn default() -> Self {
        Self {
            short_name: "dmx-bridge".to_string(),
            long_name: "dmx-bridge Art-Net/sACN node".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BridgeConfig {
    #[serde(default)]
    pub port1: PortConfig,
    #[serde(default)]
    pub port2: PortConfig,
    #[serde(default)]
    pub node_info: NodeInfoConfig,
}

impl BridgeConfig {
    /// Load from a TOML file, falling back to defaults if `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let cfg: BridgeConfig = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.port1.timeout_ms == 0 || self.port2.timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(())
    }

    /// The port (1 or 2) that should receive updates for `universe`, if any.
    ///
    /// Per spec §4.3 the same update may route to zero, one, or both ports.
    pub fn ports_for_universe(&self, universe: u16) -> Vec<u8> {
        let mut ports = Vec::with_capacity(2);
        if self.port1.universe_primary == universe {
            ports.push(1);
        }
        if self.port2.universe_primary == universe {
            ports.push(2);
        }
        ports
    }

    pub fn port(&self, port: u8) -> Option<&PortConfig> {
        match port {
            1 => Some(&self.port1),
            2 => Some(&self.port2),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_routes() {
        let cfg = BridgeConfig::default();
        assert!(cfg.ports_for_universe(0).is_empty() || cfg.ports_for_universe(0).len() == 2);
    }

    #[test]
    fn routes_to_both_ports_when_universe_matches() {
        let mut cfg = BridgeConfig::default();
        cfg.port1.universe_primary = 5;
        cfg.port2.universe_primary = 5;
        assert_eq!(cfg.ports_for_universe(5), vec![1, 2]);
    }

    #[test]
    fn routes_to_single_port() {
        let mut cfg = BridgeConfig::default();
        cfg.port1.universe_primary = 5;
        cfg.port2.universe_primary = 9;
        assert_eq!(cfg.ports_for_universe(5), vec![1]);
        assert_eq!(cfg.ports_for_universe(9), vec![2]);
        assert!(cfg.ports_for_universe(1).is_empty());
    }

    #[test]
    fn parses_toml() {
        let text = r#"
            [port1]
            universe_primary = 0
            merge_mode = "htp"
            timeout_ms = 3000

            [port2]
            universe_primary = 1
            merge_mode = "backup"
            timeout_ms = 2000

            [node_info]
            short_name = "bridge-1"
            long_name = "Studio A dmx-bridge"
        "#;
        let cfg: BridgeConfig = toml::from_str(text).unwrap();
        assert_eq!(cfg.port1.universe_primary, 0);
        assert_eq!(cfg.port2.merge_mode, MergeMode::Backup);
        assert_eq!(cfg.node_info.short_name, "bridge-1");
    }
}
