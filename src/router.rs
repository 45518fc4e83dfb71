//! Maps `(protocol, universe)` source updates onto output ports (spec §4.3).
//!
//! Grounded on `kaelenfae-LXMonitor/src-tauri/src/network/listener.rs`'s
//! dispatch shape (parse, then call a shared handle synchronously) but
//! targeting the merge engine instead of the teacher's UI-facing
//! `SourceManager`.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::BridgeConfig;
use crate::error::MergeError;
use crate::merge::{MergeEngine, SourceKey, SourceUpdate};

/// Routes parsed, normalized updates from either receiver into the shared
/// [`MergeEngine`]. Never blocks on I/O (spec §4.3).
pub struct Router {
    config: BridgeConfig,
    engine: Arc<MergeEngine>,
}

impl Router {
    pub fn new(config: BridgeConfig, engine: Arc<MergeEngine>) -> Self {
        Self { config, engine }
    }

    /// Routes `update` to every configured port whose `universe_primary`
    /// matches. A full source table on one port does not prevent routing
    /// to the other (spec §7 "Source table full").
    pub fn route(&self, update: SourceUpdate) {
        let ports = self.config.ports_for_universe(update.universe);
        if ports.is_empty() {
            debug!(universe = update.universe, "no port routes this universe");
            return;
        }
        for port in ports {
            if let Err(err) = self.engine.push(port, update.clone()) {
                warn!(port, universe = update.universe, %err, "dropping update: source table full");
            }
        }
    }

    /// Immediately invalidates `key` on every port routed from `universe`
    /// (sACN Stream Terminated, spec §4.2).
    pub fn invalidate(&self, universe: u16, key: SourceKey) -> Result<(), MergeError> {
        for port in self.config.ports_for_universe(universe) {
            self.engine.invalidate_source(port, key)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::{ManualClock, SourceKey, SourceProtocol};
    use std::net::IpAddr;
    use std::sync::Arc;

    fn update(universe: u16) -> SourceUpdate {
        SourceUpdate {
            key: SourceKey {
                protocol: SourceProtocol::ArtNet,
                ip: IpAddr::from([10, 0, 0, 1]),
            },
            universe,
            data: [0u8; 512],
            sequence: 1,
            priority: 100,
            source_name: String::new(),
        }
    }

    #[test]
    fn routes_to_matching_port_only() {
        let mut cfg = BridgeConfig::default();
        cfg.port1.universe_primary = 3;
        cfg.port2.universe_primary = 9;
        let engine = Arc::new(MergeEngine::new(Arc::new(ManualClock::new())));
        let router = Router::new(cfg, engine.clone());

        router.route(update(3));
        assert_eq!(engine.list_active(1).unwrap().len(), 1);
        assert_eq!(engine.list_active(2).unwrap().len(), 0);
    }

    #[test]
    fn routes_to_both_ports_when_both_match() {
        let mut cfg = BridgeConfig::default();
        cfg.port1.universe_primary = 3;
        cfg.port2.universe_primary = 3;
        let engine = Arc::new(MergeEngine::new(Arc::new(ManualClock::new())));
        let router = Router::new(cfg, engine.clone());

        router.route(update(3));
        assert_eq!(engine.list_active(1).unwrap().len(), 1);
        assert_eq!(engine.list_active(2).unwrap().len(), 1);
    }

    #[test]
    fn unrouted_universe_is_dropped_silently() {
        let cfg = BridgeConfig::default();
        let engine = Arc::new(MergeEngine::new(Arc::new(ManualClock::new())));
        let router = Router::new(cfg, engine.clone());

        router.route(update(500));
        assert_eq!(engine.list_active(1).unwrap().len(), 0);
        assert_eq!(engine.list_active(2).unwrap().len(), 0);
    }
}
