//! Node identity + network identity, refreshed independently of the
//! Art-Net receiver that consumes it (spec §9 "ambient mutable state").
//!
//! Grounded on the teacher's `get_network_interfaces` (which resolves the
//! primary IPv4 via `local_ip_address`); MAC resolution is grounded on
//! `D1plo1d-tiny-artnet`'s dev-dependency on the `mac_address` crate,
//! promoted here to a real dependency since `ArtPollReply` always needs one.

use std::net::Ipv4Addr;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::warn;

/// Snapshot of what an `ArtPollReply` needs to know about this node.
#[derive(Debug, Clone)]
pub struct NodeIdentity {
    pub ipv4: Ipv4Addr,
    pub mac: [u8; 6],
    pub short_name: String,
    pub long_name: String,
}

impl NodeIdentity {
    /// Best-effort discovery of the primary IPv4 and MAC. Falls back to
    /// all-zero values rather than failing startup; interface loss is
    /// transparent to the core per spec §6.
    pub fn discover(short_name: String, long_name: String) -> Self {
        let ipv4 = match local_ip_address::local_ip() {
            Ok(std::net::IpAddr::V4(addr)) => addr,
            Ok(std::net::IpAddr::V6(_)) | Err(_) => {
                warn!("could not resolve a primary IPv4 address; using 0.0.0.0");
                Ipv4Addr::UNSPECIFIED
            }
        };
        let mac = match mac_address::get_mac_address() {
            Ok(Some(mac)) => mac.bytes(),
            Ok(None) | Err(_) => {
                warn!("could not resolve a MAC address; using 00:00:00:00:00:00");
                [0u8; 6]
            }
        };
        Self {
            ipv4,
            mac,
            short_name,
            long_name,
        }
    }
}

/// Shared handle: the Art-Net receiver reads the latest snapshot; a
/// network-state-change task (outside this crate's scope) would call
/// [`NodeIdentityHandle::set`] to publish an update.
#[derive(Clone)]
pub struct NodeIdentityHandle {
    rx: watch::Receiver<NodeIdentity>,
    tx: Arc<watch::Sender<NodeIdentity>>,
}

impl NodeIdentityHandle {
    pub fn new(initial: NodeIdentity) -> Self {
        let (tx, rx) = watch::channel(initial);
        Self {
            rx,
            tx: Arc::new(tx),
        }
    }

    pub fn current(&self) -> NodeIdentity {
        self.rx.borrow().clone()
    }

    pub fn set(&self, identity: NodeIdentity) {
        let _ = self.tx.send(identity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_reflects_latest_set() {
        let initial = NodeIdentity {
            ipv4: Ipv4Addr::new(10, 0, 0, 1),
            mac: [0; 6],
            short_name: "a".into(),
            long_name: "a-long".into(),
        };
        let handle = NodeIdentityHandle::new(initial);
        assert_eq!(handle.current().ipv4, Ipv4Addr::new(10, 0, 0, 1));

        handle.set(NodeIdentity {
            ipv4: Ipv4Addr::new(10, 0, 0, 2),
            mac: [1; 6],
            short_name: "b".into(),
            long_name: "b-long".into(),
        });
        assert_eq!(handle.current().ipv4, Ipv4Addr::new(10, 0, 0, 2));
    }
}
