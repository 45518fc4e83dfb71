//! sACN/E1.31 receiver task: joins the multicast group for each configured
//! universe and routes `E131Data` frames (spec §4.2).
//!
//! Grounded on `kaelenfae-LXMonitor/src-tauri/src/network/listener.rs`'s
//! `start_sacn_listener` for the `socket2` setup (reuse-address, reuse-port,
//! non-blocking, handed to `tokio::net::UdpSocket::from_std`); multicast
//! group membership is new here since the teacher only ever listened on one
//! fixed universe.

use std::collections::HashSet;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::merge::{SourceKey, SourceProtocol, SourceUpdate};
use crate::protocol::sacn::{self, SACN_PORT};
use crate::protocol::SequenceTracker;
use crate::router::Router;

use super::ReceiverStats;

const RECV_TIMEOUT: Duration = Duration::from_secs(1);

/// Runs until `running` is cleared. Joins the multicast group for every
/// distinct universe configured across both ports; rolls back any groups
/// already joined if a later join fails (spec §7 "Multicast join failure").
pub async fn run(
    interface: Ipv4Addr,
    router: Arc<Router>,
    config: Arc<BridgeConfig>,
    stats: Arc<ReceiverStats>,
    running: Arc<AtomicBool>,
) -> std::io::Result<()> {
    let socket = bind_socket()?;

    let universes: HashSet<u16> = [
        config.port1.universe_primary,
        config.port2.universe_primary,
    ]
    .into_iter()
    .collect();

    let mut joined = Vec::new();
    for &universe in &universes {
        let group = sacn::multicast_address(universe);
        match socket.join_multicast_v4(group, interface) {
            Ok(()) => {
                info!(universe, %group, "sacn receiver joined multicast group");
                joined.push(group);
            }
            Err(err) => {
                warn!(universe, %group, %err, "sacn multicast join failed, rolling back");
                for group in &joined {
                    let _ = socket.leave_multicast_v4(*group, interface);
                }
                return Err(err);
            }
        }
    }

    let mut buf = vec![0u8; 1500];
    let mut sequences = SequenceTracker::new();

    while running.load(Ordering::Relaxed) {
        let recv = tokio::time::timeout(RECV_TIMEOUT, socket.recv_from(&mut buf)).await;
        let (len, src) = match recv {
            Err(_elapsed) => continue,
            Ok(Err(err)) => {
                warn!(%err, "sacn receive error");
                continue;
            }
            Ok(Ok(result)) => result,
        };
        stats.packets_received.fetch_add(1, Ordering::Relaxed);

        let Some(packet) = sacn::parse(&buf[..len]) else {
            stats.invalid.fetch_add(1, Ordering::Relaxed);
            continue;
        };

        let key = SourceKey {
            protocol: SourceProtocol::Sacn,
            ip: src.ip(),
        };

        if packet.is_stream_terminated() {
            debug!(%src, universe = packet.universe, "sacn stream terminated");
            if let Err(err) = router.invalidate(packet.universe, key) {
                warn!(%err, "failed to invalidate terminated sacn source");
            }
            continue;
        }

        if sequences.observe(packet.universe, packet.sequence_number) {
            stats.sequence_errors.fetch_add(1, Ordering::Relaxed);
        }

        // Preview data is counted but not dropped at the receiver; whether
        // it reaches the output is a router/merge policy decision (spec
        // §4.2 "MAY be excluded").
        let update = SourceUpdate {
            key,
            universe: packet.universe,
            data: packet.data,
            sequence: packet.sequence_number,
            priority: packet.priority,
            source_name: packet.source_name,
        };
        router.route(update);
        stats.routed.fetch_add(1, Ordering::Relaxed);
    }

    for group in &joined {
        let _ = socket.leave_multicast_v4(*group, interface);
    }
    info!("sacn receiver stopped");
    Ok(())
}

fn bind_socket() -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    #[cfg(not(windows))]
    socket.set_reuse_port(true)?;
    let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, SACN_PORT);
    socket.bind(&addr.into())?;
    socket.set_nonblocking(true)?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
}
