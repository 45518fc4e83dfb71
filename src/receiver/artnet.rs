//! Art-Net receiver task: binds UDP/6454, parses frames, routes `ArtDmx`,
//! answers `ArtPoll` with `ArtPollReply` (spec §4.1).
//!
//! Grounded on `kaelenfae-LXMonitor/src-tauri/src/network/listener.rs`'s
//! `start_artnet_listener` (socket setup, broadcast flag, recv loop shape),
//! retargeted from the teacher's `SourceManager`/event-broadcast pair onto
//! the [`Router`].

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::merge::{SourceKey, SourceProtocol, SourceUpdate};
use crate::node_identity::NodeIdentityHandle;
use crate::protocol::artnet::{self, ArtNetPacket, PollReplyFields, ARTNET_PORT};
use crate::protocol::SequenceTracker;
use crate::router::Router;

use super::ReceiverStats;

/// Fixed recv timeout so the receiver can observe `running` cleared in
/// bounded time (spec §5).
const RECV_TIMEOUT: Duration = Duration::from_secs(1);

/// Runs until `running` is cleared. Returns once the socket is set up so
/// the caller can log bind failures distinctly from runtime errors.
pub async fn run(
    bind_addr: Ipv4Addr,
    router: Arc<Router>,
    identity: NodeIdentityHandle,
    config: Arc<BridgeConfig>,
    stats: Arc<ReceiverStats>,
    running: Arc<AtomicBool>,
) -> std::io::Result<()> {
    let addr = SocketAddr::new(IpAddr::V4(bind_addr), ARTNET_PORT);
    let socket = UdpSocket::bind(addr).await?;
    socket.set_broadcast(true)?;
    info!(%addr, "art-net receiver listening");

    let mut buf = vec![0u8; 1500];
    let mut sequences = SequenceTracker::new();
    let node_report_counter = AtomicU32::new(0);

    while running.load(Ordering::Relaxed) {
        let recv = tokio::time::timeout(RECV_TIMEOUT, socket.recv_from(&mut buf)).await;
        let (len, src) = match recv {
            Err(_elapsed) => continue,
            Ok(Err(err)) => {
                warn!(%err, "art-net receive error");
                continue;
            }
            Ok(Ok(result)) => result,
        };
        stats.packets_received.fetch_add(1, Ordering::Relaxed);

        let Some(packet) = artnet::parse(&buf[..len]) else {
            stats.invalid.fetch_add(1, Ordering::Relaxed);
            continue;
        };

        match packet {
            ArtNetPacket::Dmx(dmx) => {
                if sequences.observe(dmx.universe, dmx.sequence) {
                    stats.sequence_errors.fetch_add(1, Ordering::Relaxed);
                }
                let update = SourceUpdate {
                    key: SourceKey {
                        protocol: SourceProtocol::ArtNet,
                        ip: src.ip(),
                    },
                    universe: dmx.universe,
                    data: dmx.data,
                    sequence: dmx.sequence,
                    priority: 100,
                    source_name: format!("artnet@{}", src.ip()),
                };
                router.route(update);
                stats.routed.fetch_add(1, Ordering::Relaxed);
            }
            ArtNetPacket::Poll => {
                debug!(%src, "art-net poll received");
                let counter = node_report_counter.fetch_add(1, Ordering::Relaxed) + 1;
                let id = identity.current();
                let fields = PollReplyFields {
                    node_ip: id.ipv4,
                    mac: id.mac,
                    short_name: &id.short_name,
                    long_name: &id.long_name,
                    node_report_counter: counter,
                    swout: [
                        (config.port1.universe_primary & 0x0F) as u8,
                        (config.port2.universe_primary & 0x0F) as u8,
                    ],
                };
                let reply = artnet::build_poll_reply(&fields);
                if let Err(err) = socket.send_to(&reply, src).await {
                    warn!(%err, %src, "failed to send art-net poll reply");
                }
            }
            ArtNetPacket::Other(_) => {}
        }
    }

    info!("art-net receiver stopped");
    Ok(())
}
