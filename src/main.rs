//! Process entry point: loads configuration, wires the merge engine,
//! router, and per-protocol receivers, then runs the output schedulers
//! until interrupted.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};

use dmx_bridge::config::BridgeConfig;
use dmx_bridge::dmx_sink::OfflineDmxSink;
use dmx_bridge::merge::{MergeEngine, MonotonicClock};
use dmx_bridge::node_identity::{NodeIdentity, NodeIdentityHandle};
use dmx_bridge::output;
use dmx_bridge::receiver::{artnet, sacn, ReceiverStats};
use dmx_bridge::router::Router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let config = BridgeConfig::load(config_path.as_deref())?;
    info!(?config, "loaded configuration");

    let clock = Arc::new(MonotonicClock::new());
    let engine = Arc::new(MergeEngine::new(clock));
    engine.configure(1, config.port1.merge_mode, config.port1.effective_timeout_ms())?;
    engine.configure(2, config.port2.merge_mode, config.port2.effective_timeout_ms())?;

    let config = Arc::new(config);
    let router = Arc::new(Router::new((*config).clone(), engine.clone()));

    let identity = NodeIdentity::discover(
        config.node_info.short_name.clone(),
        config.node_info.long_name.clone(),
    );
    let identity = NodeIdentityHandle::new(identity);

    let sink = Arc::new(OfflineDmxSink::default());
    let bind_addr = Ipv4Addr::UNSPECIFIED;

    let artnet_stats = Arc::new(ReceiverStats::default());
    let artnet_running = Arc::new(AtomicBool::new(true));
    let artnet_task = tokio::spawn({
        let router = router.clone();
        let identity = identity.clone();
        let config = config.clone();
        let stats = artnet_stats.clone();
        let running = artnet_running.clone();
        async move {
            if let Err(err) = artnet::run(bind_addr, router, identity, config, stats, running).await
            {
                error!(%err, "art-net receiver exited with an error");
            }
        }
    });

    let sacn_stats = Arc::new(ReceiverStats::default());
    let sacn_running = Arc::new(AtomicBool::new(true));
    let sacn_task = tokio::spawn({
        let router = router.clone();
        let config = config.clone();
        let stats = sacn_stats.clone();
        let running = sacn_running.clone();
        async move {
            if let Err(err) = sacn::run(bind_addr, router, config, stats, running).await {
                error!(%err, "sacn receiver exited with an error");
            }
        }
    });

    let (stop_tx, stop_rx1) = watch::channel(false);
    let stop_rx2 = stop_rx1.clone();
    let output_task_1 = tokio::spawn(output::run(1, engine.clone(), sink.clone(), stop_rx1));
    let output_task_2 = tokio::spawn(output::run(2, engine.clone(), sink.clone(), stop_rx2));

    info!("dmx-bridge running, press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");

    artnet_running.store(false, Ordering::Relaxed);
    sacn_running.store(false, Ordering::Relaxed);
    let _ = stop_tx.send(true);

    let _ = tokio::join!(artnet_task, sacn_task, output_task_1, output_task_2);

    info!(
        artnet = ?artnet_stats.snapshot(),
        sacn = ?sacn_stats.snapshot(),
        "dmx-bridge stopped"
    );
    Ok(())
}
