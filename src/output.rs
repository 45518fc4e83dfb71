//! Per-port output scheduler: fires at the fixed ~23ms / 44Hz DMX cadence
//! and hands the merged frame to the [`crate::dmx_sink::DmxSink`] (spec
//! §4.5).
//!
//! Grounded on `original_source/components/dmx_handler/dmx_handler.c`'s
//! `DMX_OUTPUT_RATE_MS = 23` per-port output task, expressed as a
//! `tokio::time::interval` loop in the style of the teacher's
//! `start_status_updater`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, warn};

use crate::dmx_sink::DmxSink;
use crate::merge::MergeEngine;

/// Nominal DMX512 output cadence: 1000ms / 44Hz ≈ 23ms (spec §4.5/§5).
pub const OUTPUT_PERIOD: Duration = Duration::from_millis(23);

/// Runs the output loop for `port` until `stop` fires. Never bursts to
/// catch up after a missed tick (spec §4.5 "Jitter budget"): `interval`'s
/// default `Burst` policy is overridden to `Delay`.
pub async fn run(
    port: u8,
    engine: Arc<MergeEngine>,
    sink: Arc<dyn DmxSink>,
    mut stop: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(OUTPUT_PERIOD);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let (data, active) = match engine.get_output(port) {
                    Ok(result) => result,
                    Err(err) => {
                        error!(port, %err, "output scheduler: port not configured, stopping");
                        return;
                    }
                };
                // Silence (all-zero, active=false) is still written every
                // tick: the DMX wire protocol needs continuous framing
                // even when nothing is merged (spec §4.5).
                if let Err(err) = sink.write_frame(port, &data) {
                    warn!(port, active, %err, "dmx sink write failed, continuing");
                }
            }
            _ = stop.changed() => {
                if *stop.borrow() {
                    return;
                }
            }
        }
    }
}
