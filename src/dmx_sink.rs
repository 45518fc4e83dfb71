//! Stand-in for the out-of-scope physical DMX UART driver (spec §1/§6):
//! `write_frame(port, &[u8; 512]) -> Result` that blocks up to one frame
//! time.
//!
//! Grounded on `generalelectrix-rust-dmx/src/offline.rs`, a null DMX port
//! used when no hardware is attached.

use tracing::trace;

use crate::error::DmxSinkError;

/// The hardware boundary the output scheduler writes through. A real
/// deployment substitutes a UART/USB-DMX implementation; this crate only
/// needs to honor the contract.
pub trait DmxSink: Send + Sync {
    fn write_frame(&self, port: u8, data: &[u8; 512]) -> Result<(), DmxSinkError>;
}

/// Discards frames, logging at trace level. The default sink for a
/// deployment with no physical output attached (e.g. during development).
#[derive(Debug, Default)]
pub struct OfflineDmxSink;

impl DmxSink for OfflineDmxSink {
    fn write_frame(&self, port: u8, data: &[u8; 512]) -> Result<(), DmxSinkError> {
        trace!(port, first_channel = data[0], "offline sink: frame dropped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_sink_always_succeeds() {
        let sink = OfflineDmxSink;
        assert!(sink.write_frame(1, &[0u8; 512]).is_ok());
    }
}
