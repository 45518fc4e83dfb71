//! Art-Net v4 wire format.
//!
//! Offsets follow `kaelenfae-LXMonitor/src-tauri/src/network/artnet.rs`,
//! generalized into the data the merge engine needs (a fixed 512-byte,
//! zero-padded frame rather than a variable-length `Vec`) and extended with
//! an `ArtPollReply` *encoder* per spec §6 (the teacher only ever decodes
//! one, since it passively monitors rather than answering polls).

use std::net::Ipv4Addr;

pub const ARTNET_HEADER: &[u8; 8] = b"Art-Net\0";
pub const ARTNET_PORT: u16 = 6454;

const OPCODE_POLL: u16 = 0x2000;
const OPCODE_DMX: u16 = 0x5000;

/// A validated, zero-padded Art-Net DMX frame (spec §4.1).
#[derive(Debug, Clone)]
pub struct ArtDmx {
    pub sequence: u8,
    pub universe: u16,
    /// Always exactly 512 bytes; channels beyond the wire `length` are
    /// zero-padded per spec §4.1 ("do not leave stale data").
    pub data: [u8; 512],
}

#[derive(Debug, Clone)]
pub enum ArtNetPacket {
    Poll,
    Dmx(ArtDmx),
    /// Recognized header, opcode not handled by this core (e.g. ArtSync,
    /// ArtAddress). Carried through for stats only.
    Other(u16),
}

/// Parses one UDP payload. Returns `None` for anything failing the header
/// or opcode-specific invariants (spec §4.1: "count as invalid and drop
/// silently" — the counting is the caller's job).
pub fn parse(data: &[u8]) -> Option<ArtNetPacket> {
    if data.len() < 10 {
        return None;
    }
    if &data[0..8] != ARTNET_HEADER {
        return None;
    }
    let opcode = u16::from_le_bytes([data[8], data[9]]);
    match opcode {
        OPCODE_POLL => Some(ArtNetPacket::Poll),
        OPCODE_DMX => parse_dmx(data).map(ArtNetPacket::Dmx),
        other => Some(ArtNetPacket::Other(other)),
    }
}

fn parse_dmx(data: &[u8]) -> Option<ArtDmx> {
    // identifier(8) + opcode(2) + protoHi/Lo(2) + sequence(1) + physical(1)
    // + universe(2) + length(2) = 18 bytes of header before DMX data.
    if data.len() < 18 {
        return None;
    }
    let sequence = data[12];
    // physical (data[13]) is carried by the wire format but has no routing
    // or merge role in this spec.
    let universe = u16::from_le_bytes([data[14], data[15]]);
    let length = u16::from_be_bytes([data[16], data[17]]);
    if !(2..=512).contains(&length) {
        return None;
    }
    let length = length as usize;
    if data.len() < 18 + length {
        return None;
    }
    let mut padded = [0u8; 512];
    padded[..length].copy_from_slice(&data[18..18 + length]);
    Some(ArtDmx {
        sequence,
        universe,
        data: padded,
    })
}

/// Node identity + network identity fields an `ArtPollReply` is built from
/// (spec §6).
pub struct PollReplyFields<'a> {
    pub node_ip: Ipv4Addr,
    pub mac: [u8; 6],
    pub short_name: &'a str,
    pub long_name: &'a str,
    pub node_report_counter: u32,
    /// `universe_primary & 0x0F` for each of the two output ports.
    pub swout: [u8; 2],
}

/// Builds the 239-byte `ArtPollReply` frame (spec §6).
pub fn build_poll_reply(fields: &PollReplyFields) -> [u8; 239] {
    let mut out = [0u8; 239];
    out[0..8].copy_from_slice(ARTNET_HEADER);
    out[8..10].copy_from_slice(&0x2100u16.to_le_bytes()); // OpPollReply
    out[10..14].copy_from_slice(&fields.node_ip.octets());
    out[14..16].copy_from_slice(&ARTNET_PORT.to_le_bytes());

    write_fixed_str(&mut out[26..44], fields.short_name); // 18 bytes
    write_fixed_str(&mut out[44..108], fields.long_name); // 64 bytes
    let report = format!("#0001 [{:04}] dmx-bridge ready", fields.node_report_counter);
    write_fixed_str(&mut out[108..172], &report); // 64 bytes

    out[172..174].copy_from_slice(&2u16.to_be_bytes()); // num_ports
    out[174] = 0x80;
    out[175] = 0x80;
    // good_output left at 0 in this minimal encoder.
    out[190] = fields.swout[0] & 0x0F;
    out[191] = fields.swout[1] & 0x0F;

    out[200] = 0x00; // style: ST_NODE
    out[201..207].copy_from_slice(&fields.mac);
    out[212] = 0x08; // status2: Art-Net 4 supported
    // status1 lives at byte 23 in the wire layout; written last so the
    // zero-initialized block above doesn't need a separate offset bump.
    out[23] = 0xE0;

    out
}

fn write_fixed_str(dst: &mut [u8], s: &str) {
    let bytes = s.as_bytes();
    let n = bytes.len().min(dst.len().saturating_sub(1));
    dst[..n].copy_from_slice(&bytes[..n]);
    // remaining bytes (including the NUL terminator slot) stay zero.
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dmx_packet(universe: u16, sequence: u8, channels: &[u8]) -> Vec<u8> {
        let mut p = Vec::new();
        p.extend_from_slice(ARTNET_HEADER);
        p.extend_from_slice(&OPCODE_DMX.to_le_bytes());
        p.push(0); // protoHi
        p.push(14); // protoLo
        p.push(sequence);
        p.push(0); // physical
        p.extend_from_slice(&universe.to_le_bytes());
        p.extend_from_slice(&(channels.len() as u16).to_be_bytes());
        p.extend_from_slice(channels);
        p
    }

    #[test]
    fn rejects_missing_header() {
        let data = vec![0u8; 20];
        assert!(parse(&data).is_none());
    }

    #[test]
    fn rejects_wrong_opcode_byte_order() {
        // opcode bytes swapped (big-endian instead of little-endian) won't
        // match OPCODE_DMX and falls through to Other.
        let mut p = dmx_packet(0, 0, &[1, 2, 3]);
        p[8] = 0x50;
        p[9] = 0x00;
        match parse(&p) {
            Some(ArtNetPacket::Other(op)) => assert_ne!(op, OPCODE_DMX),
            other => panic!("expected Other, got {other:?}"),
        }
    }

    /// S5 — Art-Net length = 24.
    #[test]
    fn s5_length_24_pads_remaining_channels_with_zero() {
        let channels: Vec<u8> = (1..=24).collect();
        let packet = dmx_packet(0, 1, &channels);
        match parse(&packet) {
            Some(ArtNetPacket::Dmx(dmx)) => {
                assert_eq!(&dmx.data[0..24], &channels[..]);
                assert!(dmx.data[24..].iter().all(|&b| b == 0));
            }
            other => panic!("expected Dmx, got {other:?}"),
        }
    }

    #[test]
    fn rejects_length_below_minimum() {
        let packet = dmx_packet(0, 1, &[1]);
        assert!(parse(&packet).is_none());
    }

    #[test]
    fn rejects_truncated_payload() {
        let mut packet = dmx_packet(0, 1, &[1, 2, 3, 4]);
        packet.truncate(packet.len() - 1);
        assert!(parse(&packet).is_none());
    }

    #[test]
    fn recognizes_poll() {
        let mut p = Vec::new();
        p.extend_from_slice(ARTNET_HEADER);
        p.extend_from_slice(&OPCODE_POLL.to_le_bytes());
        p.extend_from_slice(&[0, 0]);
        assert!(matches!(parse(&p), Some(ArtNetPacket::Poll)));
    }

    /// S6 — Poll reply populates identity.
    #[test]
    fn s6_poll_reply_populates_identity() {
        let fields = PollReplyFields {
            node_ip: Ipv4Addr::new(10, 0, 0, 9),
            mac: [0x02, 0x42, 0xAC, 0x11, 0x00, 0x02],
            short_name: "bridge-1",
            long_name: "Studio A dmx-bridge",
            node_report_counter: 1,
            swout: [3 & 0x0F, 9 & 0x0F],
        };
        let reply = build_poll_reply(&fields);
        assert_eq!(reply.len(), 239);
        assert_eq!(&reply[0..8], ARTNET_HEADER);
        assert_eq!(&reply[10..14], &[10, 0, 0, 9]);
        assert_eq!(u16::from_le_bytes([reply[14], reply[15]]), ARTNET_PORT);
        assert_eq!(u16::from_be_bytes([reply[172], reply[173]]), 2);
        assert_eq!(&reply[174..176], &[0x80, 0x80]);
        assert_eq!(reply[190], 3);
        assert_eq!(reply[191], 9);
        assert_eq!(&reply[201..207], &fields.mac);
        assert_eq!(reply[23], 0xE0);
        assert_eq!(reply[212], 0x08);
        assert!(reply[26..44].starts_with(b"bridge-1"));
    }
}
