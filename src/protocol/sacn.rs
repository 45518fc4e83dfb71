//! sACN / E1.31 wire format.
//!
//! Root/framing/DMP layer offsets follow
//! `kaelenfae-LXMonitor/src-tauri/src/network/sacn.rs`; stream-termination
//! and preview option-flag handling (spec §4.2) and a fixed-size,
//! zero-padded 512-byte payload (rather than the teacher's `Vec<u8>`) are
//! added to match the merge engine's `SourceUpdate` contract.

use std::net::Ipv4Addr;

pub const SACN_PORT: u16 = 5568;

const ACN_PACKET_IDENTIFIER: &[u8; 12] = b"ASC-E1.17\0\0\0";
const ROOT_VECTOR_DATA: u32 = 0x0000_0004;
const FRAMING_VECTOR_DMP: u32 = 0x0000_0002;
const DMP_VECTOR_SET_PROPERTY: u8 = 0x02;

/// Options flag: stream terminated (spec §4.2).
pub const OPTION_STREAM_TERMINATED: u8 = 0x40;
/// Options flag: preview data (spec §4.2).
pub const OPTION_PREVIEW: u8 = 0x80;

#[derive(Debug, Clone)]
pub struct E131Data {
    pub source_name: String,
    pub priority: u8,
    pub sequence_number: u8,
    pub options: u8,
    pub universe: u16,
    /// Always exactly 512 bytes; slots beyond the wire's DMX slot count are
    /// zero-padded.
    pub data: [u8; 512],
}

impl E131Data {
    pub fn is_preview(&self) -> bool {
        self.options & OPTION_PREVIEW != 0
    }

    pub fn is_stream_terminated(&self) -> bool {
        self.options & OPTION_STREAM_TERMINATED != 0
    }
}

/// Parses one UDP payload against the three-layer E1.31 header contract
/// (spec §4.2). Any mismatch returns `None`; the caller counts it.
pub fn parse(data: &[u8]) -> Option<E131Data> {
    // Root layer: preamble(2) + postamble(2) + ACN PID(12) + flags&length(2)
    // + vector(4) + CID(16) = 38 bytes.
    if data.len() < 38 {
        return None;
    }
    let preamble = u16::from_be_bytes([data[0], data[1]]);
    let postamble = u16::from_be_bytes([data[2], data[3]]);
    if preamble != 0x0010 || postamble != 0x0000 {
        return None;
    }
    if &data[4..16] != ACN_PACKET_IDENTIFIER {
        return None;
    }
    let root_vector = u32::from_be_bytes([data[18], data[19], data[20], data[21]]);
    if root_vector != ROOT_VECTOR_DATA {
        return None;
    }

    // Framing layer starts at byte 38: flags&length(2) + vector(4) +
    // source_name(64) + priority(1) + sync_address(2) + sequence(1) +
    // options(1) + universe(2) = 77 bytes, ending at byte 115.
    if data.len() < 115 {
        return None;
    }
    let framing_vector = u32::from_be_bytes([data[40], data[41], data[42], data[43]]);
    if framing_vector != FRAMING_VECTOR_DMP {
        return None;
    }
    let source_name = extract_string(&data[44..108]);
    let priority = data[108];
    if priority > 200 {
        return None;
    }
    let sequence_number = data[111];
    let options = data[112];
    let universe = u16::from_be_bytes([data[113], data[114]]);
    if !(1..=63999).contains(&universe) {
        return None;
    }

    // Stream Terminated carries no DMP layer worth trusting; the slot is
    // invalidated by the caller, not merged (spec §4.2).
    if options & OPTION_STREAM_TERMINATED != 0 {
        return Some(E131Data {
            source_name,
            priority,
            sequence_number,
            options,
            universe,
            data: [0u8; 512],
        });
    }

    // DMP layer starts at byte 115: flags&length(2) + vector(1) +
    // address_type/data_type(1) + first_address(2) + address_increment(2)
    // + property_count(2) + start_code(1) = 11 bytes, ending at byte 126.
    if data.len() < 126 {
        return None;
    }
    let dmp_vector = data[117];
    let address_type_data_type = data[118];
    let first_address = u16::from_be_bytes([data[119], data[120]]);
    let address_increment = u16::from_be_bytes([data[121], data[122]]);
    let property_count = u16::from_be_bytes([data[123], data[124]]) as usize;
    let start_code = data[125];
    if dmp_vector != DMP_VECTOR_SET_PROPERTY
        || address_type_data_type != 0xA1
        || first_address != 0x0000
        || address_increment != 0x0001
        || start_code != 0x00
    {
        return None;
    }
    let slot_count = property_count.saturating_sub(1).min(512);
    if data.len() < 126 + slot_count {
        return None;
    }
    let mut padded = [0u8; 512];
    padded[..slot_count].copy_from_slice(&data[126..126 + slot_count]);

    Some(E131Data {
        source_name,
        priority,
        sequence_number,
        options,
        universe,
        data: padded,
    })
}

fn extract_string(data: &[u8]) -> String {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).to_string()
}

/// Multicast group for `universe` (spec §4.2/§6): `239.255.(u>>8).(u&0xff)`.
pub fn multicast_address(universe: u16) -> Ipv4Addr {
    Ipv4Addr::new(239, 255, (universe >> 8) as u8, (universe & 0xFF) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_packet(universe: u16, sequence: u8, options: u8, channels: &[u8]) -> Vec<u8> {
        let mut p = vec![0u8; 126 + channels.len()];
        p[0..2].copy_from_slice(&0x0010u16.to_be_bytes());
        p[2..4].copy_from_slice(&0x0000u16.to_be_bytes());
        p[4..16].copy_from_slice(ACN_PACKET_IDENTIFIER);
        p[18..22].copy_from_slice(&ROOT_VECTOR_DATA.to_be_bytes());
        p[40..44].copy_from_slice(&FRAMING_VECTOR_DMP.to_be_bytes());
        let name = b"bridge-source";
        p[44..44 + name.len()].copy_from_slice(name);
        p[108] = 100; // priority
        p[111] = sequence;
        p[112] = options;
        p[113..115].copy_from_slice(&universe.to_be_bytes());
        p[117] = DMP_VECTOR_SET_PROPERTY;
        p[118] = 0xA1;
        p[119..121].copy_from_slice(&0x0000u16.to_be_bytes());
        p[121..123].copy_from_slice(&0x0001u16.to_be_bytes());
        p[123..125].copy_from_slice(&((channels.len() + 1) as u16).to_be_bytes());
        p[125] = 0x00;
        p[126..126 + channels.len()].copy_from_slice(channels);
        p
    }

    #[test]
    fn rejects_short_packet() {
        assert!(parse(&[0u8; 10]).is_none());
    }

    #[test]
    fn rejects_wrong_acn_identifier() {
        let mut p = data_packet(1, 0, 0, &[1, 2, 3]);
        p[4] = b'X';
        assert!(parse(&p).is_none());
    }

    #[test]
    fn rejects_universe_out_of_range() {
        let p = data_packet(0, 0, 0, &[1, 2, 3]);
        assert!(parse(&p).is_none());
        let p = data_packet(64000, 0, 0, &[1, 2, 3]);
        assert!(parse(&p).is_none());
    }

    #[test]
    fn accepts_valid_data_packet_and_pads() {
        let channels: Vec<u8> = (1..=32).collect();
        let p = data_packet(7, 5, 0, &channels);
        let parsed = parse(&p).expect("valid packet");
        assert_eq!(parsed.universe, 7);
        assert_eq!(parsed.sequence_number, 5);
        assert_eq!(&parsed.data[0..32], &channels[..]);
        assert!(parsed.data[32..].iter().all(|&b| b == 0));
        assert_eq!(parsed.source_name, "bridge-source");
    }

    /// S4 — sACN stream termination.
    #[test]
    fn s4_stream_terminated_flag_is_reported() {
        let p = data_packet(7, 0, OPTION_STREAM_TERMINATED, &[0xAA; 512]);
        let parsed = parse(&p).expect("valid packet");
        assert!(parsed.is_stream_terminated());
    }

    #[test]
    fn preview_flag_is_reported() {
        let p = data_packet(7, 0, OPTION_PREVIEW, &[1, 2, 3]);
        let parsed = parse(&p).expect("valid packet");
        assert!(parsed.is_preview());
    }

    #[test]
    fn multicast_address_maps_high_low_bytes() {
        assert_eq!(multicast_address(1), Ipv4Addr::new(239, 255, 0, 1));
        assert_eq!(multicast_address(300), Ipv4Addr::new(239, 255, 1, 44));
        assert_eq!(multicast_address(63999), Ipv4Addr::new(239, 255, 249, 255));
    }

    #[test]
    fn rejects_truncated_dmp_layer() {
        let mut p = data_packet(7, 0, 0, &[1, 2, 3]);
        p.truncate(120);
        assert!(parse(&p).is_none());
    }
}
