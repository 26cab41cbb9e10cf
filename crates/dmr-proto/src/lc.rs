//! Layer-2 Link Control: the 9-byte payload carried by Voice Header,
//! Voice Terminator and embedded-LC frames.

use crate::fields::get_uint;

pub const FLCO_GROUP_VOICE: u8 = 0x00;
pub const FLCO_UNIT_VOICE: u8 = 0x03;
pub const FLCO_TALKER_ALIAS_HEADER: u8 = 0x04;
pub const FLCO_TALKER_ALIAS_BLOCK1: u8 = 0x05;
pub const FLCO_TALKER_ALIAS_BLOCK2: u8 = 0x06;
pub const FLCO_TALKER_ALIAS_BLOCK3: u8 = 0x07;
pub const FLCO_GPS_INFO: u8 = 0x08;

/// Group or unit-to-unit voice call grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LcCall {
    pub dst_id: u32,
    pub src_id: u32,
}

/// Talker-alias character encoding, carried in the header's 2-bit format
/// field. `SevenBit` is not decoded (see SPEC_FULL.md §4.B); callers get
/// `None` back from [`TalkerAliasText::decode`] for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TalkerAliasFormat {
    SevenBit,
    Iso8,
    Utf8,
    Utf16Be,
}

impl TalkerAliasFormat {
    fn from_bits(v: u8) -> Self {
        match v & 0b11 {
            0 => TalkerAliasFormat::SevenBit,
            1 => TalkerAliasFormat::Iso8,
            2 => TalkerAliasFormat::Utf8,
            _ => TalkerAliasFormat::Utf16Be,
        }
    }

    fn bits(self) -> u8 {
        match self {
            TalkerAliasFormat::SevenBit => 0,
            TalkerAliasFormat::Iso8 => 1,
            TalkerAliasFormat::Utf8 => 2,
            TalkerAliasFormat::Utf16Be => 3,
        }
    }
}

/// Talker-alias header: declares the format and total character length,
/// carries the first 6 data bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LcTalkerAliasHeader {
    pub format: TalkerAliasFormat,
    pub length: u8,
    pub data: [u8; 6],
}

/// Talker-alias continuation fragment (block 1, 2 or 3), 7 data bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LcTalkerAliasBlock {
    pub block: u8,
    pub data: [u8; 7],
}

/// GPS position report.
#[derive(Debug, Clone, Copy)]
pub struct LcLocation {
    pub lat_deg: f64,
    pub lon_deg: f64,
}

impl PartialEq for LcLocation {
    fn eq(&self, other: &Self) -> bool {
        (self.lat_deg - other.lat_deg).abs() < 1e-4 && (self.lon_deg - other.lon_deg).abs() < 1e-4
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lc {
    GroupVoice(LcCall),
    UnitVoice(LcCall),
    TalkerAliasHeader(LcTalkerAliasHeader),
    TalkerAliasBlock(LcTalkerAliasBlock),
    GpsInfo(LcLocation),
    /// Unrecognized `FLCO`; carried through unmodified so the dispatcher can
    /// still forward the frame even if it can't interpret the LC.
    Unknown { flco: u8, fid: u8, data: [u8; 7] },
}

impl Lc {
    pub fn flco(&self) -> u8 {
        match self {
            Lc::GroupVoice(_) => FLCO_GROUP_VOICE,
            Lc::UnitVoice(_) => FLCO_UNIT_VOICE,
            Lc::TalkerAliasHeader(_) => FLCO_TALKER_ALIAS_HEADER,
            Lc::TalkerAliasBlock(b) => FLCO_TALKER_ALIAS_HEADER + b.block,
            Lc::GpsInfo(_) => FLCO_GPS_INFO,
            Lc::Unknown { flco, .. } => *flco,
        }
    }
}

fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

fn parse_location(payload: &[u8; 7]) -> LcLocation {
    let lon_raw = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) & 0x01FF_FFFF;
    let lon25 = sign_extend(lon_raw, 25);
    let lon_deg = f64::from(lon25) * 360.0 / f64::from(1u32 << 25);

    let lat_raw = u32::from_be_bytes([0, payload[4], payload[5], payload[6]]);
    let lat24 = sign_extend(lat_raw, 24);
    let lat_deg = f64::from(lat24) * 180.0 / f64::from(1u32 << 24);

    LcLocation { lat_deg, lon_deg }
}

fn build_location(loc: &LcLocation) -> [u8; 7] {
    let lon25 = ((loc.lon_deg * f64::from(1u32 << 25) / 360.0).round() as i32) & 0x01FF_FFFF;
    let lat24 = ((loc.lat_deg * f64::from(1u32 << 24) / 180.0).round() as i32) & 0x00FF_FFFF;

    let lon_bytes = (lon25 as u32).to_be_bytes();
    let lat_bytes = (lat24 as u32).to_be_bytes();
    [lon_bytes[0], lon_bytes[1], lon_bytes[2], lon_bytes[3], lat_bytes[1], lat_bytes[2], lat_bytes[3]]
}

/// Parses a 9-byte Full LC payload: `[flco:1][fid:1][payload:7]`.
pub fn parse_full_lc(bytes: &[u8; 9]) -> Lc {
    let flco = bytes[0] & 0x3F;
    let fid = bytes[1];
    let payload: [u8; 7] = bytes[2..9].try_into().expect("7 bytes");

    match flco {
        FLCO_GROUP_VOICE | FLCO_UNIT_VOICE => {
            let call = LcCall { dst_id: get_uint(&payload, 0, 3), src_id: get_uint(&payload, 3, 3) };
            if flco == FLCO_GROUP_VOICE {
                Lc::GroupVoice(call)
            } else {
                Lc::UnitVoice(call)
            }
        }
        FLCO_TALKER_ALIAS_HEADER => {
            let format = TalkerAliasFormat::from_bits(payload[0] >> 5);
            let length = payload[0] & 0x1F;
            let data: [u8; 6] = payload[1..7].try_into().expect("6 bytes");
            Lc::TalkerAliasHeader(LcTalkerAliasHeader { format, length, data })
        }
        FLCO_TALKER_ALIAS_BLOCK1 | FLCO_TALKER_ALIAS_BLOCK2 | FLCO_TALKER_ALIAS_BLOCK3 => {
            Lc::TalkerAliasBlock(LcTalkerAliasBlock { block: flco - FLCO_TALKER_ALIAS_HEADER, data: payload })
        }
        FLCO_GPS_INFO => Lc::GpsInfo(parse_location(&payload)),
        other => Lc::Unknown { flco: other, fid, data: payload },
    }
}

/// Serializes an [`Lc`] back to its 9-byte wire form.
pub fn build_full_lc(lc: &Lc, fid: u8) -> [u8; 9] {
    let mut out = [0u8; 9];
    out[0] = lc.flco();
    out[1] = fid;
    match lc {
        Lc::GroupVoice(call) | Lc::UnitVoice(call) => {
            out[2] = ((call.dst_id >> 16) & 0xFF) as u8;
            out[3] = ((call.dst_id >> 8) & 0xFF) as u8;
            out[4] = (call.dst_id & 0xFF) as u8;
            out[5] = ((call.src_id >> 16) & 0xFF) as u8;
            out[6] = ((call.src_id >> 8) & 0xFF) as u8;
            out[7] = (call.src_id & 0xFF) as u8;
        }
        Lc::TalkerAliasHeader(header) => {
            out[2] = (header.format.bits() << 5) | (header.length & 0x1F);
            out[3..9].copy_from_slice(&header.data);
        }
        Lc::TalkerAliasBlock(block) => out[2..9].copy_from_slice(&block.data),
        Lc::GpsInfo(loc) => out[2..9].copy_from_slice(&build_location(loc)),
        Lc::Unknown { data, .. } => out[2..9].copy_from_slice(data),
    }
    out
}

/// Decodes a talker alias once its header and however many continuation
/// blocks have arrived into a human-readable string. Returns `None` for the
/// unsupported 7-bit packed format or if not enough bytes are available for
/// the declared length.
pub fn decode_talker_alias_text(
    header: &LcTalkerAliasHeader,
    blocks: &[LcTalkerAliasBlock],
) -> Option<String> {
    let mut bytes = header.data.to_vec();
    let mut sorted = blocks.to_vec();
    sorted.sort_by_key(|b| b.block);
    for block in &sorted {
        bytes.extend_from_slice(&block.data);
    }

    match header.format {
        TalkerAliasFormat::SevenBit => None,
        TalkerAliasFormat::Iso8 => {
            let len = header.length as usize;
            bytes.truncate(len.min(bytes.len()));
            Some(bytes.iter().map(|&b| b as char).collect())
        }
        TalkerAliasFormat::Utf8 => {
            let len = header.length as usize;
            bytes.truncate(len.min(bytes.len()));
            String::from_utf8(bytes).ok()
        }
        TalkerAliasFormat::Utf16Be => {
            let len = (header.length as usize) * 2;
            bytes.truncate(len.min(bytes.len()));
            let units: Vec<u16> =
                bytes.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect();
            String::from_utf16(&units).ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_voice_round_trip() {
        let lc = Lc::GroupVoice(LcCall { dst_id: 0x00_1234, src_id: 0x00_5678 });
        let bytes = build_full_lc(&lc, 0x10);
        let parsed = parse_full_lc(&bytes);
        assert_eq!(parsed, lc);
    }

    #[test]
    fn unit_voice_round_trip() {
        let lc = Lc::UnitVoice(LcCall { dst_id: 111, src_id: 222 });
        let bytes = build_full_lc(&lc, 0x10);
        assert_eq!(parse_full_lc(&bytes), lc);
    }

    #[test]
    fn gps_location_round_trips_within_tolerance() {
        let lc = Lc::GpsInfo(LcLocation { lat_deg: 40.7128, lon_deg: -74.0060 });
        let bytes = build_full_lc(&lc, 0x10);
        assert_eq!(parse_full_lc(&bytes), lc);
    }

    #[test]
    fn talker_alias_header_round_trip() {
        let lc = Lc::TalkerAliasHeader(LcTalkerAliasHeader {
            format: TalkerAliasFormat::Utf8,
            length: 5,
            data: *b"ABCDEF",
        });
        let bytes = build_full_lc(&lc, 0x10);
        assert_eq!(parse_full_lc(&bytes).flco(), FLCO_TALKER_ALIAS_HEADER);
        assert_eq!(parse_full_lc(&bytes), lc);
    }

    #[test]
    fn talker_alias_block_round_trip() {
        let lc = Lc::TalkerAliasBlock(LcTalkerAliasBlock { block: 2, data: *b"ABCDEFG" });
        let bytes = build_full_lc(&lc, 0x10);
        assert_eq!(parse_full_lc(&bytes).flco(), FLCO_TALKER_ALIAS_BLOCK2);
        assert_eq!(parse_full_lc(&bytes), lc);
    }

    #[test]
    fn talker_alias_text_decodes_utf8_across_blocks() {
        let header = LcTalkerAliasHeader {
            format: TalkerAliasFormat::Utf8,
            length: 9,
            data: *b"Repeater",
        };
        let block1 = LcTalkerAliasBlock { block: 1, data: [b'1', 0, 0, 0, 0, 0, 0] };
        let decoded = decode_talker_alias_text(&header, &[block1]).unwrap();
        assert_eq!(decoded, "Repeater1");
    }

    #[test]
    fn talker_alias_seven_bit_is_unsupported() {
        let header = LcTalkerAliasHeader { format: TalkerAliasFormat::SevenBit, length: 3, data: [0; 6] };
        assert_eq!(decode_talker_alias_text(&header, &[]), None);
    }

    #[test]
    fn unknown_flco_is_preserved() {
        let bytes = [0x3F, 0x10, 1, 2, 3, 4, 5, 6, 7];
        match parse_full_lc(&bytes) {
            Lc::Unknown { flco, data, .. } => {
                assert_eq!(flco, 0x3F);
                assert_eq!(data, [1, 2, 3, 4, 5, 6, 7]);
            }
            other => panic!("expected Unknown, got {other:?}"),
        }
    }
}
