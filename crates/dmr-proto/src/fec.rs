//! Raw bit extraction for Link Control payloads, and the boundary to the
//! external forward-error-correction layer that turns those raw bits into
//! decoded LC bytes.
//!
//! Real DMR framing protects LC bits with BPTC(196,96) (full LC) and
//! BPTC(128,77) (embedded LC), plus a CRC. Running that FEC is out of
//! scope here (see SPEC_FULL.md); [`decode_full_lc`] and [`decode_emblc`]
//! are the documented boundary a production deployment wires to a real FEC
//! implementation. The bit-slicing that feeds them is exact and owned by
//! this crate, since it's just buffer layout, not error correction.

use crate::error::ProtoError;

pub const FULL_LC_LEN: usize = 9;
pub const EMB_LC_FRAGMENT_LEN: usize = 4;
pub const EMB_LC_FRAGMENT_COUNT: usize = 4;
const FULL_LC_RAW_BITS: usize = 196;
const DMR_PAYLOAD_BITS: usize = 264;

fn bit(data: &[u8], index: usize) -> u8 {
    (data[index / 8] >> (7 - index % 8)) & 1
}

fn set_bit(data: &mut [u8], index: usize, value: u8) {
    let mask = 1u8 << (7 - index % 8);
    if value == 1 {
        data[index / 8] |= mask;
    } else {
        data[index / 8] &= !mask;
    }
}

fn copy_bits(dst: &mut [u8], dst_start: usize, src: &[u8], src_start: usize, num_bits: usize) {
    for i in 0..num_bits {
        set_bit(dst, dst_start + i, bit(src, src_start + i));
    }
}

/// Extracts the 196 raw FEC-protected bits of a Voice Header/Terminator
/// frame's Full LC: bits `[0..98)` concatenated with the last 98 bits of
/// the 264-bit DMR payload.
pub fn extract_full_lc_bits(payload: &[u8; 33]) -> Vec<u8> {
    let mut raw = vec![0u8; FULL_LC_RAW_BITS.div_ceil(8)];
    copy_bits(&mut raw, 0, payload, 0, 98);
    copy_bits(&mut raw, 98, payload, DMR_PAYLOAD_BITS - 98, 98);
    raw
}

/// Inverse of [`extract_full_lc_bits`]: writes 196 raw bits back into a
/// 33-byte payload's two reserved bit ranges. Used by tests to construct
/// wire-accurate fixtures.
pub fn embed_full_lc_bits(payload: &mut [u8; 33], raw_bits: &[u8]) {
    copy_bits(payload, 0, raw_bits, 0, 98);
    copy_bits(payload, DMR_PAYLOAD_BITS - 98, raw_bits, 98, 98);
}

/// Extracts the 32 raw embedded-LC bits (`[116..148)`) of a Voice B/C/D/E
/// burst's payload.
pub fn extract_emblc_fragment_bits(payload: &[u8; 33]) -> [u8; EMB_LC_FRAGMENT_LEN] {
    let mut raw = [0u8; EMB_LC_FRAGMENT_LEN];
    copy_bits(&mut raw, 0, payload, 116, 32);
    raw
}

/// Inverse of [`extract_emblc_fragment_bits`].
pub fn embed_emblc_fragment_bits(payload: &mut [u8; 33], fragment: &[u8; EMB_LC_FRAGMENT_LEN]) {
    copy_bits(payload, 116, fragment, 0, 32);
}

fn stub_fec_decode(raw_bits: &[u8]) -> Result<[u8; FULL_LC_LEN], ProtoError> {
    raw_bits
        .get(..FULL_LC_LEN)
        .and_then(|s| s.try_into().ok())
        .ok_or(ProtoError::BadPacket("lc raw bits too short"))
}

fn stub_fec_encode(lc: &[u8; FULL_LC_LEN], raw_len: usize) -> Vec<u8> {
    let mut raw = vec![0u8; raw_len];
    raw[..FULL_LC_LEN].copy_from_slice(lc);
    raw
}

/// Recovers the 9-byte Full LC block from a Voice Header/Terminator's
/// 33-byte DMR payload.
pub fn decode_full_lc(payload: &[u8; 33]) -> Result<[u8; FULL_LC_LEN], ProtoError> {
    stub_fec_decode(&extract_full_lc_bits(payload))
}

/// Embeds a 9-byte Full LC block into a Voice Header/Terminator payload.
pub fn encode_full_lc(lc: &[u8; FULL_LC_LEN]) -> [u8; 33] {
    let raw = stub_fec_encode(lc, FULL_LC_RAW_BITS.div_ceil(8));
    let mut payload = [0u8; 33];
    embed_full_lc_bits(&mut payload, &raw);
    payload
}

/// Extracts one embedded-LC fragment from a Voice B/C/D/E burst's payload.
pub fn decode_emblc_fragment(payload: &[u8; 33]) -> [u8; EMB_LC_FRAGMENT_LEN] {
    extract_emblc_fragment_bits(payload)
}

/// Embeds one embedded-LC fragment into a Voice B/C/D/E burst's payload.
pub fn encode_emblc_fragment(payload: &mut [u8; 33], fragment: &[u8; EMB_LC_FRAGMENT_LEN]) {
    embed_emblc_fragment_bits(payload, fragment);
}

/// Recovers the 9-byte Full LC block from the four concatenated 32-bit
/// embedded-LC fragments (128 raw bits).
pub fn decode_emblc(
    fragments: &[[u8; EMB_LC_FRAGMENT_LEN]; EMB_LC_FRAGMENT_COUNT],
) -> Result<[u8; FULL_LC_LEN], ProtoError> {
    let mut raw = Vec::with_capacity(EMB_LC_FRAGMENT_LEN * EMB_LC_FRAGMENT_COUNT);
    for fragment in fragments {
        raw.extend_from_slice(fragment);
    }
    stub_fec_decode(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_lc_bit_extraction_round_trips() {
        let mut payload = [0u8; 33];
        let raw_in = vec![0xAAu8; FULL_LC_RAW_BITS.div_ceil(8)];
        embed_full_lc_bits(&mut payload, &raw_in);
        let raw_out = extract_full_lc_bits(&payload);
        // Only the 196 written bits are guaranteed to match; trailing pad
        // bits of raw_in beyond bit 196 are never written back.
        for i in 0..FULL_LC_RAW_BITS {
            assert_eq!(bit(&raw_out, i), bit(&raw_in, i), "bit {i} mismatch");
        }
    }

    #[test]
    fn full_lc_decode_round_trip() {
        let lc = [1, 2, 3, 4, 5, 6, 7, 8, 9];
        let payload = encode_full_lc(&lc);
        assert_eq!(decode_full_lc(&payload).unwrap(), lc);
    }

    #[test]
    fn emblc_fragment_bit_offset_is_isolated() {
        let mut payload = [0xFFu8; 33];
        let fragment = [0u8; EMB_LC_FRAGMENT_LEN];
        embed_emblc_fragment_bits(&mut payload, &fragment);
        assert_eq!(decode_emblc_fragment(&payload), fragment);
        // Bits outside [116..148) are untouched.
        assert_eq!(bit(&payload, 115), 1);
        assert_eq!(bit(&payload, 148), 1);
    }

    #[test]
    fn emblc_decode_concatenates_four_fragments() {
        let fragments = [[1, 2, 3, 4], [5, 6, 7, 8], [9, 10, 11, 12], [13, 14, 15, 16]];
        let lc = decode_emblc(&fragments).unwrap();
        assert_eq!(lc, [1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }
}
