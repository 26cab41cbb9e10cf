//! Per-call reassembly of Link Control data out of individual voice frames.
//!
//! Two paths feed into an [`Lc`]: Voice Header/Terminator frames carry a
//! Full LC directly, while Voice B/C/D/E bursts each carry one 32-bit
//! embedded-LC fragment that must be collected in strict sequence before
//! it decodes to anything.

use crate::error::ProtoError;
use crate::fec;
use crate::lc::{self, Lc, LcTalkerAliasBlock, LcTalkerAliasHeader};
use crate::packet::Data;

/// Accumulates embedded-LC fragments for a single call stream.
///
/// Each burst carries its own slot (B=0, C=1, D=2, E=3) derived from
/// `vseq`, not from how many fragments have arrived so far — so a burst
/// landing in the wrong slot is rejected the instant it arrives, even if
/// it's the very first fragment of a fresh window, matching the source
/// assembler's `process_voicedata` (`len(self.lcs) != burst_n` is checked
/// unconditionally, before the vseq-continuity check even applies).
#[derive(Debug, Clone)]
pub struct EmbLcAssembler {
    fragments: Vec<Option<[u8; fec::EMB_LC_FRAGMENT_LEN]>>,
    last_vseq: Option<u8>,
}

impl EmbLcAssembler {
    pub fn new() -> Self {
        Self { fragments: vec![None; fec::EMB_LC_FRAGMENT_COUNT], last_vseq: None }
    }

    /// Feeds one fragment. `vseq` (1..=4, burst B..E) identifies which slot
    /// the fragment belongs in; `vseq` must also strictly increment (mod
    /// 256) across consecutive calls once a fragment has been accepted.
    /// Returns the assembled Full LC bytes once the last of the four
    /// fragments has arrived.
    pub fn feed(
        &mut self,
        vseq: u8,
        fragment: [u8; fec::EMB_LC_FRAGMENT_LEN],
    ) -> Result<Option<[u8; fec::FULL_LC_LEN]>, ProtoError> {
        let burst_n = vseq.wrapping_sub(1) as usize;

        if let Some(last) = self.last_vseq {
            let expected = last.wrapping_add(1);
            if vseq != expected {
                self.reset();
                return Err(ProtoError::EmbLcAssembler(format!(
                    "out-of-order embedded LC fragment: expected vseq {expected}, got {vseq}"
                )));
            }
        }

        let collected = self.fragments.iter().filter(|f| f.is_some()).count();
        if burst_n >= self.fragments.len() || burst_n != collected {
            self.reset();
            return Err(ProtoError::EmbLcAssembler(format!(
                "embedded LC fragment out of sequence: burst {burst_n}, expected slot {collected}"
            )));
        }
        self.fragments[burst_n] = Some(fragment);
        self.last_vseq = Some(vseq);

        if burst_n + 1 != fec::EMB_LC_FRAGMENT_COUNT {
            return Ok(None);
        }

        let collected_len = self.fragments.iter().flatten().count();
        if collected_len != fec::EMB_LC_FRAGMENT_COUNT {
            self.reset();
            return Err(ProtoError::EmbLcAssembler(format!(
                "incomplete embedded LC at last burst: got {} of {} fragments",
                collected_len,
                fec::EMB_LC_FRAGMENT_COUNT
            )));
        }
        let collected: Vec<_> = self.fragments.iter().flatten().collect();
        let fragments: [[u8; fec::EMB_LC_FRAGMENT_LEN]; fec::EMB_LC_FRAGMENT_COUNT] =
            [*collected[0], *collected[1], *collected[2], *collected[3]];
        let result = fec::decode_emblc(&fragments)?;
        self.reset();
        Ok(Some(result))
    }

    pub fn reset(&mut self) {
        self.fragments.iter_mut().for_each(|f| *f = None);
        self.last_vseq = None;
    }
}

impl Default for EmbLcAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Accumulates talker-alias header + continuation blocks for a single call.
#[derive(Debug, Clone, Default)]
struct TalkerAliasAssembler {
    header: Option<LcTalkerAliasHeader>,
    blocks: Vec<LcTalkerAliasBlock>,
}

impl TalkerAliasAssembler {
    fn feed(&mut self, lc: &Lc) -> Option<String> {
        match lc {
            Lc::TalkerAliasHeader(h) => {
                self.header = Some(*h);
                self.blocks.clear();
            }
            Lc::TalkerAliasBlock(b) => {
                if !self.blocks.iter().any(|existing| existing.block == b.block) {
                    self.blocks.push(*b);
                }
            }
            _ => return None,
        }
        let header = self.header.as_ref()?;
        lc::decode_talker_alias_text(header, &self.blocks)
    }
}

/// Decodes the Link Control attached to a single call, across Full LC
/// frames (header/terminator) and embedded LC fragments (voice bursts).
#[derive(Debug, Default)]
pub struct CallLcDecoder {
    emb: EmbLcAssembler,
    talker_alias: TalkerAliasAssembler,
}

impl CallLcDecoder {
    pub fn new() -> Self {
        Self { emb: EmbLcAssembler::new(), talker_alias: TalkerAliasAssembler::default() }
    }

    pub fn on_voice_header(&mut self, frame: &Data) -> Result<Lc, ProtoError> {
        self.emb.reset();
        self.decode_full_lc_frame(frame)
    }

    pub fn on_voice_terminator(&mut self, frame: &Data) -> Result<Lc, ProtoError> {
        let lc = self.decode_full_lc_frame(frame)?;
        self.emb.reset();
        Ok(lc)
    }

    fn decode_full_lc_frame(&self, frame: &Data) -> Result<Lc, ProtoError> {
        let payload: [u8; 33] =
            frame.dmr_data().try_into().map_err(|_| ProtoError::BadPacket("dmr_data length"))?;
        let bytes = fec::decode_full_lc(&payload)?;
        Ok(lc::parse_full_lc(&bytes))
    }

    /// Feeds a Voice A/B/C/D/E/F burst. Only B/C/D/E carry embedded-LC
    /// fragments; other bursts return `Ok(None)`.
    pub fn on_voice_burst(&mut self, frame: &Data) -> Result<Option<Lc>, ProtoError> {
        let vseq = frame.vseq();
        if !(1..=4).contains(&vseq) {
            return Ok(None);
        }
        let payload: [u8; 33] =
            frame.dmr_data().try_into().map_err(|_| ProtoError::BadPacket("dmr_data length"))?;
        let fragment = fec::decode_emblc_fragment(&payload);
        match self.emb.feed(vseq, fragment)? {
            Some(bytes) => Ok(Some(lc::parse_full_lc(&bytes))),
            None => Ok(None),
        }
    }

    /// Feeds any decoded [`Lc`] (from header, terminator, or embedded
    /// fragments) into the talker-alias reassembler, returning the decoded
    /// string once the header and every block it names have arrived.
    pub fn feed_talker_alias(&mut self, lc: &Lc) -> Option<String> {
        self.talker_alias.feed(lc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lc::{Lc, LcCall, TalkerAliasFormat};
    use crate::packet::{CallType, Data, VoiceType};

    fn burst(vseq: u8, dmr_data: [u8; 33]) -> Data {
        let mut p = Data::new();
        p.set_call_type(CallType::Group);
        p.set_vseq(vseq).unwrap();
        p.set_voice_type(match vseq {
            1 => VoiceType::BurstB,
            2 => VoiceType::BurstC,
            3 => VoiceType::BurstD,
            _ => VoiceType::BurstE,
        });
        p.set_dmr_data(&dmr_data).unwrap();
        p
    }

    #[test]
    fn assembles_full_lc_from_four_bursts() {
        let lc = Lc::GroupVoice(LcCall { dst_id: 9, src_id: 10 });
        let full = crate::lc::build_full_lc(&lc, 0);

        let mut assembler = EmbLcAssembler::new();
        assert!(assembler.feed(1, [full[0], full[1], full[2], full[3]]).unwrap().is_none());
        assert!(assembler.feed(2, [full[4], full[5], full[6], full[7]]).unwrap().is_none());
        assert!(assembler.feed(3, [full[8], 0, 0, 0]).unwrap().is_none());
        let result = assembler.feed(4, [0, 0, 0, 0]).unwrap();
        assert_eq!(result, Some(full));
    }

    #[test]
    fn rejects_out_of_order_fragments() {
        let mut assembler = EmbLcAssembler::new();
        assembler.feed(1, [0; 4]).unwrap();
        let err = assembler.feed(4, [0; 4]).unwrap_err();
        assert!(matches!(err, ProtoError::EmbLcAssembler(_)));
    }

    #[test]
    fn rejects_wrong_slot_as_the_very_first_fragment() {
        // Burst C (vseq=2) arriving with no prior fragments belongs in
        // slot 1, not slot 0 — it must be rejected outright rather than
        // silently landing in B's slot.
        let mut assembler = EmbLcAssembler::new();
        let err = assembler.feed(2, [0; 4]).unwrap_err();
        assert!(matches!(err, ProtoError::EmbLcAssembler(_)));
    }

    #[test]
    fn call_lc_decoder_round_trips_via_voice_bursts() {
        let lc = Lc::UnitVoice(LcCall { dst_id: 42, src_id: 99 });
        let full = crate::lc::build_full_lc(&lc, 0);

        let mut decoder = CallLcDecoder::new();
        let mut payload1 = [0u8; 33];
        payload1[..4].copy_from_slice(&full[0..4]);
        let mut payload2 = [0u8; 33];
        payload2[..4].copy_from_slice(&full[4..8]);
        let mut payload3 = [0u8; 33];
        payload3[0] = full[8];
        let payload4 = [0u8; 33];

        assert!(decoder.on_voice_burst(&burst(1, payload1)).unwrap().is_none());
        assert!(decoder.on_voice_burst(&burst(2, payload2)).unwrap().is_none());
        assert!(decoder.on_voice_burst(&burst(3, payload3)).unwrap().is_none());
        let result = decoder.on_voice_burst(&burst(4, payload4)).unwrap();
        assert_eq!(result, Some(lc));
    }

    #[test]
    fn terminator_resets_embedded_assembler_for_next_call() {
        let mut decoder = CallLcDecoder::new();
        decoder.emb.feed(1, [1, 2, 3, 4]).unwrap();

        let mut term = Data::new();
        term.set_voice_type(VoiceType::Term);
        term.set_dmr_data(&[0u8; 33]).unwrap();
        decoder.on_voice_terminator(&term).unwrap();

        // A fresh header-to-terminator sequence can start again at vseq 1.
        assert!(decoder.emb.feed(1, [9, 9, 9, 9]).is_ok());
    }

    #[test]
    fn talker_alias_assembles_across_header_and_block() {
        let mut decoder = CallLcDecoder::new();
        let header = Lc::TalkerAliasHeader(crate::lc::LcTalkerAliasHeader {
            format: TalkerAliasFormat::Utf8,
            length: 9,
            data: *b"Repeater",
        });
        assert!(decoder.feed_talker_alias(&header).is_some());

        let block = Lc::TalkerAliasBlock(crate::lc::LcTalkerAliasBlock {
            block: 1,
            data: [b'1', 0, 0, 0, 0, 0, 0],
        });
        let text = decoder.feed_talker_alias(&block).unwrap();
        assert_eq!(text, "Repeater1");
    }
}
