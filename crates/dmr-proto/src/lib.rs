//! MMDVM/Homebrew protocol codec: wire packet parsing and building, plus
//! DMR layer-2 Link Control decoding.

pub mod error;
pub mod fec;
pub mod fields;
pub mod lc;
pub mod lc_assembler;
pub mod packet;

pub use error::{ProtoError, ProtoResult};
pub use lc::Lc;
pub use lc_assembler::{CallLcDecoder, EmbLcAssembler};
pub use packet::{calc_password_hash, parse, CallType, Packet, VoiceType};
