use thiserror::Error;

pub type ProtoResult<T> = Result<T, ProtoError>;

/// Errors raised while parsing or building MMDVM wire packets and while
/// reassembling layer-2 link-control data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtoError {
    #[error("bad packet: {0}")]
    BadPacket(&'static str),

    #[error("unknown packet type: {0}")]
    UnknownPacketType(String),

    #[error("field out of range: {field} must be {expected}")]
    FieldOutOfRange {
        field: &'static str,
        expected: &'static str,
    },

    #[error("embedded LC failed: {0}")]
    EmbLcAssembler(String),

    #[error("in-call LC decoder failed: {0}")]
    CallLcDecoder(String),

    #[error("no factory entry for input: {0}")]
    Factory(String),
}
