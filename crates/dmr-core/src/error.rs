use thiserror::Error;

pub type DmrResult<T> = Result<T, DmrError>;

/// Top-level error taxonomy for the master server, formalizing the
/// propagation policy: transport and parsing errors never crash the
/// dispatcher; protocol violations affect one peer only.
#[derive(Error, Debug)]
pub enum DmrError {
    #[error(transparent)]
    Proto(#[from] dmr_proto::ProtoError),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}
