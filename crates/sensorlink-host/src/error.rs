use sensorlink_frame::FrameError;
use sensorlink_message::EncodeError;
use sensorlink_transport::TransportError;

/// Errors that end a device link session or a host-side operation.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// The link failed and reconnection is disabled.
    #[error("device link failed: {0}")]
    TransportFailure(#[source] FrameError),

    /// `disconnect` was requested; the link will not be re-established.
    #[error("device link permanently disconnected (last failure: {cause})")]
    TerminalDisconnect {
        #[source]
        cause: FrameError,
    },

    /// The downstream consumer is gone.
    #[error("message output closed")]
    OutputClosed,

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// A message could not be encoded for sending.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
}

pub type Result<T> = std::result::Result<T, HostError>;
