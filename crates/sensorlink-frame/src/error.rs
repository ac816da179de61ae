/// Errors raised while reading, writing or decoding link frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The packet header contains an invalid magic number.
    #[error("invalid packet magic (expected 0x584c \"XL\")")]
    InvalidMagic,

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The frame is too short to carry a footer.
    #[error("malformed frame ({len} bytes, footer needs {min})")]
    MalformedFrame { len: usize, min: usize },

    /// An I/O error occurred while reading or writing packets.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link closed before a complete packet was received.
    #[error("link closed (incomplete packet)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
