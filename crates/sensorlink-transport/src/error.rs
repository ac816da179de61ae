use std::path::PathBuf;

/// Errors raised by the device link transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind the link endpoint.
    #[error("failed to bind link endpoint {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to connect to the link endpoint.
    #[error("failed to connect to link endpoint {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to accept an incoming device connection.
    #[error("failed to accept device connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on the link stream.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The endpoint path is too long for the platform.
    #[error("link endpoint path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },
}

pub type Result<T> = std::result::Result<T, TransportError>;
