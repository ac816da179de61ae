use std::time::Duration;

use sensorlink_frame::{FrameConfig, DEFAULT_MAX_PAYLOAD, DEFAULT_STREAM};

/// Configuration for a [`LinkIn`](crate::LinkIn) worker.
#[derive(Debug, Clone)]
pub struct LinkInConfig {
    /// Name used in log records for this link.
    pub name: String,
    /// Wait for a replacement transport after a link failure. When false,
    /// a failure ends the session with `TransportFailure`.
    pub reconnect: bool,
    /// Hex-dump the start of every frame at `trace` level.
    pub dump_frames: bool,
}

impl Default for LinkInConfig {
    fn default() -> Self {
        Self {
            name: "device".to_string(),
            reconnect: true,
            dump_frames: false,
        }
    }
}

/// How the host side of a device link is set up.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Link stream id messages travel on.
    pub stream: u16,
    /// Largest link packet accepted.
    pub max_payload_size: usize,
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            stream: DEFAULT_STREAM,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

impl LinkConfig {
    pub(crate) fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_payload_size: self.max_payload_size,
            read_timeout: self.read_timeout,
            write_timeout: self.write_timeout,
        }
    }
}
