//! Host-side device transport client for camera and sensor pipelines.
//!
//! sensorlink turns the frame stream from an attached vision device into
//! typed, ordered messages, and keeps a pipeline fed across link drops.
//!
//! # Crate Structure
//!
//! - [`transport`] — Byte-stream device link (Unix domain sockets)
//! - [`frame`] — Link packetization and the 16-byte frame footer
//! - [`message`] — Typed device messages and their frame codec
//! - [`host`] — Reconnecting read loop and message dispatch (behind `host` feature)

/// Re-export transport types.
pub mod transport {
    pub use sensorlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use sensorlink_frame::*;
}

/// Re-export message types.
pub mod message {
    pub use sensorlink_message::*;
}

/// Re-export host runtime types (requires `host` feature).
#[cfg(feature = "host")]
pub mod host {
    pub use sensorlink_host::*;
}
