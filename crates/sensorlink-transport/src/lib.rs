//! Byte-stream link between the host and an attached vision device.
//!
//! A device link is a bidirectional byte stream. On hardware this is a USB
//! bulk endpoint pair or a PCIe ring; here the link is carried over a Unix
//! domain socket so the host runtime can be exercised against a device
//! emulator or a bridging daemon.
//!
//! This is the lowest layer of sensorlink. Packetization lives in
//! `sensorlink-frame`; everything above works on [`LinkStream`].

pub mod error;
pub mod stream;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use stream::LinkStream;

#[cfg(unix)]
pub use uds::LinkListener;
