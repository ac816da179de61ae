//! Host-side device link client.
//!
//! [`LinkIn`] is the worker that reads one device link: frames in, typed
//! messages out to a single [`MessageSink`], in the order they arrived. When
//! the link drops it waits for a replacement transport instead of tearing
//! the pipeline down, until told to disconnect.
//!
//! [`DeviceListener`] and [`connect_device`] set up links over Unix domain
//! sockets, for hosts and for device emulators respectively.

pub mod config;
#[cfg(unix)]
pub mod connector;
pub mod error;
pub mod link_in;
#[cfg(unix)]
pub mod listener;
pub mod sink;

pub use config::{LinkConfig, LinkInConfig};
#[cfg(unix)]
pub use connector::{connect_device, MessageWriter};
pub use error::{HostError, Result};
pub use link_in::{LinkIn, LinkInHandle, LinkState, LinkStats};
#[cfg(unix)]
pub use listener::DeviceListener;
pub use sink::{sink_fn, FnSink, MessageSink, SinkClosed};
