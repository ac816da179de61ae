use std::path::Path;

use sensorlink_frame::FrameReader;
use sensorlink_transport::{LinkListener, LinkStream};
use tracing::debug;

use crate::config::LinkConfig;
use crate::error::Result;

/// Host endpoint devices connect to.
///
/// Each accepted connection becomes a frame source bound to the configured
/// link stream, ready for [`LinkIn`](crate::LinkIn) or
/// [`LinkInHandle::set_connection`](crate::LinkInHandle::set_connection).
pub struct DeviceListener {
    listener: LinkListener,
    config: LinkConfig,
}

impl DeviceListener {
    /// Bind to a Unix domain socket path.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            listener: LinkListener::bind(path)?,
            config: LinkConfig::default(),
        })
    }

    /// Override link configuration for connections accepted from now on.
    pub fn with_config(mut self, config: LinkConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Block until a device connects.
    ///
    /// Keep a clone of `reader.get_ref()` to close the connection from
    /// another thread.
    pub fn accept(&self) -> Result<FrameReader<LinkStream>> {
        let stream = self.listener.accept()?;
        let reader = FrameReader::with_config_link(stream, self.config.frame_config())?
            .bind_stream(self.config.stream);
        debug!(stream = self.config.stream, "device connection ready");
        Ok(reader)
    }

    /// Bound socket path.
    pub fn path(&self) -> &Path {
        self.listener.path()
    }
}
