use crate::codec::Frame;
use crate::error::Result;

/// A blocking source of frames: the transport contract the host runtime reads through.
///
/// `read_frame` blocks until a whole frame is available or the transport
/// fails. Any error it returns is a transport failure; the source is not read
/// again afterwards.
pub trait FrameSource: Send {
    /// Read the next frame (blocking).
    fn read_frame(&mut self) -> Result<Frame>;

    /// Release the underlying transport.
    ///
    /// Called once when the source is retired. Dropping the source releases
    /// it as well; this hook exists for sources that need an orderly close.
    fn close(&mut self) {}
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn read_frame(&mut self) -> Result<Frame> {
        (**self).read_frame()
    }

    fn close(&mut self) {
        (**self).close()
    }
}
