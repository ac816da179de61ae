//! Where decoded messages go.

use std::sync::mpsc::{Sender, SyncSender};

use sensorlink_message::Message;

/// The consumer behind a sink has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("message sink closed")]
pub struct SinkClosed;

/// A single ordered output edge.
///
/// `send` may block; that is the consumer's backpressure. Messages are
/// handed over in the order they were read and are not retained.
pub trait MessageSink: Send {
    fn send(&mut self, message: Message) -> Result<(), SinkClosed>;
}

impl MessageSink for Sender<Message> {
    fn send(&mut self, message: Message) -> Result<(), SinkClosed> {
        Sender::send(self, message).map_err(|_| SinkClosed)
    }
}

/// Blocks while the channel is full.
impl MessageSink for SyncSender<Message> {
    fn send(&mut self, message: Message) -> Result<(), SinkClosed> {
        SyncSender::send(self, message).map_err(|_| SinkClosed)
    }
}

impl<S: MessageSink + ?Sized> MessageSink for Box<S> {
    fn send(&mut self, message: Message) -> Result<(), SinkClosed> {
        (**self).send(message)
    }
}

/// Adapts a closure into a [`MessageSink`].
pub struct FnSink<F>(F);

/// Build a sink from a closure.
pub fn sink_fn<F>(f: F) -> FnSink<F>
where
    F: FnMut(Message) -> Result<(), SinkClosed> + Send,
{
    FnSink(f)
}

impl<F> MessageSink for FnSink<F>
where
    F: FnMut(Message) -> Result<(), SinkClosed> + Send,
{
    fn send(&mut self, message: Message) -> Result<(), SinkClosed> {
        (self.0)(message)
    }
}
