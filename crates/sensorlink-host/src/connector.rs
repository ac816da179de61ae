use std::io::Write;
use std::path::Path;

use sensorlink_frame::FrameWriter;
use sensorlink_message::{encode_message, Message};
use sensorlink_transport::{LinkListener, LinkStream};

use crate::config::LinkConfig;
use crate::error::Result;

/// Sends messages the way a device does: encoded into frames on one link stream.
pub struct MessageWriter<W> {
    writer: FrameWriter<W>,
    stream: u16,
    sent: u64,
}

impl<W: Write> MessageWriter<W> {
    pub fn new(writer: FrameWriter<W>, stream: u16) -> Self {
        Self {
            writer,
            stream,
            sent: 0,
        }
    }

    /// Encode and send one message. A group's frames go out back to back.
    pub fn send(&mut self, message: &Message) -> Result<()> {
        let frames = encode_message(message)?;
        self.writer.send_all(self.stream, &frames)?;
        self.sent += 1;
        Ok(())
    }

    /// Send an already encoded frame unchanged.
    pub fn send_raw(&mut self, frame: &[u8]) -> Result<()> {
        self.writer.send(self.stream, frame)?;
        Ok(())
    }

    /// Messages sent so far.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn stream(&self) -> u16 {
        self.stream
    }

    pub fn get_ref(&self) -> &W {
        self.writer.get_ref()
    }

    pub fn into_inner(self) -> FrameWriter<W> {
        self.writer
    }
}

/// Connect to a host endpoint as a device.
pub fn connect_device(path: impl AsRef<Path>, config: &LinkConfig) -> Result<MessageWriter<LinkStream>> {
    let stream = LinkListener::connect(path)?;
    let writer = FrameWriter::with_config_link(stream, config.frame_config())?;
    Ok(MessageWriter::new(writer, config.stream))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BytesMut;
    use sensorlink_frame::{decode_footer, decode_frame, DEFAULT_MAX_PAYLOAD};
    use sensorlink_message::{Buffer, DatatypeKind, MessageGroup};

    use super::*;

    #[test]
    fn group_frames_are_written_contiguously() {
        let group = MessageGroup::default()
            .with("a", Message::Buffer(Buffer::default()))
            .with("b", Message::Buffer(Buffer::default()));
        let mut writer = MessageWriter::new(FrameWriter::new(Cursor::new(Vec::new())), 3);
        writer.send(&Message::Group(group)).unwrap();
        assert_eq!(writer.sent(), 1);

        let mut wire = BytesMut::from(writer.into_inner().into_inner().into_inner().as_slice());
        let mut kinds = Vec::new();
        while let Some(frame) = decode_frame(&mut wire, DEFAULT_MAX_PAYLOAD).unwrap() {
            assert_eq!(frame.stream, 3);
            kinds.push(decode_footer(&frame).unwrap().discriminant);
        }
        assert_eq!(
            kinds,
            vec![
                DatatypeKind::MessageGroup.discriminant(),
                DatatypeKind::Buffer.discriminant(),
                DatatypeKind::Buffer.discriminant(),
            ]
        );
    }

    #[test]
    fn connect_to_missing_endpoint_fails() {
        let path = std::env::temp_dir().join(format!("slh-missing-{}.sock", std::process::id()));
        let err = connect_device(&path, &LinkConfig::default())
            .err()
            .expect("connect should fail");
        assert!(matches!(err, crate::error::HostError::Transport(_)));
    }
}
