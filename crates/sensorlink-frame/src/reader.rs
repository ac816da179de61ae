use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use sensorlink_transport::{LinkStream, TransportError};
use tracing::trace;

use crate::codec::{decode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::source::FrameSource;

const INITIAL_BUFFER_CAPACITY: usize = 64 * 1024;
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Reads complete frames from any `Read` byte stream.
///
/// Partial reads are handled internally. A reader can be bound to one link
/// stream id, in which case packets for other streams are skipped.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
    stream: Option<u16>,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            stream: None,
        }
    }

    /// Only yield frames for `stream`; other streams are dropped.
    pub fn bind_stream(mut self, stream: u16) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` at EOF.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            while let Some(frame) = decode_frame(&mut self.buf, self.config.max_payload_size)? {
                match self.stream {
                    Some(bound) if bound != frame.stream => {
                        trace!(
                            stream = frame.stream,
                            bound,
                            size = frame.payload.len(),
                            "skipping frame for unbound stream"
                        );
                    }
                    _ => return Ok(frame),
                }
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<LinkStream> {
    /// Create a reader over a device link and apply the configured read timeout.
    pub fn with_config_link(inner: LinkStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

impl FrameSource for FrameReader<LinkStream> {
    fn read_frame(&mut self) -> Result<Frame> {
        FrameReader::read_frame(self)
    }

    /// Drop buffered bytes and shut the link down; the peer sees EOF.
    fn close(&mut self) {
        self.buf.clear();
        if let Err(err) = self.inner.shutdown() {
            trace!(error = %err, "link shutdown on close failed");
        }
    }
}

pub(crate) fn transport_to_frame_error(err: TransportError) -> FrameError {
    match err {
        TransportError::Io(io) | TransportError::Accept(io) => FrameError::Io(io),
        TransportError::Bind { source, .. } | TransportError::Connect { source, .. } => {
            FrameError::Io(source)
        }
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::{BufMut, BytesMut};

    use super::*;
    use crate::codec::{encode_frame, MAGIC};

    fn wire(frames: &[(u16, &[u8])]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for (stream, payload) in frames {
            encode_frame(*stream, payload, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    #[test]
    fn reads_frames_in_order() {
        let bytes = wire(&[(0, b"one"), (0, b"two"), (0, b"three")]);
        let mut reader = FrameReader::new(Cursor::new(bytes));

        for expected in [b"one".as_ref(), b"two", b"three"] {
            assert_eq!(reader.read_frame().unwrap().payload.as_ref(), expected);
        }
        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn bound_reader_skips_other_streams() {
        let bytes = wire(&[(1, b"a"), (2, b"skip"), (1, b"b"), (3, b"skip")]);
        let mut reader = FrameReader::new(Cursor::new(bytes)).bind_stream(1);

        assert_eq!(reader.read_frame().unwrap().payload.as_ref(), b"a");
        assert_eq!(reader.read_frame().unwrap().payload.as_ref(), b"b");
        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn large_payload_across_many_reads() {
        let payload = vec![0xAB; 300 * 1024];
        let bytes = wire(&[(9, &payload)]);

        let mut reader = FrameReader::new(Cursor::new(bytes));
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.stream, 9);
        assert_eq!(frame.payload.len(), payload.len());
    }

    #[test]
    fn byte_by_byte_stream() {
        let bytes = wire(&[(4, b"slow")]);
        let mut reader = FrameReader::new(ByteByByte { bytes, pos: 0 });

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.payload.as_ref(), b"slow");
    }

    #[test]
    fn eof_mid_packet_is_connection_closed() {
        let mut partial = BytesMut::new();
        partial.put_slice(&MAGIC);
        partial.put_u32_le(16);
        partial.put_u16_le(0);
        partial.put_slice(b"only-part");

        let mut reader = FrameReader::new(Cursor::new(partial.to_vec()));
        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn oversized_packet_is_rejected() {
        let mut bytes = BytesMut::new();
        bytes.put_slice(&MAGIC);
        bytes.put_u32_le(1024);
        bytes.put_u16_le(0);

        let cfg = FrameConfig {
            max_payload_size: 16,
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config(Cursor::new(bytes.to_vec()), cfg);
        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn interrupted_read_retries() {
        let bytes = wire(&[(8, b"ok")]);
        let mut reader = FrameReader::new(InterruptedOnce {
            interrupted: false,
            inner: Cursor::new(bytes),
        });

        assert_eq!(reader.read_frame().unwrap().payload.as_ref(), b"ok");
    }

    #[test]
    #[cfg(unix)]
    fn close_through_frame_source_shuts_the_link() {
        let (mut device, host) = std::os::unix::net::UnixStream::pair().unwrap();
        std::io::Write::write_all(&mut device, &wire(&[(0, b"via-trait")])).unwrap();
        let mut source: Box<dyn FrameSource> =
            Box::new(FrameReader::new(LinkStream::from_unix(host)));

        assert_eq!(source.read_frame().unwrap().payload.as_ref(), b"via-trait");
        source.close();

        let mut rest = Vec::new();
        assert_eq!(device.read_to_end(&mut rest).unwrap(), 0);
        assert!(matches!(
            source.read_frame(),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    #[cfg(unix)]
    fn link_stream_reader_over_pair() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(LinkStream::from_unix(left));
        let mut reader =
            FrameReader::with_config_link(LinkStream::from_unix(right), FrameConfig::default())
                .unwrap();

        writer.send(0, b"ping").unwrap();
        drop(writer);

        assert_eq!(reader.read_frame().unwrap().payload.as_ref(), b"ping");
        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::ConnectionClosed)
        ));
    }

    struct ByteByByte {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByte {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedOnce {
        interrupted: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl Read for InterruptedOnce {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }
}
