//! Device link packetization and frame footers.
//!
//! Two layers live here:
//!
//! - The link packet codec. A device link is a byte stream, and every packet
//!   on it is framed with a 2-byte magic ("XL"), a 4-byte little-endian
//!   payload length and a 2-byte little-endian stream id. [`FrameReader`]
//!   turns a byte stream back into discrete [`Frame`]s.
//! - The frame footer. Every frame ends in a 16-byte footer whose first
//!   8 bytes carry the message-type discriminant. [`decode_footer`] recovers
//!   it without interpreting the payload.
//!
//! [`FrameSource`] is the contract the host runtime reads frames through.

pub mod codec;
pub mod error;
pub mod footer;
pub mod reader;
pub mod source;
pub mod writer;

pub use codec::{
    decode_frame, encode_frame, Frame, FrameConfig, DEFAULT_MAX_PAYLOAD, DEFAULT_STREAM,
    HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use footer::{decode_footer, encode_footer, FrameView, FOOTER_SIZE};
pub use reader::FrameReader;
pub use source::FrameSource;
pub use writer::FrameWriter;
