//! Typed device messages and their frame codec.
//!
//! Every frame a device sends decodes to exactly one [`Message`]: a closed
//! union over the message kinds the host understands. The kind is decided
//! once, from the frame footer's discriminant, by [`parse_message`].
//! [`encode_message`] is the inverse and produces the frames a device would
//! send.
//!
//! Payload layout (ahead of the 16-byte footer):
//!
//! ```text
//! ┌──────────────┬──────────────────┬──────────────────────┐
//! │ data         │ metadata (JSON)  │ metadata length      │
//! │ (opaque)     │                  │ (4B LE)              │
//! └──────────────┴──────────────────┴──────────────────────┘
//! ```
//!
//! A message group is a primary frame naming its slots, followed by exactly
//! one frame per slot in declared order.

pub mod codec;
pub mod encoded_frame;
pub mod error;
pub mod geometry;
pub mod group;
pub mod header;
pub mod img_frame;
pub mod imu;
pub mod kind;
pub mod message;
pub mod tracklets;
pub mod transform;

pub use codec::{encode_message, parse_message, MAX_GROUP_DEPTH};
pub use encoded_frame::{EncodedFrame, EncodedFrameMeta, EncodedFrameType, EncodedProfile};
pub use error::{EncodeError, ParseError, Result};
pub use geometry::{Point2f, Rect};
pub use group::MessageGroup;
pub use header::{MessageHeader, Timestamp};
pub use img_frame::{CameraSettings, ImgFrame, ImgFrameMeta, ImgType};
pub use imu::{ImuAccuracy, ImuData, ImuPacket, ImuQuaternion, ImuReport, ImuVector};
pub use kind::DatatypeKind;
pub use message::{Buffer, DeviceMessage, Message};
pub use tracklets::{Tracklet, Tracklets, TrackingStatus};
pub use transform::{ImgTransformation, ImgTransformations};
