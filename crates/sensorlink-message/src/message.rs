use bytes::Bytes;

use crate::encoded_frame::EncodedFrame;
use crate::group::MessageGroup;
use crate::header::{MessageHeader, Timestamp};
use crate::img_frame::ImgFrame;
use crate::imu::ImuData;
use crate::kind::DatatypeKind;
use crate::tracklets::Tracklets;

/// Capabilities shared by every concrete message type.
pub trait DeviceMessage {
    /// Footer discriminant this type is sent with.
    const KIND: DatatypeKind;

    fn header(&self) -> &MessageHeader;

    fn header_mut(&mut self) -> &mut MessageHeader;

    fn sequence_num(&self) -> i64 {
        self.header().sequence_num
    }

    fn timestamp(&self) -> Timestamp {
        self.header().ts
    }

    fn timestamp_device(&self) -> Timestamp {
        self.header().ts_device
    }
}

/// Opaque bytes with a header and no further structure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Buffer {
    pub header: MessageHeader,
    pub data: Bytes,
}

impl Buffer {
    pub fn new(data: Bytes) -> Self {
        Self {
            header: MessageHeader::default(),
            data,
        }
    }
}

impl DeviceMessage for Buffer {
    const KIND: DatatypeKind = DatatypeKind::Buffer;

    fn header(&self) -> &MessageHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut MessageHeader {
        &mut self.header
    }
}

/// Any message a device can send.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Buffer(Buffer),
    ImgFrame(ImgFrame),
    EncodedFrame(EncodedFrame),
    Tracklets(Tracklets),
    ImuData(ImuData),
    Group(MessageGroup),
}

impl Message {
    pub fn kind(&self) -> DatatypeKind {
        match self {
            Message::Buffer(_) => Buffer::KIND,
            Message::ImgFrame(_) => ImgFrame::KIND,
            Message::EncodedFrame(_) => EncodedFrame::KIND,
            Message::Tracklets(_) => Tracklets::KIND,
            Message::ImuData(_) => ImuData::KIND,
            Message::Group(_) => MessageGroup::KIND,
        }
    }

    pub fn header(&self) -> &MessageHeader {
        match self {
            Message::Buffer(m) => m.header(),
            Message::ImgFrame(m) => m.header(),
            Message::EncodedFrame(m) => m.header(),
            Message::Tracklets(m) => m.header(),
            Message::ImuData(m) => m.header(),
            Message::Group(m) => m.header(),
        }
    }

    pub fn header_mut(&mut self) -> &mut MessageHeader {
        match self {
            Message::Buffer(m) => m.header_mut(),
            Message::ImgFrame(m) => m.header_mut(),
            Message::EncodedFrame(m) => m.header_mut(),
            Message::Tracklets(m) => m.header_mut(),
            Message::ImuData(m) => m.header_mut(),
            Message::Group(m) => m.header_mut(),
        }
    }

    pub fn sequence_num(&self) -> i64 {
        self.header().sequence_num
    }

    pub fn timestamp(&self) -> Timestamp {
        self.header().ts
    }

    pub fn timestamp_device(&self) -> Timestamp {
        self.header().ts_device
    }

    /// Payload bytes carried by buffer-derived messages.
    pub fn data(&self) -> Option<&Bytes> {
        match self {
            Message::Buffer(m) => Some(&m.data),
            Message::ImgFrame(m) => Some(&m.data),
            Message::EncodedFrame(m) => Some(&m.data),
            _ => None,
        }
    }

    pub fn as_img_frame(&self) -> Option<&ImgFrame> {
        match self {
            Message::ImgFrame(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&MessageGroup> {
        match self {
            Message::Group(m) => Some(m),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Message {
                fn from(m: $ty) -> Self {
                    Message::$variant(m)
                }
            }
        )*
    };
}

impl_from!(
    Buffer(Buffer),
    ImgFrame(ImgFrame),
    EncodedFrame(EncodedFrame),
    Tracklets(Tracklets),
    ImuData(ImuData),
    Group(MessageGroup),
);
