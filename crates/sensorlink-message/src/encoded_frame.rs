//! Compressed video and still frames.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::header::MessageHeader;
use crate::img_frame::CameraSettings;
use crate::kind::DatatypeKind;
use crate::message::DeviceMessage;
use crate::transform::ImgTransformations;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodedProfile {
    Jpeg,
    Avc,
    Hevc,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodedFrameType {
    I,
    P,
    B,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedFrameMeta {
    pub instance_num: u32,
    pub width: u32,
    pub height: u32,
    pub profile: EncodedProfile,
    #[serde(default)]
    pub frame_type: EncodedFrameType,
    /// Encoder quality, 0-100. Meaningful for JPEG.
    #[serde(default)]
    pub quality: u32,
    /// Target bitrate, bits per second. Meaningful for AVC/HEVC.
    #[serde(default)]
    pub bitrate: u32,
    #[serde(default)]
    pub lossless: bool,
    /// Start of the bitstream inside the payload.
    #[serde(default)]
    pub frame_offset: u32,
    /// Length of the bitstream.
    pub frame_size: u32,
    #[serde(default)]
    pub camera: CameraSettings,
    #[serde(default)]
    pub transformations: ImgTransformations,
}

impl EncodedFrameMeta {
    pub(crate) fn check_layout(&self, data_len: usize) -> Result<(), String> {
        let end = u64::from(self.frame_offset) + u64::from(self.frame_size);
        if end > data_len as u64 {
            return Err(format!(
                "bitstream {}+{} exceeds payload of {data_len} bytes",
                self.frame_offset, self.frame_size
            ));
        }
        if self.quality > 100 {
            return Err(format!("quality {} out of range", self.quality));
        }
        Ok(())
    }
}

/// A compressed frame produced by a video encoder node.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFrame {
    pub header: MessageHeader,
    pub meta: EncodedFrameMeta,
    pub data: Bytes,
}

impl EncodedFrame {
    /// Wrap a bitstream that fills the whole payload.
    pub fn new(header: MessageHeader, mut meta: EncodedFrameMeta, data: Bytes) -> Self {
        meta.frame_offset = 0;
        meta.frame_size = u32::try_from(data.len()).unwrap_or(u32::MAX);
        Self { header, meta, data }
    }

    pub fn profile(&self) -> EncodedProfile {
        self.meta.profile
    }

    pub fn frame_type(&self) -> EncodedFrameType {
        self.meta.frame_type
    }

    /// The encoded bitstream, without any padding around it.
    pub fn bitstream(&self) -> Bytes {
        let start = self.meta.frame_offset as usize;
        let end = start.saturating_add(self.meta.frame_size as usize);
        if end <= self.data.len() {
            self.data.slice(start..end)
        } else {
            Bytes::new()
        }
    }

    /// Copy header and metadata from `source`, keeping this frame's bitstream.
    pub fn set_metadata(&mut self, source: &EncodedFrame) -> &mut Self {
        let (offset, size) = (self.meta.frame_offset, self.meta.frame_size);
        self.header = source.header.clone();
        self.meta = source.meta.clone();
        self.meta.frame_offset = offset;
        self.meta.frame_size = size;
        self
    }
}

impl DeviceMessage for EncodedFrame {
    const KIND: DatatypeKind = DatatypeKind::EncodedFrame;

    fn header(&self) -> &MessageHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut MessageHeader {
        &mut self.header
    }
}
