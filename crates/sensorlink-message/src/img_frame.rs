//! Raw image frames.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::{Point2f, Rect};
use crate::header::MessageHeader;
use crate::kind::DatatypeKind;
use crate::message::DeviceMessage;
use crate::transform::ImgTransformations;

/// Pixel layout of an [`ImgFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImgType {
    /// Planar Y, U, V with 2x2 chroma subsampling.
    Yuv420p,
    /// Y plane plus interleaved UV plane, 2x2 subsampling.
    Nv12,
    Rgb888p,
    Bgr888p,
    Rgb888i,
    Bgr888i,
    Gray8,
    Raw8,
    Raw16,
}

impl ImgType {
    pub fn plane_count(self) -> usize {
        match self {
            ImgType::Yuv420p | ImgType::Rgb888p | ImgType::Bgr888p => 3,
            ImgType::Nv12 => 2,
            ImgType::Rgb888i | ImgType::Bgr888i | ImgType::Gray8 | ImgType::Raw8 | ImgType::Raw16 => {
                1
            }
        }
    }

    /// Smallest valid stride of `plane` for an image `width` pixels wide.
    pub fn min_stride(self, plane: usize, width: u32) -> u64 {
        let width = u64::from(width);
        match (self, plane) {
            (ImgType::Yuv420p, 1 | 2) => width.div_ceil(2),
            (ImgType::Nv12, 1) => width.div_ceil(2) * 2,
            (ImgType::Rgb888i | ImgType::Bgr888i, _) => width * 3,
            (ImgType::Raw16, _) => width * 2,
            _ => width,
        }
    }

    /// Number of rows in `plane` for an image `height` pixels tall.
    pub fn plane_rows(self, plane: usize, height: u32) -> u64 {
        let height = u64::from(height);
        match (self, plane) {
            (ImgType::Yuv420p, 1 | 2) | (ImgType::Nv12, 1) => height.div_ceil(2),
            _ => height,
        }
    }
}

/// Sensor state when the frame was captured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub exposure_time_us: u32,
    pub sensitivity_iso: u32,
    pub lens_position: u32,
    pub wb_color_temp_k: u32,
    pub sensor_temperature_c: f32,
    pub aux_temperature_c: f32,
}

/// Everything about an [`ImgFrame`] except its pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImgFrameMeta {
    /// Camera socket the frame came from.
    pub instance_num: u32,
    #[serde(default)]
    pub category: u32,
    pub width: u32,
    pub height: u32,
    pub img_type: ImgType,
    /// Stride of the first plane, bytes.
    pub stride: u32,
    /// Strides of the remaining planes. Missing entries take the minimum stride.
    #[serde(default)]
    pub plane_strides: Vec<u32>,
    /// Byte offset of every plane. Empty means planes are packed back to back.
    #[serde(default)]
    pub plane_offsets: Vec<u32>,
    #[serde(default)]
    pub camera: CameraSettings,
    #[serde(default)]
    pub transformations: ImgTransformations,
}

impl ImgFrameMeta {
    /// Tightly packed layout with an identity transformation chain.
    pub fn packed(width: u32, height: u32, img_type: ImgType) -> Self {
        let stride = u32::try_from(img_type.min_stride(0, width)).unwrap_or(u32::MAX);
        Self {
            instance_num: 0,
            category: 0,
            width,
            height,
            img_type,
            stride,
            plane_strides: Vec::new(),
            plane_offsets: Vec::new(),
            camera: CameraSettings::default(),
            transformations: ImgTransformations::new(width, height),
        }
    }

    pub fn plane_stride(&self, plane: usize) -> Option<u64> {
        if plane >= self.img_type.plane_count() {
            return None;
        }
        if plane == 0 {
            return Some(u64::from(self.stride));
        }
        Some(match self.plane_strides.get(plane - 1) {
            Some(&stride) => u64::from(stride),
            None => self.img_type.min_stride(plane, self.width),
        })
    }

    pub fn plane_offset(&self, plane: usize) -> Option<u64> {
        if plane >= self.img_type.plane_count() {
            return None;
        }
        if let Some(&offset) = self.plane_offsets.get(plane) {
            return Some(u64::from(offset));
        }
        (0..plane).try_fold(0u64, |acc, p| acc.checked_add(self.plane_size(p)?))
    }

    /// Byte length of `plane` including row padding.
    pub fn plane_size(&self, plane: usize) -> Option<u64> {
        self.plane_stride(plane)?
            .checked_mul(self.img_type.plane_rows(plane, self.height))
    }

    /// Payload bytes needed to hold every plane.
    pub fn required_len(&self) -> Option<u64> {
        (0..self.img_type.plane_count()).try_fold(0u64, |end, plane| {
            let plane_end = self.plane_offset(plane)?.checked_add(self.plane_size(plane)?)?;
            Some(end.max(plane_end))
        })
    }

    /// Check the declared layout against a payload of `data_len` bytes.
    pub(crate) fn check_layout(&self, data_len: usize) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!("empty image {}x{}", self.width, self.height));
        }
        let planes = self.img_type.plane_count();
        if !self.plane_offsets.is_empty() && self.plane_offsets.len() != planes {
            return Err(format!(
                "{} plane offsets for {planes}-plane {:?}",
                self.plane_offsets.len(),
                self.img_type
            ));
        }
        for plane in 0..planes {
            let stride = self.plane_stride(plane).unwrap_or(0);
            let min = self.img_type.min_stride(plane, self.width);
            if stride < min {
                return Err(format!("plane {plane} stride {stride} below minimum {min}"));
            }
        }
        match self.required_len() {
            Some(needed) if needed <= data_len as u64 => Ok(()),
            Some(needed) => Err(format!(
                "{}x{} {:?} needs {needed} bytes, payload has {data_len}",
                self.width, self.height, self.img_type
            )),
            None => Err("plane layout overflows".to_string()),
        }
    }
}

/// An uncompressed image produced by a camera node.
#[derive(Debug, Clone, PartialEq)]
pub struct ImgFrame {
    pub header: MessageHeader,
    pub meta: ImgFrameMeta,
    pub data: Bytes,
}

impl ImgFrame {
    pub fn new(header: MessageHeader, meta: ImgFrameMeta, data: Bytes) -> Self {
        Self { header, meta, data }
    }

    pub fn width(&self) -> u32 {
        self.meta.width
    }

    pub fn height(&self) -> u32 {
        self.meta.height
    }

    pub fn img_type(&self) -> ImgType {
        self.meta.img_type
    }

    pub fn plane_stride(&self, plane: usize) -> Option<u64> {
        self.meta.plane_stride(plane)
    }

    /// Bytes of `plane`, or `None` if the plane does not exist or lies outside the payload.
    pub fn plane(&self, plane: usize) -> Option<&[u8]> {
        let start = usize::try_from(self.meta.plane_offset(plane)?).ok()?;
        let len = usize::try_from(self.meta.plane_size(plane)?).ok()?;
        self.data.get(start..start.checked_add(len)?)
    }

    /// Copy header and metadata from `source`, keeping this frame's pixels.
    pub fn set_metadata(&mut self, source: &ImgFrame) -> &mut Self {
        self.header = source.header.clone();
        self.meta = source.meta.clone();
        self
    }

    /// True if the transformation chain ends at this frame's width and height.
    pub fn validate_transformations(&self) -> bool {
        match self
            .meta
            .transformations
            .validate(self.meta.width, self.meta.height)
        {
            Ok(()) => true,
            Err(reason) => {
                debug!(seq = self.header.sequence_num, %reason, "invalid transformations");
                false
            }
        }
    }

    pub fn transformations(&self) -> &ImgTransformations {
        &self.meta.transformations
    }

    pub fn remap_point_from_source(&self, point: Point2f) -> Point2f {
        self.meta.transformations.remap_point_from_source(point)
    }

    pub fn remap_point_to_source(&self, point: Point2f) -> Point2f {
        self.meta.transformations.remap_point_to_source(point)
    }

    pub fn remap_rect_from_source(&self, rect: &Rect) -> Rect {
        self.meta.transformations.remap_rect_from_source(rect)
    }

    pub fn remap_rect_to_source(&self, rect: &Rect) -> Rect {
        self.meta.transformations.remap_rect_to_source(rect)
    }

    /// Map a point in `from` to the matching point in `to`.
    ///
    /// Both frames must derive from the same source frame.
    pub fn remap_point_between_frames(point: Point2f, from: &ImgFrame, to: &ImgFrame) -> Point2f {
        to.remap_point_from_source(from.remap_point_to_source(point))
    }

    pub fn remap_rect_between_frames(rect: &Rect, from: &ImgFrame, to: &ImgFrame) -> Rect {
        to.remap_rect_from_source(&from.remap_rect_to_source(rect))
    }

    pub fn source_hfov_deg(&self) -> f32 {
        self.meta.transformations.source_hfov_deg
    }

    pub fn source_vfov_deg(&self) -> f32 {
        self.meta.transformations.source_vfov_deg()
    }

    pub fn source_dfov_deg(&self) -> f32 {
        self.meta.transformations.source_dfov_deg()
    }
}

impl DeviceMessage for ImgFrame {
    const KIND: DatatypeKind = DatatypeKind::ImgFrame;

    fn header(&self) -> &MessageHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut MessageHeader {
        &mut self.header
    }
}
