//! Geometric history of an image: how the current frame was derived from the
//! sensor's source frame.
//!
//! Coordinates are continuous pixel coordinates; `(0, 0)` is the top-left
//! corner of the top-left pixel and `(w, h)` the bottom-right corner of the
//! image.

use serde::{Deserialize, Serialize};

use crate::geometry::{Point2f, Rect};

/// One step applied to an image on its way from the sensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ImgTransformation {
    /// Keep the `width` x `height` window at (`x`, `y`).
    Crop {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    /// Resize to `width` x `height`.
    Scale { width: u32, height: u32 },
    /// Add borders.
    Pad {
        top: u32,
        bottom: u32,
        left: u32,
        right: u32,
    },
    /// Mirror around the vertical and/or horizontal axis.
    Flip { horizontal: bool, vertical: bool },
}

impl ImgTransformation {
    fn output_size(&self, (w, h): (u32, u32)) -> Result<(u32, u32), String> {
        match *self {
            ImgTransformation::Crop {
                x,
                y,
                width,
                height,
            } => {
                let fits_x = x.checked_add(width).is_some_and(|end| end <= w);
                let fits_y = y.checked_add(height).is_some_and(|end| end <= h);
                if !fits_x || !fits_y {
                    return Err(format!(
                        "crop {width}x{height}+{x}+{y} exceeds {w}x{h} input"
                    ));
                }
                Ok((width, height))
            }
            ImgTransformation::Scale { width, height } => {
                if w == 0 || h == 0 || width == 0 || height == 0 {
                    return Err(format!("scale {w}x{h} -> {width}x{height} has a zero side"));
                }
                Ok((width, height))
            }
            ImgTransformation::Pad {
                top,
                bottom,
                left,
                right,
            } => {
                let width = w.checked_add(left).and_then(|v| v.checked_add(right));
                let height = h.checked_add(top).and_then(|v| v.checked_add(bottom));
                match (width, height) {
                    (Some(width), Some(height)) => Ok((width, height)),
                    _ => Err("padding overflows image size".to_string()),
                }
            }
            ImgTransformation::Flip { .. } => Ok((w, h)),
        }
    }

    /// Map a point from this step's input into its output.
    fn forward(&self, p: Point2f, (w, h): (u32, u32)) -> Point2f {
        match *self {
            ImgTransformation::Crop { x, y, .. } => Point2f::new(p.x - x as f32, p.y - y as f32),
            ImgTransformation::Scale { width, height } => {
                Point2f::new(p.x * ratio(width, w), p.y * ratio(height, h))
            }
            ImgTransformation::Pad { top, left, .. } => {
                Point2f::new(p.x + left as f32, p.y + top as f32)
            }
            ImgTransformation::Flip {
                horizontal,
                vertical,
            } => flip(p, (w, h), horizontal, vertical),
        }
    }

    /// Map a point from this step's output back into its input.
    fn inverse(&self, p: Point2f, (w, h): (u32, u32)) -> Point2f {
        match *self {
            ImgTransformation::Crop { x, y, .. } => Point2f::new(p.x + x as f32, p.y + y as f32),
            ImgTransformation::Scale { width, height } => {
                Point2f::new(p.x * ratio(w, width), p.y * ratio(h, height))
            }
            ImgTransformation::Pad { top, left, .. } => {
                Point2f::new(p.x - left as f32, p.y - top as f32)
            }
            ImgTransformation::Flip {
                horizontal,
                vertical,
            } => flip(p, (w, h), horizontal, vertical),
        }
    }
}

fn ratio(num: u32, den: u32) -> f32 {
    if den == 0 {
        1.0
    } else {
        num as f32 / den as f32
    }
}

fn flip(p: Point2f, (w, h): (u32, u32), horizontal: bool, vertical: bool) -> Point2f {
    Point2f::new(
        if horizontal { w as f32 - p.x } else { p.x },
        if vertical { h as f32 - p.y } else { p.y },
    )
}

/// The transformation chain from the sensor's source frame to the current frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImgTransformations {
    pub source_width: u32,
    pub source_height: u32,
    /// Horizontal field of view of the source frame, degrees. Zero if unknown.
    #[serde(default)]
    pub source_hfov_deg: f32,
    #[serde(default)]
    pub steps: Vec<ImgTransformation>,
}

impl ImgTransformations {
    /// Identity chain for a `width` x `height` source.
    pub fn new(source_width: u32, source_height: u32) -> Self {
        Self {
            source_width,
            source_height,
            source_hfov_deg: 0.0,
            steps: Vec::new(),
        }
    }

    pub fn push(&mut self, step: ImgTransformation) -> &mut Self {
        self.steps.push(step);
        self
    }

    pub fn with_step(mut self, step: ImgTransformation) -> Self {
        self.steps.push(step);
        self
    }

    /// True if the sender attached no chain at all.
    pub fn is_unset(&self) -> bool {
        self.source_width == 0 && self.source_height == 0 && self.steps.is_empty()
    }

    /// Size of the image after every step, or why the chain is inconsistent.
    pub fn output_size(&self) -> Result<(u32, u32), String> {
        self.steps
            .iter()
            .try_fold((self.source_width, self.source_height), |size, step| {
                step.output_size(size)
            })
    }

    /// Check the chain ends at `width` x `height`.
    pub fn validate(&self, width: u32, height: u32) -> Result<(), String> {
        let (out_w, out_h) = self.output_size()?;
        if (out_w, out_h) != (width, height) {
            return Err(format!(
                "transformations produce {out_w}x{out_h}, frame is {width}x{height}"
            ));
        }
        Ok(())
    }

    pub fn remap_point_from_source(&self, point: Point2f) -> Point2f {
        let mut size = (self.source_width, self.source_height);
        let mut p = point;
        for step in &self.steps {
            p = step.forward(p, size);
            size = step.output_size(size).unwrap_or(size);
        }
        p
    }

    pub fn remap_point_to_source(&self, point: Point2f) -> Point2f {
        let sizes = self.input_sizes();
        self.steps
            .iter()
            .zip(sizes)
            .rev()
            .fold(point, |p, (step, size)| step.inverse(p, size))
    }

    pub fn remap_rect_from_source(&self, rect: &Rect) -> Rect {
        Rect::from_corners(
            self.remap_point_from_source(rect.top_left()),
            self.remap_point_from_source(rect.bottom_right()),
        )
    }

    pub fn remap_rect_to_source(&self, rect: &Rect) -> Rect {
        Rect::from_corners(
            self.remap_point_to_source(rect.top_left()),
            self.remap_point_to_source(rect.bottom_right()),
        )
    }

    /// Vertical FOV of the source, degrees. Rectilinear lenses only.
    pub fn source_vfov_deg(&self) -> f32 {
        self.derived_fov(self.source_height as f32)
    }

    /// Diagonal FOV of the source, degrees. Rectilinear lenses only.
    pub fn source_dfov_deg(&self) -> f32 {
        let w = self.source_width as f32;
        let h = self.source_height as f32;
        self.derived_fov((w * w + h * h).sqrt())
    }

    fn derived_fov(&self, extent: f32) -> f32 {
        if self.source_width == 0 || self.source_hfov_deg <= 0.0 {
            return 0.0;
        }
        let half = (self.source_hfov_deg.to_radians() / 2.0).tan();
        (2.0 * (half * extent / self.source_width as f32).atan()).to_degrees()
    }

    fn input_sizes(&self) -> Vec<(u32, u32)> {
        let mut size = (self.source_width, self.source_height);
        self.steps
            .iter()
            .map(|step| {
                let input = size;
                size = step.output_size(size).unwrap_or(size);
                input
            })
            .collect()
    }
}
