//! Inertial measurement unit samples.

use serde::{Deserialize, Serialize};

use crate::header::{MessageHeader, Timestamp};
use crate::kind::DatatypeKind;
use crate::message::DeviceMessage;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImuAccuracy {
    #[default]
    Unreliable,
    Low,
    Medium,
    High,
}

/// Timing and quality shared by every IMU report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImuReport {
    pub sequence: i32,
    pub accuracy: ImuAccuracy,
    pub ts: Timestamp,
    pub ts_device: Timestamp,
}

/// A three-axis reading: m/s² for the accelerometer, rad/s for the
/// gyroscope, µT for the magnetometer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ImuVector {
    #[serde(flatten)]
    pub report: ImuReport,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Orientation as a unit quaternion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ImuQuaternion {
    #[serde(flatten)]
    pub report: ImuReport,
    pub i: f32,
    pub j: f32,
    pub k: f32,
    pub real: f32,
    /// Heading accuracy, radians.
    #[serde(default)]
    pub accuracy_rad: f32,
}

/// Readings the device sampled together. Sensors that were not enabled are absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImuPacket {
    pub accelerometer: Option<ImuVector>,
    pub gyroscope: Option<ImuVector>,
    pub magnetometer: Option<ImuVector>,
    pub rotation_vector: Option<ImuQuaternion>,
}

impl ImuPacket {
    pub fn is_empty(&self) -> bool {
        self.accelerometer.is_none()
            && self.gyroscope.is_none()
            && self.magnetometer.is_none()
            && self.rotation_vector.is_none()
    }
}

/// A batch of IMU packets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImuData {
    pub header: MessageHeader,
    pub packets: Vec<ImuPacket>,
}

impl ImuData {
    pub fn new(header: MessageHeader, packets: Vec<ImuPacket>) -> Self {
        Self { header, packets }
    }
}

impl DeviceMessage for ImuData {
    const KIND: DatatypeKind = DatatypeKind::ImuData;

    fn header(&self) -> &MessageHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut MessageHeader {
        &mut self.header
    }
}
