use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A point on a monotonic clock, as seconds plus nanoseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp {
    pub sec: u64,
    pub nsec: u32,
}

impl Timestamp {
    pub fn new(sec: u64, nsec: u32) -> Self {
        Self { sec, nsec }
    }

    pub fn from_duration(since_epoch: Duration) -> Self {
        Self {
            sec: since_epoch.as_secs(),
            nsec: since_epoch.subsec_nanos(),
        }
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.sec).saturating_add(Duration::from_nanos(u64::from(self.nsec)))
    }
}

/// Fields every device message carries.
///
/// `ts` is the capture time translated to the host clock, for wall-clock
/// correlation. `ts_device` is the raw device-monotonic time, for measuring
/// intervals without host-sync jitter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    pub sequence_num: i64,
    pub ts: Timestamp,
    pub ts_device: Timestamp,
}

impl MessageHeader {
    pub fn new(sequence_num: i64, ts: Timestamp, ts_device: Timestamp) -> Self {
        Self {
            sequence_num,
            ts,
            ts_device,
        }
    }
}
