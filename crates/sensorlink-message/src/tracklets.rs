//! Object tracker output.

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;
use crate::header::MessageHeader;
use crate::kind::DatatypeKind;
use crate::message::DeviceMessage;

/// Lifecycle of a tracked object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingStatus {
    New,
    Tracked,
    Lost,
    Removed,
}

impl TrackingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TrackingStatus::New => "new",
            TrackingStatus::Tracked => "tracked",
            TrackingStatus::Lost => "lost",
            TrackingStatus::Removed => "removed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tracklet {
    pub id: i32,
    pub label: u32,
    /// Frames since the object was first seen.
    pub age: u32,
    pub status: TrackingStatus,
    /// Region in the tracker's input frame.
    pub roi: Rect,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tracklets {
    pub header: MessageHeader,
    pub tracklets: Vec<Tracklet>,
}

impl Tracklets {
    pub fn new(header: MessageHeader, tracklets: Vec<Tracklet>) -> Self {
        Self { header, tracklets }
    }

    pub fn len(&self) -> usize {
        self.tracklets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracklets.is_empty()
    }

    /// Tracklets that are still being followed (new or tracked).
    pub fn active(&self) -> impl Iterator<Item = &Tracklet> {
        self.tracklets
            .iter()
            .filter(|t| matches!(t.status, TrackingStatus::New | TrackingStatus::Tracked))
    }
}

impl DeviceMessage for Tracklets {
    const KIND: DatatypeKind = DatatypeKind::Tracklets;

    fn header(&self) -> &MessageHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut MessageHeader {
        &mut self.header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_uses_lowercase_names() {
        let json = serde_json::to_string(&TrackingStatus::Removed).unwrap();
        assert_eq!(json, "\"removed\"");
        let parsed: TrackingStatus = serde_json::from_str("\"lost\"").unwrap();
        assert_eq!(parsed, TrackingStatus::Lost);
        assert!(serde_json::from_str::<TrackingStatus>("\"gone\"").is_err());
    }

    #[test]
    fn active_filters_lost_and_removed() {
        let t = |id, status| Tracklet {
            id,
            label: 1,
            age: 3,
            status,
            roi: Rect::default(),
        };
        let msg = Tracklets::new(
            MessageHeader::default(),
            vec![
                t(1, TrackingStatus::New),
                t(2, TrackingStatus::Lost),
                t(3, TrackingStatus::Tracked),
                t(4, TrackingStatus::Removed),
            ],
        );
        let ids: Vec<i32> = msg.active().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(msg.len(), 4);
    }
}
