use std::fmt;

/// Message-type discriminant carried in every frame footer.
///
/// Values are fixed by the device firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DatatypeKind {
    Buffer = 0,
    ImgFrame = 1,
    EncodedFrame = 2,
    Tracklets = 14,
    ImuData = 15,
    MessageGroup = 22,
}

impl DatatypeKind {
    /// Wire value of this kind.
    pub fn discriminant(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            DatatypeKind::Buffer => "Buffer",
            DatatypeKind::ImgFrame => "ImgFrame",
            DatatypeKind::EncodedFrame => "EncodedFrame",
            DatatypeKind::Tracklets => "Tracklets",
            DatatypeKind::ImuData => "ImuData",
            DatatypeKind::MessageGroup => "MessageGroup",
        }
    }
}

impl TryFrom<u32> for DatatypeKind {
    type Error = u32;

    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(DatatypeKind::Buffer),
            1 => Ok(DatatypeKind::ImgFrame),
            2 => Ok(DatatypeKind::EncodedFrame),
            14 => Ok(DatatypeKind::Tracklets),
            15 => Ok(DatatypeKind::ImuData),
            22 => Ok(DatatypeKind::MessageGroup),
            other => Err(other),
        }
    }
}

impl fmt::Display for DatatypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminants_map_both_ways() {
        for kind in [
            DatatypeKind::Buffer,
            DatatypeKind::ImgFrame,
            DatatypeKind::EncodedFrame,
            DatatypeKind::Tracklets,
            DatatypeKind::ImuData,
            DatatypeKind::MessageGroup,
        ] {
            assert_eq!(DatatypeKind::try_from(kind.discriminant()), Ok(kind));
        }
    }

    #[test]
    fn unknown_values_are_rejected() {
        for raw in [3u32, 13, 21, 23, u32::MAX] {
            assert_eq!(DatatypeKind::try_from(raw), Err(raw));
        }
    }
}
