use sensorlink_frame::FrameError;

use crate::kind::DatatypeKind;

/// Errors raised while turning frames into messages.
///
/// [`MalformedFrame`](ParseError::MalformedFrame) and the corrupt-message
/// variants concern one message only; the link stays usable.
/// [`Transport`](ParseError::Transport) means the link itself failed while a
/// group was reading its member frames.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The frame is too short to carry a footer.
    #[error("malformed frame ({len} bytes, footer needs {min})")]
    MalformedFrame { len: usize, min: usize },

    /// The footer names a message type this host does not know.
    #[error("unknown message type discriminant {0}")]
    UnknownKind(u32),

    /// Known message type, inconsistent or truncated payload.
    #[error("corrupt {kind} message: {reason}")]
    Corrupt { kind: DatatypeKind, reason: String },

    /// A group member failed to parse; the whole group is dropped.
    #[error("group slot '{slot}' failed: {source}")]
    GroupMember {
        slot: String,
        #[source]
        source: Box<ParseError>,
    },

    /// The link failed while reading a group member frame.
    #[error("link failed while reading group member: {0}")]
    Transport(#[source] FrameError),
}

impl ParseError {
    pub(crate) fn corrupt(kind: DatatypeKind, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            kind,
            reason: reason.into(),
        }
    }

    /// True if the link failed, as opposed to one message being bad.
    pub fn is_transport(&self) -> bool {
        match self {
            ParseError::Transport(_) => true,
            ParseError::GroupMember { source, .. } => source.is_transport(),
            _ => false,
        }
    }

    /// The link failure behind this error, if there is one.
    pub fn into_transport(self) -> Option<FrameError> {
        match self {
            ParseError::Transport(err) => Some(err),
            ParseError::GroupMember { source, .. } => source.into_transport(),
            _ => None,
        }
    }

    /// True for the corrupt-message class: unknown type or bad payload.
    pub fn is_corrupt(&self) -> bool {
        match self {
            ParseError::UnknownKind(_) | ParseError::Corrupt { .. } => true,
            ParseError::GroupMember { source, .. } => source.is_corrupt(),
            _ => false,
        }
    }

    /// True if the frame could not even carry a footer.
    pub fn is_malformed(&self) -> bool {
        match self {
            ParseError::MalformedFrame { .. } => true,
            ParseError::GroupMember { source, .. } => source.is_malformed(),
            _ => false,
        }
    }
}

/// Errors raised while encoding a message into frames.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// Metadata could not be serialized.
    #[error("metadata serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Serialized metadata does not fit the 4-byte length field.
    #[error("metadata too large ({0} bytes)")]
    MetadataTooLarge(usize),
}

pub type Result<T> = std::result::Result<T, ParseError>;
