use crate::header::MessageHeader;
use crate::kind::DatatypeKind;
use crate::message::{DeviceMessage, Message};

/// Named messages that travel and are delivered together.
///
/// Members keep the order the device declared them in. Slot names are
/// unique and non-empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageGroup {
    pub header: MessageHeader,
    members: Vec<(String, Message)>,
}

impl MessageGroup {
    pub fn new(header: MessageHeader) -> Self {
        Self {
            header,
            members: Vec::new(),
        }
    }

    /// Add or replace the message in `slot`. Replacing keeps the slot's position.
    ///
    /// Returns the previous occupant, if any. Empty names are rejected and
    /// handed back as `Err`.
    pub fn insert(
        &mut self,
        slot: impl Into<String>,
        message: Message,
    ) -> Result<Option<Message>, Message> {
        let slot = slot.into();
        if slot.is_empty() {
            return Err(message);
        }
        if let Some((_, existing)) = self.members.iter_mut().find(|(name, _)| *name == slot) {
            return Ok(Some(std::mem::replace(existing, message)));
        }
        self.members.push((slot, message));
        Ok(None)
    }

    pub fn with(mut self, slot: impl Into<String>, message: Message) -> Self {
        let _ = self.insert(slot, message);
        self
    }

    pub fn get(&self, slot: &str) -> Option<&Message> {
        self.members
            .iter()
            .find(|(name, _)| name == slot)
            .map(|(_, message)| message)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Message)> {
        self.members
            .iter()
            .map(|(name, message)| (name.as_str(), message))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn into_members(self) -> Vec<(String, Message)> {
        self.members
    }

    /// Build from already-validated members.
    pub(crate) fn from_members(header: MessageHeader, members: Vec<(String, Message)>) -> Self {
        Self { header, members }
    }
}

impl DeviceMessage for MessageGroup {
    const KIND: DatatypeKind = DatatypeKind::MessageGroup;

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
    use crate::message::Buffer;
    use bytes::Bytes;

    fn buf(seq: i64) -> Message {
        let mut b = Buffer::new(Bytes::new());
        b.header.sequence_num = seq;
        Message::Buffer(b)
    }

    #[test]
    fn insert_keeps_declared_order_and_replaces_in_place() {
        let mut group = MessageGroup::default().with("rgb", buf(1)).with("depth", buf(2));
        let previous = group.insert("rgb", buf(3)).unwrap();
        assert_eq!(previous.map(|m| m.sequence_num()), Some(1));
        assert_eq!(group.names().collect::<Vec<_>>(), vec!["rgb", "depth"]);
        assert_eq!(group.get("rgb").map(Message::sequence_num), Some(3));
        assert!(group.get("imu").is_none());
    }

    #[test]
    fn empty_slot_name_rejected() {
        let mut group = MessageGroup::default();
        assert!(group.insert("", buf(1)).is_err());
        assert!(group.is_empty());
    }
}
