//! Frame ⇄ message conversion.

use std::collections::HashSet;
use std::io;

use bytes::{BufMut, Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sensorlink_frame::{decode_footer, encode_footer, Frame, FrameError, FrameSource};
use tracing::{debug, trace};

use crate::encoded_frame::{EncodedFrame, EncodedFrameMeta};
use crate::error::{EncodeError, ParseError, Result};
use crate::group::MessageGroup;
use crate::header::MessageHeader;
use crate::img_frame::{ImgFrame, ImgFrameMeta};
use crate::imu::{ImuData, ImuPacket};
use crate::kind::DatatypeKind;
use crate::message::{Buffer, Message};
use crate::tracklets::{Tracklet, Tracklets};

/// Deepest group nesting accepted. A group at this depth is rejected and its
/// member frames, nested groups included, are skipped without being parsed.
pub const MAX_GROUP_DEPTH: usize = 8;

/// Nesting at which skipping gives up and the link is treated as failed.
const MAX_SKIP_DEPTH: usize = 64;

/// Size of the trailing metadata length field.
const META_LEN_SIZE: usize = 4;

#[derive(Deserialize)]
struct Envelope<M> {
    header: MessageHeader,
    meta: M,
}

#[derive(Serialize)]
struct EnvelopeRef<'a, M> {
    header: &'a MessageHeader,
    meta: &'a M,
}

#[derive(Serialize, Deserialize)]
struct NoMeta {}

#[derive(Serialize, Deserialize)]
struct GroupMeta {
    slots: Vec<String>,
}

/// Parse one frame into a message.
///
/// For a message group, the member frames are read from `source`, one per
/// declared slot, and parsed in turn. A group is returned whole or not at
/// all: if a member fails to parse, the remaining members are still read so
/// the next frame on the link is the one after the group, and the first
/// failure is returned. A failure reading from `source` is returned as soon
/// as it happens and [`ParseError::is_transport`] reports it.
pub fn parse_message<S: FrameSource + ?Sized>(frame: Frame, source: &mut S) -> Result<Message> {
    parse_at_depth(frame, source, 0)
}

fn parse_at_depth<S: FrameSource + ?Sized>(
    frame: Frame,
    source: &mut S,
    depth: usize,
) -> Result<Message> {
    let view = decode_footer(&frame).map_err(|err| match err {
        FrameError::MalformedFrame { len, min } => ParseError::MalformedFrame { len, min },
        other => ParseError::Transport(other),
    })?;
    let kind = DatatypeKind::try_from(view.discriminant).map_err(ParseError::UnknownKind)?;
    let (data, meta) = split_payload(kind, &view.payload)?;

    let message = match kind {
        DatatypeKind::Buffer => {
            let env: Envelope<NoMeta> = decode_meta(kind, &meta)?;
            Message::Buffer(Buffer {
                header: env.header,
                data,
            })
        }
        DatatypeKind::ImgFrame => {
            let env: Envelope<ImgFrameMeta> = decode_meta(kind, &meta)?;
            env.meta
                .check_layout(data.len())
                .map_err(|reason| ParseError::corrupt(kind, reason))?;
            if !env.meta.transformations.is_unset() {
                env.meta
                    .transformations
                    .validate(env.meta.width, env.meta.height)
                    .map_err(|reason| ParseError::corrupt(kind, reason))?;
            }
            Message::ImgFrame(ImgFrame::new(env.header, env.meta, data))
        }
        DatatypeKind::EncodedFrame => {
            let env: Envelope<EncodedFrameMeta> = decode_meta(kind, &meta)?;
            env.meta
                .check_layout(data.len())
                .map_err(|reason| ParseError::corrupt(kind, reason))?;
            Message::EncodedFrame(EncodedFrame {
                header: env.header,
                meta: env.meta,
                data,
            })
        }
        DatatypeKind::Tracklets => {
            expect_no_data(kind, &data)?;
            let env: Envelope<Vec<Tracklet>> = decode_meta(kind, &meta)?;
            Message::Tracklets(Tracklets::new(env.header, env.meta))
        }
        DatatypeKind::ImuData => {
            expect_no_data(kind, &data)?;
            let env: Envelope<Vec<ImuPacket>> = decode_meta(kind, &meta)?;
            Message::ImuData(ImuData::new(env.header, env.meta))
        }
        DatatypeKind::MessageGroup => {
            expect_no_data(kind, &data)?;
            let env: Envelope<GroupMeta> = decode_meta(kind, &meta)?;
            parse_group(env, source, depth)?
        }
    };
    Ok(message)
}

fn parse_group<S: FrameSource + ?Sized>(
    env: Envelope<GroupMeta>,
    source: &mut S,
    depth: usize,
) -> Result<Message> {
    let slots = env.meta.slots;
    let kind = DatatypeKind::MessageGroup;

    if depth >= MAX_GROUP_DEPTH {
        skip_members(slots.len(), source, depth)?;
        return Err(ParseError::corrupt(
            kind,
            format!("nested deeper than {MAX_GROUP_DEPTH} levels"),
        ));
    }

    // Bad slot names still leave the member frames on the link; they are
    // read below and the group is rejected afterwards.
    let mut failure = {
        let mut seen = HashSet::with_capacity(slots.len());
        slots.iter().find_map(|slot| {
            if slot.is_empty() {
                Some(ParseError::corrupt(kind, "empty slot name"))
            } else if !seen.insert(slot.as_str()) {
                Some(ParseError::corrupt(kind, format!("duplicate slot '{slot}'")))
            } else {
                None
            }
        })
    };

    let mut members = Vec::with_capacity(slots.len());
    for slot in slots {
        trace!(slot = %slot, depth, "reading group member");
        let result = source
            .read_frame()
            .map_err(ParseError::Transport)
            .and_then(|frame| parse_at_depth(frame, source, depth + 1));

        match result {
            Ok(message) => members.push((slot, message)),
            Err(err) => {
                let err = ParseError::GroupMember {
                    slot,
                    source: Box::new(err),
                };
                if err.is_transport() {
                    return Err(err);
                }
                match failure {
                    None => failure = Some(err),
                    Some(_) => debug!(error = %err, "further group member failure"),
                }
            }
        }
    }

    match failure {
        Some(err) => Err(err),
        None => Ok(Message::Group(MessageGroup::from_members(
            env.header, members,
        ))),
    }
}

/// Read and discard `count` member frames, descending into nested groups so
/// the next frame on the link follows the outermost group.
fn skip_members<S: FrameSource + ?Sized>(count: usize, source: &mut S, depth: usize) -> Result<()> {
    if depth >= MAX_SKIP_DEPTH {
        return Err(ParseError::Transport(FrameError::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("group nesting beyond {MAX_SKIP_DEPTH} levels, link out of step"),
        ))));
    }
    for _ in 0..count {
        let frame = source.read_frame().map_err(ParseError::Transport)?;
        if let Some(nested) = group_slot_count(&frame) {
            skip_members(nested, source, depth + 1)?;
        }
    }
    Ok(())
}

/// Number of declared slots if `frame` is a well-formed group header.
fn group_slot_count(frame: &Frame) -> Option<usize> {
    let kind = DatatypeKind::MessageGroup;
    let view = decode_footer(frame).ok()?;
    if DatatypeKind::try_from(view.discriminant).ok()? != kind {
        return None;
    }
    let (_, meta) = split_payload(kind, &view.payload).ok()?;
    let env: Envelope<GroupMeta> = decode_meta(kind, &meta).ok()?;
    Some(env.meta.slots.len())
}

/// Split a payload into data and metadata bytes.
fn split_payload(kind: DatatypeKind, payload: &Bytes) -> Result<(Bytes, Bytes)> {
    let meta_end = payload.len().checked_sub(META_LEN_SIZE).ok_or_else(|| {
        ParseError::corrupt(
            kind,
            format!("{} byte payload has no metadata length", payload.len()),
        )
    })?;

    let mut raw = [0u8; META_LEN_SIZE];
    raw.copy_from_slice(&payload[meta_end..]);
    let meta_len = u32::from_le_bytes(raw) as usize;

    let data_end = meta_end.checked_sub(meta_len).ok_or_else(|| {
        ParseError::corrupt(
            kind,
            format!("metadata length {meta_len} exceeds {meta_end} available bytes"),
        )
    })?;

    Ok((payload.slice(..data_end), payload.slice(data_end..meta_end)))
}

fn decode_meta<M: DeserializeOwned>(kind: DatatypeKind, meta: &[u8]) -> Result<Envelope<M>> {
    serde_json::from_slice(meta)
        .map_err(|err| ParseError::corrupt(kind, format!("invalid metadata: {err}")))
}

fn expect_no_data(kind: DatatypeKind, data: &Bytes) -> Result<()> {
    if data.is_empty() {
        Ok(())
    } else {
        Err(ParseError::corrupt(
            kind,
            format!("unexpected {} data bytes", data.len()),
        ))
    }
}

/// Encode a message into the frames a device would send for it.
///
/// Returns one frame, or for a group the primary frame followed by every
/// member's frames in slot order.
pub fn encode_message(message: &Message) -> std::result::Result<Vec<Bytes>, EncodeError> {
    let mut frames = Vec::new();
    encode_into(message, &mut frames)?;
    Ok(frames)
}

fn encode_into(message: &Message, out: &mut Vec<Bytes>) -> std::result::Result<(), EncodeError> {
    let kind = message.kind();
    let header = message.header();
    let frame = match message {
        Message::Buffer(m) => encode_one(kind, &m.data, header, &NoMeta {})?,
        Message::ImgFrame(m) => encode_one(kind, &m.data, header, &m.meta)?,
        Message::EncodedFrame(m) => encode_one(kind, &m.data, header, &m.meta)?,
        Message::Tracklets(m) => encode_one(kind, &[], header, &m.tracklets)?,
        Message::ImuData(m) => encode_one(kind, &[], header, &m.packets)?,
        Message::Group(group) => {
            let meta = GroupMeta {
                slots: group.names().map(str::to_owned).collect(),
            };
            out.push(encode_one(kind, &[], header, &meta)?);
            for (_, member) in group.iter() {
                encode_into(member, out)?;
            }
            return Ok(());
        }
    };
    out.push(frame);
    Ok(())
}

fn encode_one<M: Serialize>(
    kind: DatatypeKind,
    data: &[u8],
    header: &MessageHeader,
    meta: &M,
) -> std::result::Result<Bytes, EncodeError> {
    let meta = serde_json::to_vec(&EnvelopeRef { header, meta })?;
    let meta_len = u32::try_from(meta.len()).map_err(|_| EncodeError::MetadataTooLarge(meta.len()))?;

    let mut payload = BytesMut::with_capacity(data.len() + meta.len() + META_LEN_SIZE);
    payload.put_slice(data);
    payload.put_slice(&meta);
    payload.put_u32_le(meta_len);
    Ok(encode_footer(kind.discriminant(), &payload))
}
