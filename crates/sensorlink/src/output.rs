use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use sensorlink_host::LinkStats;
use sensorlink_message::{Message, Timestamp};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    kind: &'static str,
    seq: i64,
    ts: Timestamp,
    ts_device: Timestamp,
    size: usize,
    detail: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    members: Vec<MemberOutput<'a>>,
}

#[derive(Serialize)]
struct MemberOutput<'a> {
    slot: &'a str,
    kind: &'static str,
    seq: i64,
}

pub fn print_message(message: &Message, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                kind: message.kind().name(),
                seq: message.sequence_num(),
                ts: message.timestamp(),
                ts_device: message.timestamp_device(),
                size: data_len(message),
                detail: detail(message),
                members: members(message),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KIND", "SEQ", "TS", "SIZE", "DETAIL"])
                .add_row(vec![
                    message.kind().name().to_string(),
                    message.sequence_num().to_string(),
                    format_ts(message.timestamp()),
                    data_len(message).to_string(),
                    detail(message),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "kind={} seq={} ts={} ts_device={} size={} {}",
                message.kind(),
                message.sequence_num(),
                format_ts(message.timestamp()),
                format_ts(message.timestamp_device()),
                data_len(message),
                detail(message)
            );
        }
        OutputFormat::Raw => {
            if let Some(data) = message.data() {
                print_raw(data.as_ref());
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Session summary, on stderr so stdout stays one record per message.
pub fn print_stats(stats: &LinkStats) {
    eprintln!(
        "dispatched={} parse_errors={} reconnects={} sequence_regressions={}",
        stats.dispatched, stats.parse_errors, stats.reconnects, stats.sequence_regressions
    );
}

fn data_len(message: &Message) -> usize {
    message.data().map_or(0, |data| data.len())
}

fn format_ts(ts: Timestamp) -> String {
    format!("{}.{:09}", ts.sec, ts.nsec)
}

fn detail(message: &Message) -> String {
    match message {
        Message::Buffer(_) => String::new(),
        Message::ImgFrame(img) => format!(
            "{}x{} {:?} instance={}",
            img.width(),
            img.height(),
            img.img_type(),
            img.meta.instance_num
        ),
        Message::EncodedFrame(enc) => format!(
            "{:?} {:?} {}x{} bitstream={}",
            enc.profile(),
            enc.frame_type(),
            enc.meta.width,
            enc.meta.height,
            enc.meta.frame_size
        ),
        Message::Tracklets(t) => format!("{} tracklets, {} active", t.len(), t.active().count()),
        Message::ImuData(imu) => format!("{} packets", imu.packets.len()),
        Message::Group(group) => {
            let slots: Vec<String> = group
                .iter()
                .map(|(slot, member)| format!("{slot}={}", member.kind()))
                .collect();
            slots.join(",")
        }
    }
}

fn members(message: &Message) -> Vec<MemberOutput<'_>> {
    match message.as_group() {
        Some(group) => group
            .iter()
            .map(|(slot, member)| MemberOutput {
                slot,
                kind: member.kind().name(),
                seq: member.sequence_num(),
            })
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use sensorlink_message::{Buffer, MessageGroup, MessageHeader};

    use super::*;

    #[test]
    fn group_detail_lists_slots_in_order() {
        let group = MessageGroup::new(MessageHeader::default())
            .with("right", Message::Buffer(Buffer::new(Bytes::from_static(b"r"))))
            .with("left", Message::Buffer(Buffer::new(Bytes::from_static(b"l"))));
        let message = Message::Group(group);
        assert_eq!(detail(&message), "right=Buffer,left=Buffer");
        let names: Vec<&str> = members(&message).iter().map(|m| m.slot).collect();
        assert_eq!(names, vec!["right", "left"]);
    }

    #[test]
    fn timestamps_are_zero_padded() {
        assert_eq!(format_ts(Timestamp::new(3, 5_000)), "3.000005000");
    }
}
