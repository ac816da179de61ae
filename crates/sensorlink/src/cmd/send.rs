use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use sensorlink_host::{connect_device, LinkConfig};
use sensorlink_message::{
    EncodedFrame, EncodedFrameMeta, EncodedFrameType, EncodedProfile, ImgFrame, ImgFrameMeta,
    ImgTransformation, ImgTransformations, ImgType, ImuAccuracy, ImuData, ImuPacket, ImuReport,
    ImuVector, Message, MessageGroup, MessageHeader, Rect, Timestamp, Tracklet, Tracklets,
    TrackingStatus,
};
use tracing::info;

use crate::cmd::{SendArgs, SendKind};
use crate::exit::{host_error, CliError, CliResult, SUCCESS, USAGE};

const IMG_WIDTH: u32 = 64;
const IMG_HEIGHT: u32 = 48;
/// Keyframe period of the emulated encoder.
const GOP_SIZE: i64 = 30;

pub fn run(args: SendArgs) -> CliResult<i32> {
    let interval = args.interval.as_deref().map(parse_duration).transpose()?;
    let config = LinkConfig {
        stream: args.stream,
        ..LinkConfig::default()
    };
    let mut writer =
        connect_device(&args.path, &config).map_err(|err| host_error("connect failed", err))?;

    let clock = DeviceClock::start();
    for i in 0..args.count {
        let seq = args
            .seq_start
            .saturating_add(i64::try_from(i).unwrap_or(i64::MAX));
        let sent = match args.kind {
            SendKind::Malformed => writer.send_raw(&[0u8; 10]),
            kind => writer.send(&synth_message(kind, clock.header(seq))),
        };
        sent.map_err(|err| host_error("send failed", err))?;

        if let Some(pause) = interval {
            if i + 1 < args.count {
                thread::sleep(pause);
            }
        }
    }

    info!(count = args.count, kind = ?args.kind, "messages sent");
    Ok(SUCCESS)
}

/// Stamps messages the way a device does: host wall clock plus device uptime.
struct DeviceClock {
    boot: Instant,
}

impl DeviceClock {
    fn start() -> Self {
        Self {
            boot: Instant::now(),
        }
    }

    fn header(&self, seq: i64) -> MessageHeader {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        MessageHeader::new(
            seq,
            Timestamp::from_duration(now),
            Timestamp::from_duration(self.boot.elapsed()),
        )
    }
}

fn synth_message(kind: SendKind, header: MessageHeader) -> Message {
    match kind {
        SendKind::Buffer | SendKind::Malformed => Message::Buffer(sensorlink_message::Buffer {
            data: Bytes::from(format!("buffer {}", header.sequence_num)),
            header,
        }),
        SendKind::Img => Message::ImgFrame(synth_img(header)),
        SendKind::Encoded => Message::EncodedFrame(synth_encoded(header)),
        SendKind::Imu => Message::ImuData(synth_imu(header)),
        SendKind::Tracklets => Message::Tracklets(synth_tracklets(header)),
        SendKind::Group => {
            let rgb = Message::ImgFrame(synth_img(header.clone()));
            let imu = Message::ImuData(synth_imu(header.clone()));
            Message::Group(MessageGroup::new(header).with("rgb", rgb).with("imu", imu))
        }
    }
}

fn synth_img(header: MessageHeader) -> ImgFrame {
    let mut meta = ImgFrameMeta::packed(IMG_WIDTH, IMG_HEIGHT, ImgType::Nv12);
    meta.camera.exposure_time_us = 8_333;
    meta.camera.sensitivity_iso = 400;
    meta.camera.wb_color_temp_k = 5_600;
    meta.transformations = ImgTransformations {
        source_hfov_deg: 68.8,
        ..ImgTransformations::new(1280, 960)
    }
    .with_step(ImgTransformation::Scale {
        width: IMG_WIDTH,
        height: IMG_HEIGHT,
    });

    let len = meta.required_len().unwrap_or(0) as usize;
    let shift = header.sequence_num as u8;
    let data: Vec<u8> = (0..len).map(|i| (i as u8).wrapping_add(shift)).collect();
    ImgFrame::new(header, meta, Bytes::from(data))
}

fn synth_encoded(header: MessageHeader) -> EncodedFrame {
    let frame_type = if header.sequence_num.rem_euclid(GOP_SIZE) == 0 {
        EncodedFrameType::I
    } else {
        EncodedFrameType::P
    };
    let meta = EncodedFrameMeta {
        instance_num: 0,
        width: IMG_WIDTH,
        height: IMG_HEIGHT,
        profile: EncodedProfile::Avc,
        frame_type,
        quality: 0,
        bitrate: 2_000_000,
        lossless: false,
        frame_offset: 0,
        frame_size: 0,
        camera: Default::default(),
        transformations: ImgTransformations::new(IMG_WIDTH, IMG_HEIGHT),
    };
    // Annex B start code, then a slice NAL unit header.
    let nal = if frame_type == EncodedFrameType::I { 0x65 } else { 0x41 };
    let mut bitstream = vec![0x00, 0x00, 0x00, 0x01, nal];
    bitstream.resize(256, 0xAB);
    EncodedFrame::new(header, meta, Bytes::from(bitstream))
}

fn synth_imu(header: MessageHeader) -> ImuData {
    let base = i32::try_from(header.sequence_num.rem_euclid(1 << 20)).unwrap_or(0) * 2;
    let packets = (0..2)
        .map(|i| {
            let report = ImuReport {
                sequence: base + i,
                accuracy: ImuAccuracy::High,
                ts: header.ts,
                ts_device: header.ts_device,
            };
            ImuPacket {
                accelerometer: Some(ImuVector {
                    report,
                    x: 0.02,
                    y: 9.81,
                    z: -0.05,
                }),
                gyroscope: Some(ImuVector {
                    report,
                    x: 0.001,
                    y: -0.002,
                    z: 0.0,
                }),
                ..ImuPacket::default()
            }
        })
        .collect();
    ImuData::new(header, packets)
}

fn synth_tracklets(header: MessageHeader) -> Tracklets {
    const STATUSES: [TrackingStatus; 4] = [
        TrackingStatus::New,
        TrackingStatus::Tracked,
        TrackingStatus::Lost,
        TrackingStatus::Removed,
    ];
    let seq = header.sequence_num.rem_euclid(STATUSES.len() as i64) as usize;
    let tracklets = (0..3)
        .map(|i| Tracklet {
            id: i as i32,
            label: 1,
            age: header.sequence_num.clamp(0, i64::from(u32::MAX)) as u32,
            status: STATUSES[(seq + i) % STATUSES.len()],
            roi: Rect::new(0.1 * i as f32, 0.2, 0.25, 0.5),
        })
        .collect();
    Tracklets::new(header, tracklets)
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use sensorlink_frame::{Frame, FrameError, FrameSource};
    use sensorlink_message::{encode_message, parse_message, DatatypeKind};

    use super::*;

    struct Frames(VecDeque<Frame>);

    impl FrameSource for Frames {
        fn read_frame(&mut self) -> sensorlink_frame::Result<Frame> {
            self.0.pop_front().ok_or(FrameError::ConnectionClosed)
        }
    }

    #[test]
    fn synthetic_messages_parse_back() {
        let clock = DeviceClock::start();
        for kind in [
            SendKind::Buffer,
            SendKind::Img,
            SendKind::Encoded,
            SendKind::Imu,
            SendKind::Tracklets,
            SendKind::Group,
        ] {
            let message = synth_message(kind, clock.header(31));
            let mut frames = Frames(
                encode_message(&message)
                    .unwrap()
                    .into_iter()
                    .map(|b| Frame::new(0, b))
                    .collect(),
            );
            let first = frames.read_frame().unwrap();
            let parsed = parse_message(first, &mut frames).unwrap();
            assert_eq!(parsed, message, "{kind:?}");
            assert!(frames.0.is_empty());
        }
    }

    #[test]
    fn synthetic_image_is_consistent() {
        let img = synth_img(MessageHeader::default());
        assert!(img.validate_transformations());
        assert_eq!(img.source_hfov_deg(), 68.8);
        let group = synth_message(SendKind::Group, MessageHeader::default());
        assert_eq!(group.kind(), DatatypeKind::MessageGroup);
    }

    #[test]
    fn keyframes_follow_gop() {
        assert_eq!(
            synth_encoded(MessageHeader::default()).frame_type(),
            EncodedFrameType::I
        );
        let mut header = MessageHeader::default();
        header.sequence_num = 7;
        assert_eq!(synth_encoded(header).frame_type(), EncodedFrameType::P);
    }

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("0ms").unwrap(), Duration::ZERO);
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("bad").is_err());
    }
}
