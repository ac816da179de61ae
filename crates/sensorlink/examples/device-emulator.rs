//! Minimal device emulator: connects to a host and streams image frames,
//! then one group pairing an image with IMU samples.
//!
//! Run with:
//!   cargo run --example device-emulator -- /tmp/sensorlink-host.sock

use std::thread;
use std::time::Duration;

use bytes::Bytes;
use sensorlink::host::{connect_device, LinkConfig};
use sensorlink::message::{
    ImgFrame, ImgFrameMeta, ImgType, ImuData, ImuPacket, ImuVector, Message, MessageGroup,
    MessageHeader,
};

const FRAMES: i64 = 10;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sock_path = std::env::args()
        .nth(1)
        .ok_or("usage: device-emulator <socket-path>")?;
    let mut device = connect_device(&sock_path, &LinkConfig::default())?;
    eprintln!("Connected to {sock_path}");

    for seq in 0..FRAMES {
        device.send(&Message::ImgFrame(gray_frame(seq, 32, 24)))?;
        thread::sleep(Duration::from_millis(33));
    }

    let imu = ImuData::new(
        header(FRAMES),
        vec![ImuPacket {
            accelerometer: Some(ImuVector {
                y: 9.81,
                ..ImuVector::default()
            }),
            ..ImuPacket::default()
        }],
    );
    let group = MessageGroup::new(header(FRAMES))
        .with("frame", Message::ImgFrame(gray_frame(FRAMES, 32, 24)))
        .with("imu", Message::ImuData(imu));
    device.send(&Message::Group(group))?;

    eprintln!("Sent {} messages", device.sent());
    Ok(())
}

fn header(seq: i64) -> MessageHeader {
    MessageHeader {
        sequence_num: seq,
        ..MessageHeader::default()
    }
}

fn gray_frame(seq: i64, width: u32, height: u32) -> ImgFrame {
    let meta = ImgFrameMeta::packed(width, height, ImgType::Gray8);
    let data = vec![(seq * 20) as u8; (width * height) as usize];
    ImgFrame::new(header(seq), meta, Bytes::from(data))
}
