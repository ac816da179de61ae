use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Accept device links and print the messages they carry.
    Listen(ListenArgs),
    /// Emulate a device: connect and send synthetic messages.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Listen(args) => listen::run(args, format),
        Command::Send(args) => send::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// Link stream id to read.
    #[arg(long, default_value = "0")]
    pub stream: u16,
    /// Exit after printing N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Treat the first link loss as final instead of waiting for the device to reconnect.
    #[arg(long)]
    pub no_reconnect: bool,
    /// Hex-dump incoming frames (visible with --log-level trace).
    #[arg(long)]
    pub dump_frames: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum SendKind {
    Buffer,
    Img,
    Encoded,
    Imu,
    Tracklets,
    Group,
    /// A frame too short to carry a footer.
    Malformed,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Socket path to connect to.
    pub path: PathBuf,
    /// Message kind to send.
    #[arg(long, value_enum, default_value = "img")]
    pub kind: SendKind,
    /// Number of messages to send.
    #[arg(long, default_value = "1")]
    pub count: u64,
    /// Sequence number of the first message.
    #[arg(long, default_value = "0")]
    pub seq_start: i64,
    /// Link stream id to send on.
    #[arg(long, default_value = "0")]
    pub stream: u16,
    /// Pause between messages (e.g. 33ms, 1s).
    #[arg(long)]
    pub interval: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
