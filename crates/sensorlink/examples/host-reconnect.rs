//! Host side of a device link that survives device restarts.
//!
//! Binds a socket, reads typed messages, and hands every new device
//! connection to the running link. Stops after 20 messages.
//!
//! Run with:
//!   cargo run --example host-reconnect
//!
//! In another terminal (repeat to simulate device restarts):
//!   cargo run --example device-emulator -- /tmp/sensorlink-host.sock

use std::sync::atomic::AtomicBool;
use std::sync::{mpsc, Arc};
use std::thread;

use sensorlink::host::{DeviceListener, LinkIn, LinkInConfig};

const MESSAGE_LIMIT: usize = 20;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sock_path = std::env::temp_dir().join("sensorlink-host.sock");
    let listener = DeviceListener::bind(&sock_path)?;
    eprintln!("Listening on {}", sock_path.display());

    let first = listener.accept()?;
    eprintln!("Device connected");

    let (tx, rx) = mpsc::channel();
    let running = Arc::new(AtomicBool::new(true));
    let link = LinkIn::new(first, tx, running).with_config(LinkInConfig {
        name: "example".into(),
        ..LinkInConfig::default()
    });
    let handle = link.handle();

    // Later connections replace the lost one.
    let acceptor = handle.clone();
    thread::spawn(move || {
        while let Ok(reader) = listener.accept() {
            eprintln!("Device reconnected");
            acceptor.set_connection(reader);
        }
    });

    let worker = thread::spawn(move || link.run());

    for message in rx.iter().take(MESSAGE_LIMIT) {
        eprintln!(
            "{:?} seq={} state={:?}",
            message.kind(),
            message.sequence_num(),
            handle.state()
        );
    }

    handle.shutdown();
    eprintln!("Stopping; waiting for the device to close its link");
    match worker.join() {
        Ok(result) => eprintln!("Link ended: {result:?}"),
        Err(_) => eprintln!("Link worker panicked"),
    }
    eprintln!("{:?}", handle.stats());
    Ok(())
}
