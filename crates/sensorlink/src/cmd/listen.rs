use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use sensorlink_frame::FrameReader;
use sensorlink_host::{DeviceListener, HostError, LinkConfig, LinkIn, LinkInConfig, LinkInHandle};
use sensorlink_transport::LinkStream;
use tracing::{info, warn};

use crate::cmd::ListenArgs;
use crate::exit::{host_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_message, print_stats, OutputFormat};

/// Messages buffered between the link worker and stdout.
const OUTPUT_BACKLOG: usize = 256;

/// Connections that can still be open: the active one and one staged
/// replacement. Older ones were already closed by the link.
const TRACKED_LINKS: usize = 2;

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let config = LinkConfig {
        stream: args.stream,
        ..LinkConfig::default()
    };
    let listener = DeviceListener::bind(&args.path)
        .map_err(|err| host_error("bind failed", err))?
        .with_config(config);

    let running = Arc::new(AtomicBool::new(true));
    let stopper = Arc::new(Stopper::new(Arc::clone(&running)));
    install_ctrlc_handler(Arc::clone(&stopper))?;

    info!(path = %listener.path().display(), "waiting for device");
    let first = listener
        .accept()
        .map_err(|err| host_error("accept failed", err))?;
    stopper.track(&first);

    let (tx, rx) = mpsc::sync_channel(OUTPUT_BACKLOG);
    let link = LinkIn::new(first, tx, Arc::clone(&running)).with_config(LinkInConfig {
        name: args.path.display().to_string(),
        reconnect: true,
        dump_frames: args.dump_frames,
    });
    let handle = link.handle();
    stopper.attach(handle.clone());

    if args.no_reconnect {
        handle.disconnect();
    } else {
        spawn_acceptor(listener, handle.clone(), Arc::clone(&stopper));
    }
    let worker = thread::spawn(move || link.run());

    let mut printed = 0usize;
    let mut limit_reached = false;
    for message in rx.iter() {
        print_message(&message, format);
        printed = printed.saturating_add(1);
        if args.count.is_some_and(|count| printed >= count) {
            limit_reached = true;
            stopper.stop();
            break;
        }
    }
    drop(rx);

    let result = worker
        .join()
        .map_err(|_| CliError::new(INTERNAL, "link worker panicked"))?;
    print_stats(&handle.stats());

    match result {
        Ok(()) => Ok(SUCCESS),
        Err(HostError::OutputClosed) if limit_reached => Ok(SUCCESS),
        Err(err) => Err(host_error("device link", err)),
    }
}

/// Accept every later device connection and hand it to the link.
fn spawn_acceptor(listener: DeviceListener, handle: LinkInHandle, stopper: Arc<Stopper>) {
    thread::spawn(move || {
        while handle.is_running() {
            match listener.accept() {
                Ok(reader) => {
                    if !handle.is_running() {
                        break;
                    }
                    stopper.track(&reader);
                    info!("device connected, installing new transport");
                    handle.set_connection(reader);
                }
                Err(err) => {
                    warn!(error = %err, "accept failed, no further reconnects");
                    break;
                }
            }
        }
    });
}

/// Stops the session from the signal handler or once `--count` is reached.
struct Stopper {
    running: Arc<AtomicBool>,
    handle: Mutex<Option<LinkInHandle>>,
    streams: Mutex<Vec<LinkStream>>,
}

impl Stopper {
    fn new(running: Arc<AtomicBool>) -> Self {
        Self {
            running,
            handle: Mutex::new(None),
            streams: Mutex::new(Vec::new()),
        }
    }

    fn attach(&self, handle: LinkInHandle) {
        *lock(&self.handle) = Some(handle);
    }

    /// Remember a connection so `stop` can unblock a read on it.
    fn track(&self, reader: &FrameReader<LinkStream>) {
        match reader.get_ref().try_clone() {
            Ok(stream) => {
                let mut streams = lock(&self.streams);
                streams.push(stream);
                let stale = streams.len().saturating_sub(TRACKED_LINKS);
                streams.drain(..stale);
            }
            Err(err) => warn!(error = %err, "cannot track connection for shutdown"),
        }
    }

    /// Returns false if no link was running yet.
    fn stop(&self) -> bool {
        self.running.store(false, Ordering::SeqCst);
        let attached = match lock(&self.handle).as_ref() {
            Some(handle) => {
                handle.shutdown();
                true
            }
            None => false,
        };
        for stream in lock(&self.streams).iter() {
            let _ = stream.shutdown();
        }
        attached
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn install_ctrlc_handler(stopper: Arc<Stopper>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        // Still blocked in the first accept: nothing to wind down.
        if !stopper.stop() {
            std::process::exit(SUCCESS);
        }
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::os::unix::net::UnixStream;

    use super::*;

    fn pair() -> (UnixStream, FrameReader<LinkStream>) {
        let (device, host) = UnixStream::pair().unwrap();
        (device, FrameReader::new(LinkStream::from_unix(host)))
    }

    #[test]
    fn stopper_keeps_only_recent_connections() {
        let stopper = Stopper::new(Arc::new(AtomicBool::new(true)));
        let mut devices = Vec::new();
        let mut readers = Vec::new();
        for _ in 0..5 {
            let (device, reader) = pair();
            stopper.track(&reader);
            devices.push(device);
            readers.push(reader);
        }
        assert_eq!(lock(&stopper.streams).len(), TRACKED_LINKS);

        assert!(!stopper.stop());
        assert!(!stopper.running.load(Ordering::SeqCst));
        for device in devices.iter_mut().rev().take(TRACKED_LINKS) {
            let mut rest = Vec::new();
            assert_eq!(device.read_to_end(&mut rest).unwrap(), 0);
        }
    }
}
