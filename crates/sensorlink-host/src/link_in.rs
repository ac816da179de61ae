//! The host-side read loop for one device link.
//!
//! A [`LinkIn`] worker reads frames from its current transport, parses them
//! into messages and hands them to its sink in arrival order. When the
//! transport fails it waits for a replacement, installed from another thread
//! through a [`LinkInHandle`], or for an explicit disconnect.
//!
//! ```text
//!             set_connection              disconnect
//!   Connected ───────────────▶ ◀─── AwaitingTransport ───▶ PermanentlyDisconnected
//!       │    ◀───────────────┘            ▲
//!       └──── transport failure ──────────┘
//! ```

use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use sensorlink_frame::{FrameError, FrameSource};
use sensorlink_message::{parse_message, Message};
use serde::Serialize;
use tracing::{debug, info, trace, warn, Level};

use crate::config::LinkInConfig;
use crate::error::{HostError, Result};
use crate::sink::MessageSink;

/// Leading frame bytes included in a trace dump.
const DUMP_HEAD_BYTES: usize = 32;

type BoxedSource = Box<dyn FrameSource>;

/// Where a link is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    Connected,
    AwaitingTransport,
    PermanentlyDisconnected,
}

/// Counters for one link, accumulated across reconnects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    /// Messages handed to the sink.
    pub dispatched: u64,
    /// Frames dropped because they did not parse.
    pub parse_errors: u64,
    /// Replacement transports taken into use.
    pub reconnects: u64,
    /// Messages whose sequence number was lower than the previous one.
    pub sequence_regressions: u64,
}

struct Slot {
    state: LinkState,
    staged: Option<BoxedSource>,
    disconnected: bool,
    shutdown: bool,
}

#[derive(Default)]
struct Counters {
    dispatched: AtomicU64,
    parse_errors: AtomicU64,
    reconnects: AtomicU64,
    sequence_regressions: AtomicU64,
}

struct Shared {
    slot: Mutex<Slot>,
    wake: Condvar,
    running: Arc<AtomicBool>,
    counters: Counters,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Controls a [`LinkIn`] from other threads.
#[derive(Clone)]
pub struct LinkInHandle {
    shared: Arc<Shared>,
}

impl LinkInHandle {
    /// Install a replacement transport.
    ///
    /// A worker waiting for a transport takes it up at once. While the
    /// current transport is still healthy the replacement is held and used
    /// at the next failure; a later call replaces a held transport. Ignored
    /// once the link is permanently disconnected.
    pub fn set_connection<S: FrameSource + 'static>(&self, source: S) {
        let mut slot = self.shared.lock();
        if slot.disconnected {
            debug!("link disconnected, dropping new transport");
            return;
        }
        if let Some(mut previous) = slot.staged.replace(Box::new(source)) {
            previous.close();
        }
        drop(slot);
        self.shared.wake.notify_one();
    }

    /// Mark the link permanently dead.
    ///
    /// A worker waiting for a transport exits with
    /// [`HostError::TerminalDisconnect`]. A connected worker keeps reading its
    /// current transport and exits the same way when that fails.
    pub fn disconnect(&self) {
        let mut slot = self.shared.lock();
        slot.disconnected = true;
        if let Some(mut staged) = slot.staged.take() {
            staged.close();
        }
        drop(slot);
        self.shared.wake.notify_one();
    }

    /// Clear the running flag and release a worker waiting for a transport.
    ///
    /// A read already blocked on the transport is not interrupted; close the
    /// transport to unblock it.
    pub fn shutdown(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.lock().shutdown = true;
        self.shared.wake.notify_one();
    }

    pub fn state(&self) -> LinkState {
        self.shared.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.shared.running()
    }

    pub fn stats(&self) -> LinkStats {
        let c = &self.shared.counters;
        LinkStats {
            dispatched: c.dispatched.load(Ordering::Relaxed),
            parse_errors: c.parse_errors.load(Ordering::Relaxed),
            reconnects: c.reconnects.load(Ordering::Relaxed),
            sequence_regressions: c.sequence_regressions.load(Ordering::Relaxed),
        }
    }
}

/// Reads one device link and dispatches its messages.
pub struct LinkIn<K> {
    config: LinkInConfig,
    shared: Arc<Shared>,
    source: BoxedSource,
    sink: K,
    last_seq: Option<i64>,
}

impl<K: MessageSink> LinkIn<K> {
    /// Create a worker reading `source` into `sink`.
    ///
    /// `running` is owned by the caller; the worker reads until it is
    /// cleared, and a transport failure after that ends the session quietly.
    pub fn new<S: FrameSource + 'static>(source: S, sink: K, running: Arc<AtomicBool>) -> Self {
        Self {
            config: LinkInConfig::default(),
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    state: LinkState::Connected,
                    staged: None,
                    disconnected: false,
                    shutdown: false,
                }),
                wake: Condvar::new(),
                running,
                counters: Counters::default(),
            }),
            source: Box::new(source),
            sink,
            last_seq: None,
        }
    }

    pub fn with_config(mut self, config: LinkInConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &LinkInConfig {
        &self.config
    }

    pub fn handle(&self) -> LinkInHandle {
        LinkInHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Run until stopped, disconnected, or the sink closes.
    ///
    /// Returns `Ok(())` when the running flag was cleared, including when the
    /// transport failed after that.
    pub fn run(mut self) -> Result<()> {
        info!(link = %self.config.name, "device link started");
        loop {
            let cause = match self.pump() {
                Ok(Some(cause)) => cause,
                Ok(None) => {
                    self.source.close();
                    debug!(link = %self.config.name, "device link stopped");
                    return Ok(());
                }
                Err(err) => {
                    self.source.close();
                    return Err(err);
                }
            };
            self.source.close();

            if !self.shared.running() {
                debug!(link = %self.config.name, error = %cause, "transport closed during shutdown");
                return Ok(());
            }

            if !self.config.reconnect {
                self.shared.lock().state = LinkState::PermanentlyDisconnected;
                warn!(link = %self.config.name, error = %cause, "device link failed");
                return Err(HostError::TransportFailure(cause));
            }

            warn!(
                link = %self.config.name,
                error = %cause,
                "device link failed, awaiting new transport"
            );
            match self.await_transport(cause)? {
                Some(source) => {
                    self.source = source;
                    self.last_seq = None;
                    info!(link = %self.config.name, "device link re-established");
                }
                None => {
                    debug!(link = %self.config.name, "shutdown while awaiting transport");
                    return Ok(());
                }
            }
        }
    }

    /// Read and dispatch until the transport fails or the worker is stopped.
    ///
    /// Returns the transport failure, or `None` if the running flag was cleared.
    fn pump(&mut self) -> Result<Option<FrameError>> {
        while self.shared.running() {
            let frame = match self.source.read_frame() {
                Ok(frame) => frame,
                Err(err) => return Ok(Some(err)),
            };

            if self.config.dump_frames && tracing::enabled!(Level::TRACE) {
                trace!(
                    link = %self.config.name,
                    stream = frame.stream,
                    len = frame.len(),
                    head = %hex_head(&frame.payload),
                    "frame"
                );
            }

            let started = Instant::now();
            match parse_message(frame, &mut self.source) {
                Ok(message) => self.dispatch(message, started)?,
                Err(err) if err.is_transport() => {
                    warn!(link = %self.config.name, error = %err, "message group incomplete");
                    return Ok(Some(
                        err.into_transport().unwrap_or(FrameError::ConnectionClosed),
                    ));
                }
                Err(err) => {
                    Shared::bump(&self.shared.counters.parse_errors);
                    warn!(link = %self.config.name, error = %err, "dropping message");
                }
            }
        }
        Ok(None)
    }

    fn dispatch(&mut self, message: Message, started: Instant) -> Result<()> {
        let seq = message.sequence_num();
        if let Some(previous) = self.last_seq {
            if seq < previous {
                Shared::bump(&self.shared.counters.sequence_regressions);
                warn!(link = %self.config.name, previous, seq, "sequence number went backwards");
            }
        }
        self.last_seq = Some(seq);

        trace!(
            link = %self.config.name,
            kind = %message.kind(),
            seq,
            parse_us = started.elapsed().as_micros() as u64,
            "message received"
        );

        self.sink
            .send(message)
            .map_err(|_| HostError::OutputClosed)?;
        Shared::bump(&self.shared.counters.dispatched);
        Ok(())
    }

    fn await_transport(&mut self, cause: FrameError) -> Result<Option<BoxedSource>> {
        let shared = Arc::clone(&self.shared);
        let mut slot = shared.lock();
        slot.state = LinkState::AwaitingTransport;

        let mut slot = shared
            .wake
            .wait_while(slot, |s| s.staged.is_none() && !s.disconnected && !s.shutdown)
            .unwrap_or_else(PoisonError::into_inner);

        if slot.disconnected {
            slot.state = LinkState::PermanentlyDisconnected;
            warn!(link = %self.config.name, "device link disconnected");
            return Err(HostError::TerminalDisconnect { cause });
        }

        match slot.staged.take() {
            Some(source) => {
                slot.state = LinkState::Connected;
                Shared::bump(&shared.counters.reconnects);
                Ok(Some(source))
            }
            None => Ok(None),
        }
    }
}

fn hex_head(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(DUMP_HEAD_BYTES * 2 + 2);
    for byte in bytes.iter().take(DUMP_HEAD_BYTES) {
        let _ = write!(out, "{byte:02x}");
    }
    if bytes.len() > DUMP_HEAD_BYTES {
        out.push_str("..");
    }
    out
}
