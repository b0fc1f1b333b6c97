//! Routing of received frames and log lines.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, SendTimeoutError, Sender, TrySendError};
use mmp_frame::{classify, Frame, FramerEvent, LogLine};

use crate::stats::LinkCounters;

/// Target under which [`TracingLogSink`] emits MCU log lines.
pub const MCU_LOG_TARGET: &str = "mmp::mcu";

const INBOX_RETRY: Duration = Duration::from_millis(50);

/// Receives log lines printed by the device.
pub trait LogSink: Send {
    fn log(&mut self, line: &LogLine);
}

impl<F> LogSink for F
where
    F: FnMut(&LogLine) + Send,
{
    fn log(&mut self, line: &LogLine) {
        self(line)
    }
}

/// Re-emits device log lines as `tracing` events under [`MCU_LOG_TARGET`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn log(&mut self, line: &LogLine) {
        let text = line.to_string_lossy();
        if line.truncated {
            tracing::warn!(target: "mmp::mcu", truncated = true, "{text}");
        } else {
            tracing::info!(target: "mmp::mcu", "{text}");
        }
    }
}

/// Forwards device log lines to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelLogSink {
    tx: Sender<LogLine>,
}

impl ChannelLogSink {
    pub fn new() -> (Self, Receiver<LogLine>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }
}

impl LogSink for ChannelLogSink {
    fn log(&mut self, line: &LogLine) {
        // A dropped receiver just means nobody is listening any more.
        let _ = self.tx.send(line.clone());
    }
}

/// Routes framer events: replies to the single reply slot, unsolicited frames
/// to the async inbox, log lines to the sink.
pub(crate) struct Dispatcher {
    reply_tx: Sender<Frame>,
    // Second handle on the reply slot, used to evict a stale reply.
    reply_evict: Receiver<Frame>,
    inbox_tx: Sender<Frame>,
    sink: Box<dyn LogSink>,
    counters: Arc<LinkCounters>,
    alive: Arc<AtomicBool>,
}

impl Dispatcher {
    pub(crate) fn new(
        reply_tx: Sender<Frame>,
        reply_evict: Receiver<Frame>,
        inbox_tx: Sender<Frame>,
        sink: Box<dyn LogSink>,
        counters: Arc<LinkCounters>,
        alive: Arc<AtomicBool>,
    ) -> Self {
        Self {
            reply_tx,
            reply_evict,
            inbox_tx,
            sink,
            counters,
            alive,
        }
    }

    pub(crate) fn dispatch(&mut self, event: FramerEvent) {
        match event {
            FramerEvent::Log(line) => self.sink.log(&line),
            FramerEvent::Frame(frame) => {
                let class = classify(frame.flags);
                tracing::trace!(
                    class = class.name(),
                    flags = frame.flags,
                    len = frame.len(),
                    "routing frame"
                );
                if class.is_reply() {
                    self.push_reply(frame)
                } else {
                    self.push_async(frame)
                }
            }
        }
    }

    fn push_reply(&mut self, frame: Frame) {
        LinkCounters::bump(&self.counters.replies);
        let mut frame = frame;
        loop {
            match self.reply_tx.try_send(frame) {
                Ok(()) => return,
                Err(TrySendError::Full(back)) => {
                    if let Ok(stale) = self.reply_evict.try_recv() {
                        LinkCounters::bump(&self.counters.stale_replies);
                        tracing::warn!(
                            flags = stale.flags,
                            len = stale.len(),
                            "discarding unclaimed reply"
                        );
                    }
                    frame = back;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }

    /// Blocks while the inbox is full, stalling reception until the
    /// application drains it or the link shuts down.
    fn push_async(&mut self, frame: Frame) {
        LinkCounters::bump(&self.counters.async_frames);
        let mut frame = frame;
        let mut warned = false;
        loop {
            match self.inbox_tx.send_timeout(frame, INBOX_RETRY) {
                Ok(()) => return,
                Err(SendTimeoutError::Timeout(back)) => {
                    if !self.alive.load(Ordering::Acquire) {
                        return;
                    }
                    if !warned {
                        tracing::warn!(
                            capacity = ?self.inbox_tx.capacity(),
                            "async inbox full, reception stalled"
                        );
                        warned = true;
                    }
                    frame = back;
                }
                Err(SendTimeoutError::Disconnected(_)) => return,
            }
        }
    }
}
