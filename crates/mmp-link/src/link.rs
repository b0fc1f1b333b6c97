use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use mmp_frame::{Frame, FrameWriter, BOOT, COMMAND};
use mmp_transport::Transport;

use crate::config::LinkConfig;
use crate::dispatch::{Dispatcher, LogSink, TracingLogSink};
use crate::error::{LinkError, Result};
use crate::reader;
use crate::stats::{LinkCounters, LinkStats};
use crate::traits::{CommandReply, Exchange, Invoke};

/// Payload of the frame that asks the device firmware to reboot.
pub const REBOOT_REQUEST: &[u8] = b"r";

/// A host-side connection to one device.
///
/// Opening a link spawns a reader thread that owns the receive half of the
/// transport. Requests take `&mut self`, so at most one request is
/// outstanding per link.
pub struct Link {
    writer: FrameWriter<Box<dyn Transport>>,
    replies: Receiver<Frame>,
    inbox: Receiver<Frame>,
    counters: Arc<LinkCounters>,
    alive: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
    config: LinkConfig,
}

impl Link {
    /// Open a link whose device log lines go to `tracing`.
    pub fn open<T: Transport + 'static>(transport: T, config: LinkConfig) -> Result<Self> {
        Self::open_with_sink(transport, config, TracingLogSink)
    }

    /// Open a link with a custom sink for device log lines.
    pub fn open_with_sink<T, S>(transport: T, config: LinkConfig, sink: S) -> Result<Self>
    where
        T: Transport + 'static,
        S: LogSink + 'static,
    {
        let writer = FrameWriter::new(transport.try_clone()?);

        let (reply_tx, replies) = crossbeam_channel::bounded(1);
        let (inbox_tx, inbox) = crossbeam_channel::bounded(config.inbox_capacity);
        let counters = Arc::new(LinkCounters::default());
        let alive = Arc::new(AtomicBool::new(true));

        let dispatcher = Dispatcher::new(
            reply_tx,
            replies.clone(),
            inbox_tx,
            Box::new(sink),
            counters.clone(),
            alive.clone(),
        );
        let reader = reader::spawn(
            Box::new(transport),
            dispatcher,
            counters.clone(),
            alive.clone(),
            config.poll_timeout,
        )?;

        Ok(Self {
            writer,
            replies,
            inbox,
            counters,
            alive,
            reader: Some(reader),
            config,
        })
    }

    /// Open a link on a serial port.
    #[cfg(feature = "serial")]
    pub fn open_serial(
        path: &str,
        serial: &mmp_transport::SerialConfig,
        config: LinkConfig,
    ) -> Result<Self> {
        let transport = mmp_transport::SerialTransport::open(path, serial)?;
        Self::open(transport, config)
    }

    /// Send a command and wait for its reply.
    ///
    /// Sends `command ‖ payload` as a command frame. The reply must echo
    /// `command` and carry a status byte; both are stripped from the returned
    /// data. A non-zero status is returned as-is, not as an error.
    pub fn send_receive_command(
        &mut self,
        command: u8,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<CommandReply> {
        let mut data = Vec::with_capacity(1 + payload.len());
        data.push(command);
        data.extend_from_slice(payload);

        let frame = self.request(COMMAND, &data, timeout)?;

        if frame.len() < 2 {
            LinkCounters::bump(&self.counters.invalid_responses);
            return Err(LinkError::InvalidResponse {
                command,
                reason: format!("reply has {} bytes, expected at least 2", frame.len()),
            });
        }
        if frame.data[0] != command {
            LinkCounters::bump(&self.counters.invalid_responses);
            return Err(LinkError::InvalidResponse {
                command,
                reason: format!("reply echoes command {}", frame.data[0]),
            });
        }

        LinkCounters::bump(&self.counters.responses);
        Ok(CommandReply {
            command,
            status: frame.data[1],
            data: frame.data.slice(2..),
        })
    }

    /// Send a command whose payload starts with a sub-command byte.
    pub fn sub_command(
        &mut self,
        command: u8,
        sub_command: u8,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<CommandReply> {
        let mut data = Vec::with_capacity(1 + payload.len());
        data.push(sub_command);
        data.extend_from_slice(payload);
        self.send_receive_command(command, &data, timeout)
    }

    /// Send a frame without waiting for a reply.
    pub fn send(&mut self, flags: u8, data: &[u8]) -> Result<()> {
        self.writer.send(flags, data)?;
        Ok(())
    }

    /// Ask the device firmware to reboot. No reply is expected.
    pub fn reboot_device(&mut self) -> Result<()> {
        tracing::info!("requesting device reboot");
        self.send(BOOT, REBOOT_REQUEST)
    }

    /// Take the oldest unsolicited frame, if any.
    pub fn try_recv_async(&self) -> Option<Frame> {
        self.inbox.try_recv().ok()
    }

    /// Take every unsolicited frame currently queued.
    pub fn drain_async(&self) -> Vec<Frame> {
        self.inbox.try_iter().collect()
    }

    /// Wait up to `timeout` for an unsolicited frame.
    pub fn recv_async_timeout(&self, timeout: Duration) -> Result<Option<Frame>> {
        match self.inbox.recv_timeout(timeout) {
            Ok(frame) => Ok(Some(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(LinkError::Disconnected),
        }
    }

    /// Snapshot of the link counters.
    pub fn stats(&self) -> LinkStats {
        self.counters.snapshot()
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// True while the reader thread is running.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Stop the reader thread and return the final counters.
    pub fn close(mut self) -> LinkStats {
        self.shutdown();
        self.counters.snapshot()
    }

    fn request(&mut self, flags: u8, data: &[u8], timeout: Duration) -> Result<Frame> {
        if !self.is_alive() {
            return Err(LinkError::Disconnected);
        }

        for stale in self.replies.try_iter() {
            LinkCounters::bump(&self.counters.stale_replies);
            tracing::debug!(flags = stale.flags, len = stale.len(), "dropped stale reply");
        }

        self.writer.send(flags, data)?;
        LinkCounters::bump(&self.counters.commands_sent);

        match self.replies.recv_timeout(timeout) {
            Ok(frame) => Ok(frame),
            Err(RecvTimeoutError::Timeout) => {
                LinkCounters::bump(&self.counters.response_timeouts);
                let request = data.first().copied().unwrap_or_default();
                tracing::debug!(request, ?timeout, "no response");
                Err(LinkError::NoResponse { request, timeout })
            }
            Err(RecvTimeoutError::Disconnected) => Err(LinkError::Disconnected),
        }
    }

    fn shutdown(&mut self) {
        self.alive.store(false, Ordering::Release);
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                tracing::error!("reader thread panicked");
            }
        }
    }
}

impl Exchange for Link {
    fn exchange(&mut self, flags: u8, data: &[u8], timeout: Duration) -> Result<Frame> {
        let frame = self.request(flags, data, timeout)?;
        LinkCounters::bump(&self.counters.responses);
        Ok(frame)
    }
}

impl Invoke for Link {
    fn invoke(
        &mut self,
        command: u8,
        sub_command: Option<u8>,
        payload: &[u8],
    ) -> Result<CommandReply> {
        let timeout = self.config.reply_timeout;
        let reply = match sub_command {
            Some(sub) => self.sub_command(command, sub, payload, timeout)?,
            None => self.send_receive_command(command, payload, timeout)?,
        };
        if !reply.is_success() {
            tracing::info!(command, status = reply.status, "device reported failure");
            return Err(LinkError::DeviceReportedFailure {
                command,
                status: reply.status,
            });
        }
        Ok(reply)
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("alive", &self.is_alive())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
