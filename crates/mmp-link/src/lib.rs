//! Host side of an MMP serial link.
//!
//! A [`Link`] runs one reader thread that drives the framer and routes what it
//! finds: command and bootloader replies into a single-slot reply queue,
//! unsolicited frames into a bounded inbox, device log lines into a
//! [`LogSink`]. Callers issue one request at a time through
//! [`Link::send_receive_command`] or the [`Exchange`] and [`Invoke`] traits.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod link;
mod reader;
#[cfg(test)]
mod sim;
pub mod stats;
pub mod traits;

pub use config::{LinkConfig, DEFAULT_INBOX_CAPACITY, DEFAULT_POLL_TIMEOUT, DEFAULT_REPLY_TIMEOUT};
pub use dispatch::{ChannelLogSink, LogSink, TracingLogSink, MCU_LOG_TARGET};
pub use error::{LinkError, Result};
pub use handlers::{
    firmware_version, ping, ping_many, FirmwareVersion, PingSummary, PING_COMMAND, VERSION_COMMAND,
};
pub use link::{Link, REBOOT_REQUEST};
pub use stats::LinkStats;
pub use traits::{CommandReply, Exchange, Invoke};
