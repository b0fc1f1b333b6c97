//! Checksummed byte-stream framing for MCU serial links.
//!
//! Binary frames, free-text log lines and line noise share one serial stream.
//! Every frame is laid out as:
//! - `SOM` (0x01), a 1-byte payload length and a 1-byte flags field
//! - `STX` (0x02), the payload, `ETX` (0x03)
//! - a 1-byte checksum making `length + flags + payload + checksum` sum to zero
//!
//! Outside a frame, a line starting with `"\tLOG"` and ending in `\n` is
//! surfaced as a log line. Everything else is discarded as noise and the
//! [`Framer`] resynchronizes on the next `SOM`.

pub mod codec;
pub mod error;
pub mod flags;
pub mod framer;
pub mod writer;

#[cfg(feature = "async")]
pub use codec::MmpCodec;
pub use codec::{
    checksum, encode_frame, Frame, ETX, FRAME_OVERHEAD, LOG_PREAMBLE, MAX_LOG_LINE, MAX_PAYLOAD,
    SOM, STX,
};
pub use error::{FrameError, Result};
pub use flags::{classify, FrameClass, ASYNC, BOOT, COMMAND};
pub use framer::{Framer, FramerEvent, FramerState, FramerStats, LogLine};
pub use writer::FrameWriter;
