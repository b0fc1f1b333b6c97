//! Host tooling for MCU message protocol (MMP) serial links.
//!
//! A microcontroller and its host exchange checksummed frames over a serial
//! line. Commands are answered by replies, everything else is delivered as
//! unsolicited frames, and plain-text log lines can be interleaved with the
//! framed traffic. On top of that sits a page-oriented AVR bootloader protocol.
//!
//! # Crate Structure
//!
//! - [`transport`]: Byte-oriented transports (serial port, in-memory pair)
//! - [`frame`]: Wire framing, checksums and the receive state machine
//! - [`link`]: Reader thread, frame dispatch and command/reply correlation
//! - [`boot`]: Bootloader client: identify, erase, read, write and verify

/// Re-export transport types.
pub mod transport {
    pub use mmp_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use mmp_frame::*;
}

/// Re-export link types.
pub mod link {
    pub use mmp_link::*;
}

/// Re-export bootloader types.
pub mod boot {
    pub use mmp_boot::*;
}
