//! Frame classification by flags byte.
//!
//! Bit 0 set marks a command-class frame (a request or its reply); bit 0
//! clear marks an asynchronous, unsolicited frame. The exact value `0x01`
//! marks a bootloader frame, a narrower kind of command frame.

/// Flags for asynchronous frames.
pub const ASYNC: u8 = 0x00;

/// Bit marking command-class frames. Also the flags value used for commands.
pub const COMMAND: u8 = 0x01;

/// Exact flags value of bootloader frames.
pub const BOOT: u8 = 0x01;

/// How a received frame is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameClass {
    /// Bootloader request/reply frame.
    Boot,
    /// Command request/reply frame.
    Command,
    /// Unsolicited frame pushed by the device.
    Async,
}

impl FrameClass {
    /// True for frames that answer a request (command or bootloader).
    pub fn is_reply(self) -> bool {
        !matches!(self, FrameClass::Async)
    }

    /// Human-readable class name.
    pub fn name(self) -> &'static str {
        match self {
            FrameClass::Boot => "BOOT",
            FrameClass::Command => "COMMAND",
            FrameClass::Async => "ASYNC",
        }
    }
}

/// Classify a flags byte.
pub fn classify(flags: u8) -> FrameClass {
    if flags == BOOT {
        FrameClass::Boot
    } else if flags & COMMAND != 0 {
        FrameClass::Command
    } else {
        FrameClass::Async
    }
}
