use std::time::Duration;

/// Errors that can occur in link operations.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] mmp_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] mmp_frame::FrameError),

    /// No reply arrived before the deadline.
    #[error("no response to request 0x{request:02x} within {timeout:?}")]
    NoResponse { request: u8, timeout: Duration },

    /// The reply was too short or echoed a different command.
    #[error("invalid response to command {command}: {reason}")]
    InvalidResponse { command: u8, reason: String },

    /// The device answered with a non-zero status.
    #[error("command {command} failed on device with status {status}")]
    DeviceReportedFailure { command: u8, status: u8 },

    /// The reader thread has stopped; no more replies can arrive.
    #[error("link disconnected")]
    Disconnected,
}

impl LinkError {
    /// True for a request that timed out without a reply.
    pub fn is_no_response(&self) -> bool {
        matches!(self, LinkError::NoResponse { .. })
    }
}

pub type Result<T> = std::result::Result<T, LinkError>;
