/// Errors that can occur while building or sending frames.
///
/// Receive-side faults (bad markers, bad checksums, timeouts) are never
/// errors: the [`Framer`](crate::Framer) counts them and resynchronizes.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Zero-length payloads cannot be expressed on the wire.
    #[error("frame payload must not be empty")]
    EmptyPayload,

    /// The payload does not fit the 1-byte length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The transport failed while sending a frame.
    #[error("frame transport error: {0}")]
    Transport(#[from] mmp_transport::TransportError),

    /// An I/O error occurred while driving the codec.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
