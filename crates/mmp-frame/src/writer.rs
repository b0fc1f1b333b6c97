use bytes::BytesMut;
use mmp_transport::Transport;

use crate::codec::{encode_frame, FRAME_OVERHEAD, MAX_PAYLOAD};
use crate::error::Result;

/// Encodes frames and writes each one to a transport in a single call.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Transport> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(FRAME_OVERHEAD + MAX_PAYLOAD),
        }
    }

    /// Encode and send a payload with the given flags.
    pub fn send(&mut self, flags: u8, data: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_frame(flags, data, &mut self.buf)?;
        tracing::trace!(flags, len = data.len(), "sending frame");
        self.inner.write(&self.buf)?;
        Ok(())
    }
}

impl<T> std::fmt::Debug for FrameWriter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameWriter")
            .field("buffered", &self.buf.len())
            .finish_non_exhaustive()
    }
}
