use std::time::Duration;

use crate::error::Result;

/// A duplex byte channel with a per-byte read timeout.
///
/// One handle is driven by the link's reader thread (`read_byte` only) and a
/// clone obtained via [`Transport::try_clone`] is used for transmission.
pub trait Transport: Send {
    /// Read a single byte, waiting at most `timeout`.
    ///
    /// Returns `Ok(None)` when no byte arrived in time.
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>>;

    /// Write all of `data` to the link.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Open a second handle onto the same link.
    fn try_clone(&self) -> Result<Box<dyn Transport>>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        (**self).read_byte(timeout)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn try_clone(&self) -> Result<Box<dyn Transport>> {
        (**self).try_clone()
    }
}
