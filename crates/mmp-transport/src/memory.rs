use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::error::{Result, TransportError};
use crate::transport::Transport;

/// One end of an in-memory duplex byte link.
///
/// Bytes written to one end of a [`MemoryTransport::pair`] are read, in order,
/// from the other end. Dropping every handle of one end makes the other end
/// report [`TransportError::Closed`].
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    tx: Sender<u8>,
    rx: Receiver<u8>,
}

impl MemoryTransport {
    /// Create two connected ends.
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = crossbeam_channel::unbounded();
        let (b_tx, a_rx) = crossbeam_channel::unbounded();
        (Self { tx: a_tx, rx: a_rx }, Self { tx: b_tx, rx: b_rx })
    }

    /// Number of bytes waiting to be read on this end.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl Transport for MemoryTransport {
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        match self.rx.recv_timeout(timeout) {
            Ok(byte) => Ok(Some(byte)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        for &byte in data {
            self.tx.send(byte).map_err(|_| TransportError::Closed)?;
        }
        Ok(())
    }

    fn try_clone(&self) -> Result<Box<dyn Transport>> {
        Ok(Box::new(self.clone()))
    }
}
