use std::time::Duration;

use bytes::Bytes;
use mmp_frame::Frame;

use crate::error::Result;

/// A decoded reply to a command frame: `echo ‖ status ‖ data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    /// Command number echoed by the device.
    pub command: u8,
    /// Device status; zero means success.
    pub status: u8,
    /// Reply bytes after the echo and status.
    pub data: Bytes,
}

impl CommandReply {
    pub fn is_success(&self) -> bool {
        self.status == 0
    }
}

/// One raw request frame answered by one reply frame.
///
/// Used by protocols whose replies carry no echo/status header, such as the
/// bootloader.
pub trait Exchange {
    fn exchange(&mut self, flags: u8, data: &[u8], timeout: Duration) -> Result<Frame>;
}

/// Invoke a device command and get its successful reply.
///
/// A non-zero status is reported as
/// [`LinkError::DeviceReportedFailure`](crate::LinkError::DeviceReportedFailure).
/// The sub-command, when present, is sent as the first payload byte.
pub trait Invoke {
    fn invoke(
        &mut self,
        command: u8,
        sub_command: Option<u8>,
        payload: &[u8],
    ) -> Result<CommandReply>;
}

impl<T: Exchange + ?Sized> Exchange for &mut T {
    fn exchange(&mut self, flags: u8, data: &[u8], timeout: Duration) -> Result<Frame> {
        (**self).exchange(flags, data, timeout)
    }
}

impl<T: Invoke + ?Sized> Invoke for &mut T {
    fn invoke(
        &mut self,
        command: u8,
        sub_command: Option<u8>,
        payload: &[u8],
    ) -> Result<CommandReply> {
        (**self).invoke(command, sub_command, payload)
    }
}
