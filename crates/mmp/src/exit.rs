use std::fmt;
use std::io;

use mmp_boot::{BootError, ImageError};
use mmp_frame::FrameError;
use mmp_link::LinkError;
use mmp_transport::TransportError;

// Exit code constants, sysexits-style.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => USAGE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Transport(err) => transport_error(context, err),
        FrameError::Io(source) => io_error(context, source),
        FrameError::EmptyPayload | FrameError::PayloadTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

pub fn link_error(context: &str, err: LinkError) -> CliError {
    match err {
        LinkError::Transport(err) => transport_error(context, err),
        LinkError::Frame(err) => frame_error(context, err),
        LinkError::NoResponse { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        LinkError::InvalidResponse { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        LinkError::DeviceReportedFailure { .. } => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        LinkError::Disconnected => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
    }
}

pub fn image_error(context: &str, err: ImageError) -> CliError {
    match err {
        ImageError::Io { source, path } => {
            io_error(&format!("{context}: {}", path.display()), source)
        }
        ImageError::OutOfBounds { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn boot_error(context: &str, err: BootError) -> CliError {
    match err {
        BootError::Link(err) => link_error(context, err),
        BootError::Image(err) => image_error(context, err),
        BootError::InvalidResponse { .. } | BootError::VerifyMismatch { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        BootError::UnknownDevice { .. } | BootError::BootFault { .. } => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        BootError::RegionMismatch { .. } | BootError::OutOfRange { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        BootError::NotIdentified => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}
