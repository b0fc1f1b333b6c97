//! Thin wrappers for commands every MMP firmware implements.

use std::thread;
use std::time::Duration;

use serde::Serialize;

use crate::error::{LinkError, Result};
use crate::traits::Invoke;

/// Command number of the firmware's ping handler.
pub const PING_COMMAND: u8 = 0;

/// Command number of the firmware's version handler.
pub const VERSION_COMMAND: u8 = 1;

/// Ping the device once.
///
/// The device must answer with the id it was sent followed by `id + 1`.
pub fn ping<I: Invoke + ?Sized>(invoker: &mut I, command: u8, id: u8) -> Result<()> {
    let reply = invoker.invoke(command, None, &[id])?;
    match reply.data.as_ref() {
        [echo, next, ..] if *echo == id && *next == id.wrapping_add(1) => Ok(()),
        [echo, next, ..] => Err(LinkError::InvalidResponse {
            command,
            reason: format!("ping {id} answered with {echo}, {next}"),
        }),
        _ => Err(LinkError::InvalidResponse {
            command,
            reason: format!("ping reply has {} data bytes", reply.data.len()),
        }),
    }
}

/// Outcome counts of a ping series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PingSummary {
    pub successes: u32,
    /// Wrong answers and device-reported failures.
    pub errors: u32,
    pub timeouts: u32,
}

impl PingSummary {
    pub fn total(&self) -> u32 {
        self.successes + self.errors + self.timeouts
    }
}

/// Ping `count` times, ids counting down to zero, pausing `delay` after each.
///
/// Per-ping failures are tallied, not returned. Only a dead link aborts.
pub fn ping_many<I: Invoke + ?Sized>(
    invoker: &mut I,
    command: u8,
    count: u32,
    delay: Duration,
) -> Result<PingSummary> {
    let mut summary = PingSummary::default();
    for i in (0..count).rev() {
        let id = (i % 256) as u8;
        match ping(invoker, command, id) {
            Ok(()) => summary.successes += 1,
            Err(LinkError::NoResponse { .. }) => summary.timeouts += 1,
            Err(
                err @ (LinkError::InvalidResponse { .. } | LinkError::DeviceReportedFailure { .. }),
            ) => {
                tracing::warn!(id, error = %err, "ping failed");
                summary.errors += 1;
            }
            Err(err) => return Err(err),
        }
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }
    Ok(summary)
}

/// Firmware build identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FirmwareVersion {
    /// Application version, e.g. `c1b1-3-g26e2f24`.
    pub app: String,
    /// Support library version.
    pub lib: String,
}

/// Read the firmware's `"<app> <lib>"` version string.
pub fn firmware_version<I: Invoke + ?Sized>(
    invoker: &mut I,
    command: u8,
) -> Result<FirmwareVersion> {
    let reply = invoker.invoke(command, None, &[])?;
    let text = String::from_utf8_lossy(&reply.data);
    match text.trim_end_matches('\0').split_once(' ') {
        Some((app, lib)) if !app.is_empty() && !lib.contains(' ') => Ok(FirmwareVersion {
            app: app.to_string(),
            lib: lib.to_string(),
        }),
        _ => Err(LinkError::InvalidResponse {
            command,
            reason: format!("unexpected version string {text:?}"),
        }),
    }
}
