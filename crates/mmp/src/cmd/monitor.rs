use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mmp_frame::{Frame, LogLine};
use mmp_link::ChannelLogSink;
use serde::Serialize;

use crate::cmd::{MonitorArgs, Session};
use crate::exit::{link_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{payload_preview, print_json, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Serialize, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum MonitorEvent {
    Log { text: String, truncated: bool },
    Frame { flags: u8, size: usize, payload: String },
}

impl MonitorEvent {
    fn log(line: &LogLine) -> Self {
        Self::Log {
            text: line.to_string_lossy(),
            truncated: line.truncated,
        }
    }

    fn frame(frame: &Frame) -> Self {
        Self::Frame {
            flags: frame.flags,
            size: frame.len(),
            payload: payload_preview(&frame.data),
        }
    }

    fn print(&self, format: OutputFormat) {
        match format {
            OutputFormat::Json => print_json(self),
            OutputFormat::Table | OutputFormat::Pretty => match self {
                Self::Log { text, truncated } => {
                    let marker = if *truncated { " [truncated]" } else { "" };
                    println!("log    {text}{marker}");
                }
                Self::Frame {
                    flags,
                    size,
                    payload,
                } => println!("frame  flags=0x{flags:02x} size={size} {payload}"),
            },
        }
    }
}

pub fn run(args: MonitorArgs, session: &Session, format: OutputFormat) -> CliResult<i32> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))
        .map_err(|err| CliError::new(INTERNAL, format!("cannot install signal handler: {err}")))?;

    let (sink, lines) = ChannelLogSink::new();
    let link = session.open_link_with_sink(sink)?;
    tracing::info!(port = %session.port, "monitoring");

    let mut seen = 0usize;
    while running.load(Ordering::SeqCst) && !limit_reached(args.count, seen) {
        let mut events: Vec<MonitorEvent> =
            lines.try_iter().map(|line| MonitorEvent::log(&line)).collect();
        let frame = link
            .recv_async_timeout(POLL_INTERVAL)
            .map_err(|err| link_error("monitor stopped", err))?;
        events.extend(frame.iter().map(MonitorEvent::frame));
        events.extend(link.drain_async().iter().map(MonitorEvent::frame));

        for event in events {
            if limit_reached(args.count, seen) {
                break;
            }
            event.print(format);
            seen += 1;
        }
    }

    let stats = link.close();
    tracing::info!(events = seen, ?stats, "monitor finished");
    Ok(SUCCESS)
}

fn limit_reached(count: Option<usize>, seen: usize) -> bool {
    count.is_some_and(|limit| seen >= limit)
}
