use clap::ValueEnum;
use mmp_link::MCU_LOG_TARGET;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Host diagnostics at `level`; device log lines, which arrive under
/// [`MCU_LOG_TARGET`], at `device_level`.
fn filter(level: LogLevel, device_level: LogLevel) -> Targets {
    Targets::new()
        .with_default(level.as_filter())
        .with_target(MCU_LOG_TARGET, device_level.as_filter())
}

pub fn init_logging(format: LogFormat, level: LogLevel, device_level: LogLevel) {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false);
    let registry = tracing_subscriber::registry().with(filter(level, device_level));

    match format {
        LogFormat::Text => {
            let _ = registry.with(layer.with_target(true)).try_init();
        }
        LogFormat::Json => {
            let _ = registry.with(layer.json()).try_init();
        }
    }
}
