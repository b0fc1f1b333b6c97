use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use mmp_boot::{BootConfig, Bootloader, Region, BOOT_POLL_TIMEOUT, DEFAULT_BOOT_TIMEOUT};
use mmp_link::{Link, LinkConfig, LogSink, PING_COMMAND, VERSION_COMMAND};
use mmp_transport::SerialConfig;

use crate::exit::{link_error, CliResult};
use crate::output::{OutputFormat, PageProgress};

pub mod boot;
pub mod device;
pub mod monitor;
pub mod ports;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List serial ports on this host.
    Ports,
    /// Identify the device through its bootloader.
    Identify,
    /// Read a memory region into a raw binary file.
    Read(ReadArgs),
    /// Program a raw binary file into a memory region.
    Write(WriteArgs),
    /// Erase a memory region.
    Erase(EraseArgs),
    /// Leave the bootloader and start the application.
    Run,
    /// Ask the application firmware to reboot.
    Reboot,
    /// Ping the application firmware.
    Ping(PingArgs),
    /// Print the application firmware version.
    FwVersion(FwVersionArgs),
    /// Print device log lines and unsolicited frames.
    Monitor(MonitorArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, session: &Session, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Ports => ports::run(format),
        Command::Identify => boot::identify(session, format),
        Command::Read(args) => boot::read(args, session, format),
        Command::Write(args) => boot::write(args, session, format),
        Command::Erase(args) => boot::erase(args, session, format),
        Command::Run => boot::run_application(session, format),
        Command::Reboot => device::reboot(session, format),
        Command::Ping(args) => device::ping(args, session, format),
        Command::FwVersion(args) => device::fw_version(args, session, format),
        Command::Monitor(args) => monitor::run(args, session, format),
        Command::Version(args) => version::run(args),
    }
}

/// Connection settings shared by every device command.
#[derive(Debug, Clone)]
pub struct Session {
    pub port: String,
    pub baud: u32,
    pub timeout: Option<Duration>,
}

impl Session {
    fn serial_config(&self) -> SerialConfig {
        SerialConfig {
            baud: self.baud,
            ..SerialConfig::default()
        }
    }

    fn link_config(&self) -> LinkConfig {
        let mut config = LinkConfig::default();
        if let Some(timeout) = self.timeout {
            config.reply_timeout = timeout;
        }
        config
    }

    fn boot_link_config(&self) -> LinkConfig {
        LinkConfig {
            poll_timeout: BOOT_POLL_TIMEOUT,
            ..self.link_config()
        }
    }

    pub fn open_link(&self) -> CliResult<Link> {
        self.open_serial_link(self.link_config())
    }

    /// Link for bootloader commands, tolerating pauses inside page replies.
    pub fn open_boot_link(&self) -> CliResult<Link> {
        self.open_serial_link(self.boot_link_config())
    }

    fn open_serial_link(&self, config: LinkConfig) -> CliResult<Link> {
        Link::open_serial(&self.port, &self.serial_config(), config)
            .map_err(|err| link_error(&format!("cannot open {}", self.port), err))
    }

    pub fn open_link_with_sink<S: LogSink + 'static>(&self, sink: S) -> CliResult<Link> {
        let transport = mmp_transport::SerialTransport::open(&self.port, &self.serial_config())
            .map_err(|err| link_error(&format!("cannot open {}", self.port), err.into()))?;
        Link::open_with_sink(transport, self.link_config(), sink)
            .map_err(|err| link_error(&format!("cannot open {}", self.port), err))
    }

    /// Bootloader session over `link`, drawing page progress on `progress`.
    pub fn bootloader<'a>(
        &self,
        link: &'a mut Link,
        progress: &PageProgress,
    ) -> Bootloader<&'a mut Link> {
        let config = BootConfig {
            reply_timeout: self.timeout.unwrap_or(DEFAULT_BOOT_TIMEOUT),
        };
        Bootloader::with_config(link, config).with_progress(progress.observer())
    }
}

/// Parse a duration such as `5s`, `500ms` or a bare number of seconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("duration must not be empty".to_string());
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| format!("invalid duration: {input}"))?;
    if value == 0 {
        return Err("duration must be greater than zero".to_string());
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum RegionArg {
    Flash,
    Eeprom,
}

impl From<RegionArg> for Region {
    fn from(arg: RegionArg) -> Self {
        match arg {
            RegionArg::Flash => Region::Flash,
            RegionArg::Eeprom => Region::Eeprom,
        }
    }
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Region to read.
    pub region: RegionArg,
    /// Output file.
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Region to program.
    pub region: RegionArg,
    /// Raw binary image.
    pub file: PathBuf,
    /// Byte offset of the file within the region.
    #[arg(long, default_value_t = 0)]
    pub offset: usize,
    /// Skip reading written pages back.
    #[arg(long)]
    pub no_verify: bool,
}

#[derive(Args, Debug)]
pub struct EraseArgs {
    /// Region to erase.
    pub region: RegionArg,
}

#[derive(Args, Debug)]
pub struct PingArgs {
    /// Command number of the ping handler.
    #[arg(long, default_value_t = PING_COMMAND)]
    pub command: u8,
    /// Number of pings to send.
    #[arg(long, short = 'n', default_value_t = 1)]
    pub count: u32,
    /// Pause after each ping (e.g. 100ms).
    #[arg(long, value_parser = parse_duration)]
    pub delay: Option<Duration>,
}

#[derive(Args, Debug)]
pub struct FwVersionArgs {
    /// Command number of the version handler.
    #[arg(long, default_value_t = VERSION_COMMAND)]
    pub command: u8,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Exit after N events.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
