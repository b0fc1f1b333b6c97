mod cmd;
mod exit;
mod logging;
mod output;

use std::time::Duration;

use clap::Parser;

use crate::cmd::{parse_duration, Command, Session};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "mmp", version, about = "MCU message protocol host tool")]
struct Cli {
    /// Serial port the device is attached to.
    #[arg(
        long,
        short = 'p',
        env = "MMP_PORT",
        default_value = "/dev/ttyUSB0",
        global = true
    )]
    port: String,

    /// Serial line speed.
    #[arg(long, short = 'b', env = "MMP_BAUD", default_value_t = 38_400, global = true)]
    baud: u32,

    /// Reply timeout (e.g. 1s, 500ms). Defaults to 500ms for commands and 1s
    /// for bootloader requests.
    #[arg(long, value_name = "DURATION", value_parser = parse_duration, global = true)]
    timeout: Option<Duration>,

    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// Minimum level for log lines printed by the device.
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    device_log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level, cli.device_log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let session = Session {
        port: cli.port,
        baud: cli.baud,
        timeout: cli.timeout,
    };
    let result = cmd::run(cli.command, &session, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::RegionArg;

    #[test]
    fn parses_write_subcommand() {
        let cli = Cli::try_parse_from([
            "mmp",
            "--port",
            "/dev/ttyACM0",
            "write",
            "flash",
            "app.bin",
            "--offset",
            "256",
            "--no-verify",
        ])
        .expect("write args should parse");

        assert_eq!(cli.port, "/dev/ttyACM0");
        match cli.command {
            Command::Write(args) => {
                assert_eq!(args.region, RegionArg::Flash);
                assert_eq!(args.offset, 256);
                assert!(args.no_verify);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from(["mmp", "identify", "--baud", "115200", "--timeout", "2s"])
            .expect("identify args should parse");
        assert_eq!(cli.baud, 115_200);
        assert_eq!(cli.timeout, Some(Duration::from_secs(2)));
        assert!(matches!(cli.command, Command::Identify));
    }

    #[test]
    fn rejects_unknown_region() {
        let err = Cli::try_parse_from(["mmp", "read", "sram", "out.bin"])
            .expect_err("unknown region should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = Cli::try_parse_from(["mmp", "run", "--timeout", "0ms"])
            .expect_err("zero timeout should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn ping_defaults() {
        let cli = Cli::try_parse_from(["mmp", "ping"]).expect("ping should parse");
        match cli.command {
            Command::Ping(args) => {
                assert_eq!(args.command, 0);
                assert_eq!(args.count, 1);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
