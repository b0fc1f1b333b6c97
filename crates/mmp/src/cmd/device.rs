use std::time::Duration;

use mmp_link::{firmware_version, ping_many, PingSummary};
use serde::Serialize;

use crate::cmd::{FwVersionArgs, PingArgs, Session};
use crate::exit::{link_error, CliResult, FAILURE, SUCCESS, TIMEOUT};
use crate::output::{print_record, OutputFormat};

#[derive(Serialize)]
struct RebootOutput {
    requested: bool,
}

pub fn reboot(session: &Session, format: OutputFormat) -> CliResult<i32> {
    let mut link = session.open_link()?;
    link.reboot_device()
        .map_err(|err| link_error("reboot failed", err))?;

    let out = RebootOutput { requested: true };
    print_record("Reboot", &out, &[("reboot", "requested".to_string())], format);
    Ok(SUCCESS)
}

pub fn ping(args: PingArgs, session: &Session, format: OutputFormat) -> CliResult<i32> {
    let mut link = session.open_link()?;
    let summary = ping_many(
        &mut link,
        args.command,
        args.count,
        args.delay.unwrap_or(Duration::ZERO),
    )
    .map_err(|err| link_error("ping failed", err))?;

    let stats = link.close();
    tracing::debug!(?stats, "link closed");

    let fields = [
        ("sent", summary.total().to_string()),
        ("ok", summary.successes.to_string()),
        ("errors", summary.errors.to_string()),
        ("timeouts", summary.timeouts.to_string()),
    ];
    print_record("Ping", &summary, &fields, format);
    Ok(ping_exit_code(&summary))
}

fn ping_exit_code(summary: &PingSummary) -> i32 {
    if summary.successes == summary.total() {
        SUCCESS
    } else if summary.timeouts == summary.total() {
        TIMEOUT
    } else {
        FAILURE
    }
}

pub fn fw_version(args: FwVersionArgs, session: &Session, format: OutputFormat) -> CliResult<i32> {
    let mut link = session.open_link()?;
    let version = firmware_version(&mut link, args.command)
        .map_err(|err| link_error("version query failed", err))?;

    let fields = [
        ("application", version.app.clone()),
        ("library", version.lib.clone()),
    ];
    print_record("Firmware", &version, &fields, format);
    Ok(SUCCESS)
}
