use std::path::PathBuf;

use mmp_boot::{DeviceInfo, Region, WriteReport};
use serde::Serialize;

use crate::cmd::{EraseArgs, ReadArgs, Session, WriteArgs};
use crate::exit::{boot_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_record, OutputFormat, PageProgress};

pub fn identify(session: &Session, format: OutputFormat) -> CliResult<i32> {
    let mut link = session.open_boot_link()?;
    let progress = PageProgress::new();
    let mut boot = session.bootloader(&mut link, &progress);
    let device = boot
        .identify()
        .map_err(|err| boot_error("identify failed", err))?;

    print_device(device, format);
    Ok(SUCCESS)
}

fn print_device(device: &DeviceInfo, format: OutputFormat) {
    let fields = [
        ("signature", device.signature.clone()),
        ("part", device.part.unwrap_or("unknown").to_string()),
        ("family", device.family.to_string()),
        ("flash", format!("{} bytes", device.flash_size)),
        ("page size", format!("{} bytes", device.page_size)),
        ("eeprom", format!("{} bytes", device.eeprom_size)),
        (
            "boot section",
            format!("page {} (0x{:04x})", device.boot_page, device.boot_address),
        ),
        ("bootloader", device.version.clone()),
    ];
    print_record("Device", device, &fields, format);
}

#[derive(Serialize)]
struct ReadOutput {
    region: Region,
    file: PathBuf,
    size: usize,
    pages: usize,
    non_blank_pages: usize,
}

pub fn read(args: ReadArgs, session: &Session, format: OutputFormat) -> CliResult<i32> {
    let region = Region::from(args.region);
    let mut link = session.open_boot_link()?;
    let progress = PageProgress::new();
    let mut boot = session.bootloader(&mut link, &progress);
    boot.identify()
        .map_err(|err| boot_error("identify failed", err))?;

    let image = boot
        .dump_region(region, &args.file)
        .map_err(|err| boot_error(&format!("{region} read failed"), err))?;
    progress.finish();

    let out = ReadOutput {
        region,
        file: args.file,
        size: image.len(),
        pages: image.page_count(),
        non_blank_pages: image.non_blank_pages().len(),
    };
    let fields = [
        ("region", region.to_string()),
        ("file", out.file.display().to_string()),
        ("size", format!("{} bytes", out.size)),
        ("pages", format!("{} ({} non-blank)", out.pages, out.non_blank_pages)),
    ];
    print_record("Read", &out, &fields, format);
    Ok(SUCCESS)
}

pub fn write(args: WriteArgs, session: &Session, format: OutputFormat) -> CliResult<i32> {
    let region = Region::from(args.region);
    let mut link = session.open_boot_link()?;
    let progress = PageProgress::new();
    let mut boot = session.bootloader(&mut link, &progress);
    boot.identify()
        .map_err(|err| boot_error("identify failed", err))?;

    let report = boot
        .write_file(region, &args.file, args.offset, !args.no_verify)
        .map_err(|err| boot_error(&format!("{region} write failed"), err))?;
    progress.finish();

    print_report(&report, format);
    if !report.is_success() {
        return Err(CliError::new(
            DATA_INVALID,
            format!(
                "{region} verification failed for pages {:?}",
                report.mismatched_pages
            ),
        ));
    }
    Ok(SUCCESS)
}

fn print_report(report: &WriteReport, format: OutputFormat) {
    let verify = match (report.verified, report.is_success()) {
        (false, _) => "skipped".to_string(),
        (true, true) => "ok".to_string(),
        (true, false) => format!(
            "mismatched pages {:?}, first at 0x{:04x}",
            report.mismatched_pages,
            report.first_difference.unwrap_or_default()
        ),
    };
    let fields = [
        ("region", report.region.to_string()),
        ("pages written", report.pages_written.len().to_string()),
        ("verify", verify),
    ];
    print_record("Write", report, &fields, format);
}

#[derive(Serialize)]
struct EraseOutput {
    region: Region,
    pages: usize,
}

pub fn erase(args: EraseArgs, session: &Session, format: OutputFormat) -> CliResult<i32> {
    let region = Region::from(args.region);
    let mut link = session.open_boot_link()?;
    let progress = PageProgress::new();
    let mut boot = session.bootloader(&mut link, &progress);
    let pages = boot
        .identify()
        .map_err(|err| boot_error("identify failed", err))?
        .region_pages(region);

    match region {
        Region::Flash => boot.erase_flash(),
        Region::Eeprom => boot.erase_eeprom(),
    }
    .map_err(|err| boot_error(&format!("{region} erase failed"), err))?;
    progress.finish();

    let out = EraseOutput { region, pages };
    let fields = [
        ("region", region.to_string()),
        ("pages erased", pages.to_string()),
    ];
    print_record("Erase", &out, &fields, format);
    Ok(SUCCESS)
}

#[derive(Serialize)]
struct RunOutput {
    started: bool,
}

pub fn run_application(session: &Session, format: OutputFormat) -> CliResult<i32> {
    let mut link = session.open_boot_link()?;
    let progress = PageProgress::new();
    session
        .bootloader(&mut link, &progress)
        .run_application()
        .map_err(|err| boot_error("run failed", err))?;

    let out = RunOutput { started: true };
    print_record(
        "Run",
        &out,
        &[("application", "started".to_string())],
        format,
    );
    Ok(SUCCESS)
}
