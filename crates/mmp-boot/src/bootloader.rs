use std::fmt;
use std::path::Path;
use std::time::Duration;

use mmp_frame::{Frame, BOOT, MAX_PAYLOAD};
use mmp_link::{Exchange, LinkError};
use serde::Serialize;

use crate::device::{lookup_profile, part_name, signature_hex};
use crate::error::{BootError, Result};
use crate::image::{MemoryImage, ERASED};
use crate::protocol::{
    address_word, eeprom_write_request, flash_erase_request, flash_write_request, page_byte,
    read_request, Region, ACK, EEPROM_WRITE_HEADER, RUN_APPLICATION, VERSION_READ,
};

/// Default wait for each bootloader reply.
pub const DEFAULT_BOOT_TIMEOUT: Duration = Duration::from_secs(1);

/// Reader byte poll for links that talk to the bootloader. The bootloader
/// may pause mid-reply while it reads or programs a page.
pub const BOOT_POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Bootloader session configuration.
#[derive(Debug, Clone)]
pub struct BootConfig {
    /// Wait for each page operation's reply. Default: 1s.
    pub reply_timeout: Duration,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            reply_timeout: DEFAULT_BOOT_TIMEOUT,
        }
    }
}

/// What `identify()` learned about the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// Signature as uppercase hex, e.g. `1E950F`.
    pub signature: String,
    /// Exact part name, when the full signature is known.
    pub part: Option<&'static str>,
    /// Name of the profile supplying the memory geometry.
    pub family: &'static str,
    pub flash_size: usize,
    pub page_size: usize,
    pub eeprom_size: usize,
    /// First page of the boot section.
    pub boot_page: u8,
    /// First byte of the boot section; application flash ends here.
    pub boot_address: usize,
    /// Bootloader version string.
    pub version: String,
}

impl DeviceInfo {
    /// Number of pages a region operation covers.
    pub fn region_pages(&self, region: Region) -> usize {
        match region {
            Region::Flash => self.boot_page as usize,
            Region::Eeprom => self.eeprom_size / self.page_size,
        }
    }

    pub fn region_size(&self, region: Region) -> usize {
        self.region_pages(region) * self.page_size
    }
}

/// Step of a region operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Erase,
    Read,
    Write,
    Verify,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::Erase => "erase",
            Operation::Read => "read",
            Operation::Write => "write",
            Operation::Verify => "verify",
        }
    }
}

/// Emitted after each page of a region operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub op: Operation,
    pub region: Region,
    /// Page just completed.
    pub page: usize,
    /// Pages completed so far, including this one.
    pub done: usize,
    pub total: usize,
}

/// Outcome of a region write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    pub region: Region,
    /// Non-blank pages that were programmed.
    pub pages_written: Vec<usize>,
    pub verified: bool,
    /// Pages whose read-back differed from the image.
    pub mismatched_pages: Vec<usize>,
    /// Region offset of the first byte that read back differently.
    pub first_difference: Option<usize>,
}

impl WriteReport {
    pub fn is_success(&self) -> bool {
        self.mismatched_pages.is_empty()
    }

    /// Turn recorded mismatches into [`BootError::VerifyMismatch`].
    pub fn ensure_verified(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(BootError::VerifyMismatch {
                pages: self.mismatched_pages,
            })
        }
    }
}

type ProgressFn = Box<dyn FnMut(&Progress)>;

/// Bootloader session over a request/reply exchange.
///
/// [`identify`](Self::identify) must succeed before any page operation; it
/// supplies the page size and region extents every operation is sized from.
pub struct Bootloader<E> {
    link: E,
    config: BootConfig,
    device: Option<DeviceInfo>,
    progress: Option<ProgressFn>,
}

impl<E: Exchange> Bootloader<E> {
    pub fn new(link: E) -> Self {
        Self::with_config(link, BootConfig::default())
    }

    pub fn with_config(link: E, config: BootConfig) -> Self {
        Self {
            link,
            config,
            device: None,
            progress: None,
        }
    }

    /// Call `observer` after every page of a region operation.
    pub fn with_progress(mut self, observer: impl FnMut(&Progress) + 'static) -> Self {
        self.progress = Some(Box::new(observer));
        self
    }

    /// Device information, once identified.
    pub fn device(&self) -> Option<&DeviceInfo> {
        self.device.as_ref()
    }

    pub fn link_mut(&mut self) -> &mut E {
        &mut self.link
    }

    pub fn into_inner(self) -> E {
        self.link
    }

    /// Read the bootloader version and device signature and load the
    /// matching device profile.
    pub fn identify(&mut self) -> Result<&DeviceInfo> {
        let reply = self.request(&[VERSION_READ])?;
        let data = reply.data.as_ref();

        if data.first() != Some(&VERSION_READ) {
            return Err(BootError::InvalidResponse {
                op: "identify",
                reason: "reply does not echo the version opcode".to_string(),
            });
        }
        if data.len() < 5 {
            return Err(BootError::InvalidResponse {
                op: "identify",
                reason: format!("reply has {} bytes, expected at least 5", data.len()),
            });
        }

        let signature = signature_hex(&data[1..4]);
        let profile = lookup_profile(&signature).ok_or_else(|| BootError::UnknownDevice {
            signature: signature.clone(),
        })?;
        let boot_page = data[4];
        let version = String::from_utf8_lossy(&data[5..])
            .trim_end_matches('\0')
            .to_string();

        let info = DeviceInfo {
            part: part_name(&signature),
            signature,
            family: profile.name,
            flash_size: profile.flash_size,
            page_size: profile.page_size,
            eeprom_size: profile.eeprom_size,
            boot_page,
            boot_address: boot_page as usize * profile.page_size,
            version,
        };
        tracing::info!(
            signature = %info.signature,
            part = info.part.unwrap_or(info.family),
            boot_page,
            version = %info.version,
            "identified device"
        );
        Ok(&*self.device.insert(info))
    }

    /// Erase every application flash page, below the boot section.
    pub fn erase_flash(&mut self) -> Result<()> {
        let (_, pages) = self.geometry(Region::Flash)?;
        for page in 0..pages {
            let reply = self.page_request("erase", page, &flash_erase_request(page_byte(page)?))?;
            expect_ack("erase", page, &reply)?;
            tracing::debug!(page, "erased flash page");
            self.report(Operation::Erase, Region::Flash, page, page + 1, pages);
        }
        Ok(())
    }

    /// Erase the EEPROM by writing erased bytes to every page.
    pub fn erase_eeprom(&mut self) -> Result<()> {
        let (page_size, pages) = self.geometry(Region::Eeprom)?;
        let blank = vec![ERASED; page_size];
        for page in 0..pages {
            self.write_eeprom_page(page, page_size, &blank)?;
            tracing::debug!(page, "erased eeprom page");
            self.report(Operation::Erase, Region::Eeprom, page, page + 1, pages);
        }
        Ok(())
    }

    /// A blank image with the geometry of `region`.
    pub fn new_image(&self, region: Region) -> Result<MemoryImage> {
        let (page_size, pages) = self.geometry(region)?;
        Ok(MemoryImage::new(pages * page_size, page_size)?)
    }

    /// Read a whole region into a fresh image.
    pub fn read_region(&mut self, region: Region) -> Result<MemoryImage> {
        let (page_size, pages) = self.geometry(region)?;
        let mut image = MemoryImage::new(pages * page_size, page_size)?;
        for page in 0..pages {
            let data = self.read_page(region, page, page_size)?;
            image.set(page * page_size, &data)?;
            tracing::debug!(%region, page, "read page");
            self.report(Operation::Read, region, page, page + 1, pages);
        }
        tracing::info!(%region, pages, "region read");
        Ok(image)
    }

    /// Program the non-blank pages of `image`, then optionally read them back.
    ///
    /// A page that cannot be written aborts the operation. Read-back
    /// differences are collected in the report.
    pub fn write_region(
        &mut self,
        region: Region,
        image: &MemoryImage,
        verify: bool,
    ) -> Result<WriteReport> {
        let (page_size, pages) = self.geometry(region)?;
        let region_size = pages * page_size;
        if image.page_size() != page_size || image.len() > region_size {
            return Err(BootError::RegionMismatch {
                region,
                image_size: image.len(),
                region_size,
            });
        }

        let written = image.non_blank_pages();
        let total = written.len();
        for (i, &page) in written.iter().enumerate() {
            let data = image.page(page)?;
            match region {
                Region::Flash => self.write_flash_page(page, data)?,
                Region::Eeprom => self.write_eeprom_page(page, page_size, data)?,
            }
            tracing::debug!(%region, page, "wrote page");
            self.report(Operation::Write, region, page, i + 1, total);
        }

        let mut mismatched = Vec::new();
        let mut first_difference = None;
        if verify {
            for (i, &page) in written.iter().enumerate() {
                let actual = self.read_page(region, page, page_size)?;
                let expected = image.page(page)?;
                if let Some(at) = actual.iter().zip(expected).position(|(a, e)| a != e) {
                    tracing::warn!(%region, page, offset = at, "verification failed");
                    first_difference.get_or_insert(page * page_size + at);
                    mismatched.push(page);
                }
                self.report(Operation::Verify, region, page, i + 1, total);
            }
        }

        tracing::info!(
            %region,
            pages = total,
            verified = verify,
            mismatches = mismatched.len(),
            "region written"
        );
        Ok(WriteReport {
            region,
            pages_written: written,
            verified: verify,
            mismatched_pages: mismatched,
            first_difference,
        })
    }

    /// Leave the bootloader and start the application.
    pub fn run_application(&mut self) -> Result<()> {
        let reply = self.request(&[RUN_APPLICATION])?;
        if reply.data[..] != [RUN_APPLICATION] {
            return Err(BootError::InvalidResponse {
                op: "run",
                reason: format!("unexpected reply {:?}", reply.data),
            });
        }
        tracing::info!("application started");
        Ok(())
    }

    /// Read a region and save it as a raw binary file.
    pub fn dump_region(&mut self, region: Region, path: &Path) -> Result<MemoryImage> {
        let image = self.read_region(region)?;
        image.dump_to_file(path)?;
        Ok(image)
    }

    /// Program a raw binary file into a region, starting `offset` bytes in.
    pub fn write_file(
        &mut self,
        region: Region,
        path: &Path,
        offset: usize,
        verify: bool,
    ) -> Result<WriteReport> {
        let mut image = self.new_image(region)?;
        image.load_from_file(path, offset)?;
        self.write_region(region, &image, verify)
    }

    fn geometry(&self, region: Region) -> Result<(usize, usize)> {
        let device = self.device.as_ref().ok_or(BootError::NotIdentified)?;
        Ok((device.page_size, device.region_pages(region)))
    }

    fn request(&mut self, data: &[u8]) -> std::result::Result<Frame, LinkError> {
        self.link.exchange(BOOT, data, self.config.reply_timeout)
    }

    fn page_request(&mut self, op: &'static str, page: usize, data: &[u8]) -> Result<Frame> {
        match self.request(data) {
            Ok(frame) => Ok(frame),
            Err(LinkError::NoResponse { .. }) => Err(BootError::BootFault {
                op,
                page,
                reason: "no response from device".to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    fn read_page(&mut self, region: Region, page: usize, page_size: usize) -> Result<Vec<u8>> {
        let base = page * page_size;
        let mut data = Vec::with_capacity(page_size);
        while data.len() < page_size {
            let len = (page_size - data.len()).min(MAX_PAYLOAD);
            let address = address_word(base + data.len())?;
            let reply = self.page_request("read", page, &read_request(region, address, len as u8))?;
            if reply.len() != len {
                return Err(BootError::BootFault {
                    op: "read",
                    page,
                    reason: format!("got {} of {len} bytes", reply.len()),
                });
            }
            data.extend_from_slice(&reply.data);
        }
        Ok(data)
    }

    fn write_flash_page(&mut self, page: usize, data: &[u8]) -> Result<()> {
        let request = flash_write_request(page_byte(page)?, data);
        let reply = self.page_request("write", page, &request)?;
        expect_ack("write", page, &reply)
    }

    fn write_eeprom_page(&mut self, page: usize, page_size: usize, data: &[u8]) -> Result<()> {
        let base = page * page_size;
        for (i, chunk) in data.chunks(MAX_PAYLOAD - EEPROM_WRITE_HEADER).enumerate() {
            let offset = i * (MAX_PAYLOAD - EEPROM_WRITE_HEADER);
            let request = eeprom_write_request(address_word(base + offset)?, chunk)?;
            let reply = self.page_request("eeprom write", page, &request)?;
            expect_ack("eeprom write", page, &reply)?;
        }
        Ok(())
    }

    fn report(&mut self, op: Operation, region: Region, page: usize, done: usize, total: usize) {
        if let Some(observer) = self.progress.as_mut() {
            observer(&Progress {
                op,
                region,
                page,
                done,
                total,
            });
        }
    }
}

fn expect_ack(op: &'static str, page: usize, reply: &Frame) -> Result<()> {
    match reply.data.as_ref() {
        [ACK] => Ok(()),
        [status] => Err(BootError::BootFault {
            op,
            page,
            reason: format!("device reported failure (status {status})"),
        }),
        other => Err(BootError::BootFault {
            op,
            page,
            reason: format!("invalid reply of {} bytes", other.len()),
        }),
    }
}

impl<E> fmt::Debug for Bootloader<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bootloader")
            .field("config", &self.config)
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}
