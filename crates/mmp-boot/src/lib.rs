//! AVR bootloader protocol over an MMP link.
//!
//! A [`Bootloader`] session starts with [`Bootloader::identify`], which reads
//! the device signature and boot-section start and selects a
//! [`DeviceProfile`]. Region operations then erase, read, write and verify
//! application flash or EEPROM page by page, using a [`MemoryImage`] as the
//! working copy.

pub mod bootloader;
pub mod device;
pub mod error;
pub mod image;
pub mod protocol;

pub use bootloader::{
    BootConfig, Bootloader, DeviceInfo, Operation, Progress, WriteReport, BOOT_POLL_TIMEOUT,
    DEFAULT_BOOT_TIMEOUT,
};
pub use device::{lookup_profile, part_name, profiles, signature_hex, DeviceProfile};
pub use error::{BootError, ImageError, Result};
pub use image::{MemoryImage, ERASED};
pub use protocol::Region;
