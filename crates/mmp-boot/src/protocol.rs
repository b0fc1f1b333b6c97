//! Bootloader opcodes and request layouts.
//!
//! Every request is one bootloader frame whose first byte is an ASCII opcode.
//! Addresses are little-endian `u16`, page numbers a single byte.

use std::fmt;

use serde::Serialize;

use crate::error::{BootError, Result};

pub const EEPROM_READ: u8 = b'e';
pub const EEPROM_WRITE: u8 = b'E';
pub const FLASH_ERASE: u8 = b'C';
pub const FLASH_READ: u8 = b'f';
pub const FLASH_WRITE: u8 = b'F';
pub const RUN_APPLICATION: u8 = b'R';
pub const VERSION_READ: u8 = b'V';

/// Write and erase replies carry this single byte on success.
pub const ACK: u8 = 1;

/// Bytes of an EEPROM write request before the data.
pub const EEPROM_WRITE_HEADER: usize = 4;

/// Device memory region addressed by a region operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    /// Application flash, below the boot section.
    Flash,
    Eeprom,
}

impl Region {
    pub fn name(self) -> &'static str {
        match self {
            Region::Flash => "flash",
            Region::Eeprom => "eeprom",
        }
    }

    pub(crate) fn read_opcode(self) -> u8 {
        match self {
            Region::Flash => FLASH_READ,
            Region::Eeprom => EEPROM_READ,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) fn page_byte(page: usize) -> Result<u8> {
    u8::try_from(page).map_err(|_| BootError::OutOfRange {
        what: "page",
        value: page,
    })
}

pub(crate) fn address_word(address: usize) -> Result<u16> {
    u16::try_from(address).map_err(|_| BootError::OutOfRange {
        what: "address",
        value: address,
    })
}

/// `[op, addr_lo, addr_hi, len]`
pub fn read_request(region: Region, address: u16, len: u8) -> [u8; 4] {
    let [lo, hi] = address.to_le_bytes();
    [region.read_opcode(), lo, hi, len]
}

/// `[op, addr_lo, addr_hi, len, data…]`
pub fn eeprom_write_request(address: u16, data: &[u8]) -> Result<Vec<u8>> {
    let len = u8::try_from(data.len()).map_err(|_| BootError::OutOfRange {
        what: "length",
        value: data.len(),
    })?;
    let [lo, hi] = address.to_le_bytes();
    let mut request = Vec::with_capacity(EEPROM_WRITE_HEADER + data.len());
    request.extend_from_slice(&[EEPROM_WRITE, lo, hi, len]);
    request.extend_from_slice(data);
    Ok(request)
}

/// `[op, page, data…]`
pub fn flash_write_request(page: u8, data: &[u8]) -> Vec<u8> {
    let mut request = Vec::with_capacity(2 + data.len());
    request.extend_from_slice(&[FLASH_WRITE, page]);
    request.extend_from_slice(data);
    request
}

/// `[op, page]`
pub fn flash_erase_request(page: u8) -> [u8; 2] {
    [FLASH_ERASE, page]
}
