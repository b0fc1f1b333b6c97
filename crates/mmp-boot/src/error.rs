use std::path::PathBuf;

use crate::protocol::Region;

/// Errors that can occur building or persisting a memory image.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// The image size is not a whole number of non-empty pages.
    #[error("invalid image geometry: {size} bytes in pages of {page_size}")]
    InvalidGeometry { size: usize, page_size: usize },

    /// Page number past the end of the image.
    #[error("page {page} out of range (image has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },

    /// Data would extend past the end of the image.
    #[error("{len} bytes at 0x{address:04x} exceed image size {size}")]
    OutOfBounds {
        address: usize,
        len: usize,
        size: usize,
    },

    /// Reading or writing an image file failed.
    #[error("image file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors that can occur in bootloader operations.
#[derive(Debug, thiserror::Error)]
pub enum BootError {
    /// A page operation was attempted before `identify()`.
    #[error("device not identified")]
    NotIdentified,

    /// The device signature has no known profile.
    #[error("unknown device signature {signature}")]
    UnknownDevice { signature: String },

    /// A reply did not have the expected shape.
    #[error("invalid {op} response: {reason}")]
    InvalidResponse { op: &'static str, reason: String },

    /// A page operation got no reply or a failure reply.
    #[error("{op} failed at page {page}: {reason}")]
    BootFault {
        op: &'static str,
        page: usize,
        reason: String,
    },

    /// Written pages read back different from what was written.
    #[error("verification failed for pages {pages:?}")]
    VerifyMismatch { pages: Vec<usize> },

    /// The image does not fit the target region.
    #[error("{region} image of {image_size} bytes does not fit region of {region_size} bytes")]
    RegionMismatch {
        region: Region,
        image_size: usize,
        region_size: usize,
    },

    /// A page number or address does not fit the request field.
    #[error("{what} {value} does not fit the bootloader request")]
    OutOfRange { what: &'static str, value: usize },

    /// Link-level error.
    #[error("link error: {0}")]
    Link(#[from] mmp_link::LinkError),

    /// Memory image error.
    #[error("image error: {0}")]
    Image(#[from] ImageError),
}

pub type Result<T> = std::result::Result<T, BootError>;
