use std::fs;
use std::path::Path;

use crate::error::ImageError;

/// Value of an erased memory byte.
pub const ERASED: u8 = 0xFF;

/// In-memory mirror of a device memory region, organized in pages.
///
/// Created filled with [`ERASED`]. A page is blank when every byte is still
/// erased; blank pages are skipped when programming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryImage {
    bytes: Vec<u8>,
    page_size: usize,
}

impl MemoryImage {
    /// Create a blank image of `size` bytes. `size` must be a whole number of
    /// pages.
    pub fn new(size: usize, page_size: usize) -> Result<Self, ImageError> {
        if page_size == 0 || size % page_size != 0 {
            return Err(ImageError::InvalidGeometry { size, page_size });
        }
        Ok(Self {
            bytes: vec![ERASED; size],
            page_size,
        })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_count(&self) -> usize {
        self.bytes.len() / self.page_size
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Bytes of page `page`.
    pub fn page(&self, page: usize) -> Result<&[u8], ImageError> {
        let count = self.page_count();
        if page >= count {
            return Err(ImageError::PageOutOfRange { page, count });
        }
        let start = page * self.page_size;
        Ok(&self.bytes[start..start + self.page_size])
    }

    /// True if every byte of page `page` is erased.
    pub fn is_blank(&self, page: usize) -> Result<bool, ImageError> {
        Ok(self.page(page)?.iter().all(|b| *b == ERASED))
    }

    /// Page numbers holding data, in ascending order.
    pub fn non_blank_pages(&self) -> Vec<usize> {
        self.bytes
            .chunks(self.page_size)
            .enumerate()
            .filter(|(_, page)| page.iter().any(|b| *b != ERASED))
            .map(|(n, _)| n)
            .collect()
    }

    /// Copy `data` into the image at `address`.
    pub fn set(&mut self, address: usize, data: &[u8]) -> Result<(), ImageError> {
        let size = self.bytes.len();
        match address.checked_add(data.len()) {
            Some(end) if end <= size => {
                self.bytes[address..end].copy_from_slice(data);
                Ok(())
            }
            _ => Err(ImageError::OutOfBounds {
                address,
                len: data.len(),
                size,
            }),
        }
    }

    /// Load a raw binary file into the image at `offset`. Returns the number
    /// of bytes loaded.
    pub fn load_from_file(&mut self, path: &Path, offset: usize) -> Result<usize, ImageError> {
        let data = fs::read(path).map_err(|source| ImageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.set(offset, &data)?;
        tracing::debug!(path = %path.display(), offset, len = data.len(), "loaded image file");
        Ok(data.len())
    }

    /// Write the whole image to a raw binary file.
    pub fn dump_to_file(&self, path: &Path) -> Result<(), ImageError> {
        fs::write(path, &self.bytes).map_err(|source| ImageError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("mmp-image-{}-{name}", std::process::id()))
    }

    #[test]
    fn new_image_is_blank() {
        let image = MemoryImage::new(256, 64).unwrap();
        assert_eq!(image.page_count(), 4);
        for page in 0..4 {
            assert!(image.is_blank(page).unwrap());
        }
        assert!(image.non_blank_pages().is_empty());
    }

    #[test]
    fn set_marks_only_touched_page() {
        let mut image = MemoryImage::new(256, 64).unwrap();
        image.set(64, &[0u8; 64]).unwrap();

        assert!(image.is_blank(0).unwrap());
        assert!(!image.is_blank(1).unwrap());
        assert!(image.is_blank(2).unwrap());
        assert!(image.is_blank(3).unwrap());
        assert_eq!(image.non_blank_pages(), vec![1]);
        assert_eq!(image.page(1).unwrap(), &[0u8; 64][..]);
    }

    #[test]
    fn set_spanning_pages() {
        let mut image = MemoryImage::new(256, 64).unwrap();
        image.set(60, &[1u8; 8]).unwrap();
        assert_eq!(image.non_blank_pages(), vec![0, 1]);
    }

    #[test]
    fn set_past_end_is_rejected() {
        let mut image = MemoryImage::new(256, 64).unwrap();
        let err = image.set(250, &[0u8; 7]).unwrap_err();
        assert!(matches!(
            err,
            ImageError::OutOfBounds {
                address: 250,
                len: 7,
                size: 256
            }
        ));
        assert!(image.non_blank_pages().is_empty());
        image.set(250, &[0u8; 6]).unwrap();
    }

    #[test]
    fn page_out_of_range() {
        let image = MemoryImage::new(256, 64).unwrap();
        assert!(matches!(
            image.page(4),
            Err(ImageError::PageOutOfRange { page: 4, count: 4 })
        ));
        assert!(image.is_blank(9).is_err());
    }

    #[test]
    fn geometry_must_be_whole_pages() {
        assert!(MemoryImage::new(100, 64).is_err());
        assert!(MemoryImage::new(64, 0).is_err());
        assert!(MemoryImage::new(0, 64).unwrap().is_empty());
    }

    #[test]
    fn file_round_trip_with_offset() {
        let input = temp_path("in.bin");
        let output = temp_path("out.bin");
        fs::write(&input, [0xAB, 0xCD, 0xEF]).unwrap();

        let mut image = MemoryImage::new(128, 64).unwrap();
        assert_eq!(image.load_from_file(&input, 64).unwrap(), 3);
        assert_eq!(image.non_blank_pages(), vec![1]);

        image.dump_to_file(&output).unwrap();
        let dumped = fs::read(&output).unwrap();
        assert_eq!(dumped.len(), 128);
        assert_eq!(&dumped[64..67], &[0xAB, 0xCD, 0xEF]);
        assert_eq!(dumped[0], ERASED);

        let _ = fs::remove_file(&input);
        let _ = fs::remove_file(&output);
    }

    #[test]
    fn oversized_file_is_rejected() {
        let input = temp_path("big.bin");
        fs::write(&input, vec![0u8; 200]).unwrap();
        let mut image = MemoryImage::new(128, 64).unwrap();
        assert!(matches!(
            image.load_from_file(&input, 0),
            Err(ImageError::OutOfBounds { .. })
        ));
        let _ = fs::remove_file(&input);
    }

    #[test]
    fn missing_file_reports_path() {
        let path = temp_path("missing.bin");
        let mut image = MemoryImage::new(64, 64).unwrap();
        match image.load_from_file(&path, 0) {
            Err(ImageError::Io { path: p, .. }) => assert_eq!(p, path),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
