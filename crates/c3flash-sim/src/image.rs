//! Loading and saving raw flash images

use std::fs;
use std::path::Path;

use c3flash_core::layout::FLASH_SIZE;

use crate::{SimConfig, SimFlash};

/// Image file errors
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// The file could not be read or written
    #[error("image I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is larger than the chip
    #[error("image is {actual} bytes, the chip holds {expected}")]
    ImageSize { expected: usize, actual: usize },
}

impl SimFlash {
    /// Build a chip from an image file
    ///
    /// A short image fills the start of the chip and leaves the rest erased.
    pub fn load_image(config: SimConfig, path: impl AsRef<Path>) -> Result<Self, ImageError> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        if bytes.len() > FLASH_SIZE as usize {
            return Err(ImageError::ImageSize {
                expected: FLASH_SIZE as usize,
                actual: bytes.len(),
            });
        }
        log::debug!("sim: loaded {} bytes from {}", bytes.len(), path.display());
        Ok(Self::with_data(config, &bytes))
    }

    /// Write the full memory contents to `path`
    pub fn save_image(&self, path: impl AsRef<Path>) -> Result<(), ImageError> {
        let path = path.as_ref();
        fs::write(path, self.data())?;
        log::debug!("sim: saved image to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_image_leaves_rest_erased() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.bin");
        fs::write(&path, [0x12, 0x34]).unwrap();

        let flash = SimFlash::load_image(SimConfig::default(), &path).unwrap();
        assert_eq!(&flash.data()[..3], &[0x12, 0x34, 0xFF]);
        assert_eq!(flash.data().len(), FLASH_SIZE as usize);
    }

    #[test]
    fn test_oversized_image_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        fs::write(&path, vec![0u8; FLASH_SIZE as usize + 1]).unwrap();

        let err = SimFlash::load_image(SimConfig::default(), &path).unwrap_err();
        assert!(matches!(err, ImageError::ImageSize { actual, .. } if actual == FLASH_SIZE as usize + 1));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flash.bin");
        let mut flash = SimFlash::new_default();
        flash.data_mut()[0x1234] = 0x5A;
        flash.save_image(&path).unwrap();

        let restored = SimFlash::load_image(SimConfig::default(), &path).unwrap();
        assert_eq!(restored.data()[0x1234], 0x5A);
    }
}
