//! Bitmap provisioning manifest
//!
//! Lists the raw RGB565 images to append to the bitmap table, in index
//! order:
//!
//! ```toml
//! [[bitmap]]
//! name = "splash"
//! file = "bitmaps/splash.raw"
//! width = 480
//! height = 320
//!
//! [[bitmap]]
//! file = "bitmaps/button.raw"
//! width = 96
//! height = 40
//! ```
//!
//! Relative `file` paths are resolved against the manifest's directory.

use std::fs;
use std::path::{Path, PathBuf};

use c3flash_core::layout::{pages_for_bytes, MAX_BITMAPS};
use serde::Deserialize;
use thiserror::Error;

/// Manifest errors
#[derive(Debug, Error)]
pub enum ManifestError {
    /// A file could not be read
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest is not valid TOML or has the wrong shape
    #[error("Invalid manifest: {0}")]
    Parse(#[from] toml::de::Error),

    /// More entries than the table can hold
    #[error("Manifest lists {0} bitmaps, the table holds at most {max}", max = MAX_BITMAPS)]
    TooMany(usize),

    /// A bitmap with no pixels
    #[error("Bitmap {index} has a zero dimension ({width}x{height})")]
    EmptyBitmap { index: usize, width: u16, height: u16 },

    /// Pixel file size does not match the dimensions
    #[error("'{path}' is {actual} bytes, {width}x{height} RGB565 needs {expected}")]
    SizeMismatch {
        path: PathBuf,
        width: u16,
        height: u16,
        expected: usize,
        actual: usize,
    },
}

/// One bitmap to provision
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BitmapSpec {
    /// Label for progress output
    #[serde(default)]
    pub name: Option<String>,
    /// Raw RGB565 pixel file
    pub file: PathBuf,
    /// Width in pixels
    pub width: u16,
    /// Height in pixels
    pub height: u16,
}

impl BitmapSpec {
    /// Size of the pixel data in bytes
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * 2
    }

    /// Flash pages the pixel data occupies
    pub fn pages(&self) -> u64 {
        pages_for_bytes(self.byte_len() as u64)
    }

    /// Name to show the user
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.file.display().to_string(),
        }
    }

    /// Read the pixel file and check its size
    pub fn load_pixels(&self) -> Result<Vec<u8>, ManifestError> {
        let pixels = fs::read(&self.file).map_err(|source| ManifestError::Io {
            path: self.file.clone(),
            source,
        })?;
        if pixels.len() != self.byte_len() {
            return Err(ManifestError::SizeMismatch {
                path: self.file.clone(),
                width: self.width,
                height: self.height,
                expected: self.byte_len(),
                actual: pixels.len(),
            });
        }
        Ok(pixels)
    }
}

/// Parsed manifest
#[derive(Debug, Default, Deserialize)]
pub struct Manifest {
    /// Bitmaps in the order they are allocated
    #[serde(rename = "bitmap", default)]
    pub bitmaps: Vec<BitmapSpec>,
}

impl Manifest {
    /// Load a manifest, resolving pixel files relative to it
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut manifest = Self::from_toml_str(&content)?;

        if let Some(dir) = path.parent() {
            for bitmap in &mut manifest.bitmaps {
                if bitmap.file.is_relative() {
                    bitmap.file = dir.join(&bitmap.file);
                }
            }
        }
        Ok(manifest)
    }

    /// Parse and validate a manifest
    pub fn from_toml_str(content: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest = toml::from_str(content)?;

        if manifest.bitmaps.len() > MAX_BITMAPS as usize {
            return Err(ManifestError::TooMany(manifest.bitmaps.len()));
        }
        for (index, bitmap) in manifest.bitmaps.iter().enumerate() {
            if bitmap.width == 0 || bitmap.height == 0 {
                return Err(ManifestError::EmptyBitmap {
                    index,
                    width: bitmap.width,
                    height: bitmap.height,
                });
            }
        }
        Ok(manifest)
    }

    /// Total pages the pixel data needs
    pub fn total_pages(&self) -> u64 {
        self.bitmaps.iter().map(BitmapSpec::pages).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest() {
        let manifest = Manifest::from_toml_str(
            r#"
            [[bitmap]]
            name = "splash"
            file = "splash.raw"
            width = 100
            height = 50

            [[bitmap]]
            file = "icon.raw"
            width = 10
            height = 10
            "#,
        )
        .unwrap();

        assert_eq!(manifest.bitmaps.len(), 2);
        assert_eq!(manifest.bitmaps[0].label(), "splash");
        assert_eq!(manifest.bitmaps[1].label(), "icon.raw");
        assert_eq!(manifest.bitmaps[0].byte_len(), 10_000);
        assert_eq!(manifest.total_pages(), 41);
    }

    #[test]
    fn test_empty_manifest() {
        let manifest = Manifest::from_toml_str("").unwrap();
        assert!(manifest.bitmaps.is_empty());
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let err = Manifest::from_toml_str(
            r#"
            [[bitmap]]
            file = "a.raw"
            width = 0
            height = 5
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::EmptyBitmap { index: 0, .. }));
    }

    #[test]
    fn test_missing_field_rejected() {
        let err = Manifest::from_toml_str("[[bitmap]]\nfile = \"a.raw\"\nwidth = 4\n").unwrap_err();
        assert!(matches!(err, ManifestError::Parse(_)));
    }

    #[test]
    fn test_files_resolve_relative_to_manifest() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.raw"), [0u8; 8]).unwrap();
        let manifest_path = dir.path().join("bitmaps.toml");
        fs::write(
            &manifest_path,
            "[[bitmap]]\nfile = \"a.raw\"\nwidth = 2\nheight = 2\n",
        )
        .unwrap();

        let manifest = Manifest::from_toml_file(&manifest_path).unwrap();
        assert_eq!(manifest.bitmaps[0].file, dir.path().join("a.raw"));
        assert_eq!(manifest.bitmaps[0].load_pixels().unwrap().len(), 8);
    }

    #[test]
    fn test_pixel_size_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("short.raw");
        fs::write(&file, [0u8; 7]).unwrap();
        let spec = BitmapSpec {
            name: None,
            file,
            width: 2,
            height: 2,
        };
        assert!(matches!(
            spec.load_pixels(),
            Err(ManifestError::SizeMismatch {
                expected: 8,
                actual: 7,
                ..
            })
        ));
    }
}
