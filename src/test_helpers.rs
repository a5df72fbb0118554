//! Shared test utilities for the folio-gallery test suite.
//!
//! Provides synthetic image writers and a builder for the category-folder
//! layout the scanner expects.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let gallery = tmp.path().join("public/gallery");
//! write_photo(&gallery, "landscape", "DSC001#bw.jpg", 60, 40);
//! set_mtime(&gallery.join("landscape/DSC001#bw.jpg"), 1_700_000_000);
//! ```

use image::{ImageEncoder, RgbImage};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::config::GalleryConfig;

// =========================================================================
// Synthetic images
// =========================================================================

/// Create a small valid JPEG file with the given dimensions.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

// =========================================================================
// Category tree fixtures
// =========================================================================

/// Write a synthetic JPEG into `<gallery>/<folder>/<filename>` and return its path.
pub fn write_photo(gallery: &Path, folder: &str, filename: &str, width: u32, height: u32) -> PathBuf {
    let path = gallery.join(folder).join(filename);
    create_test_jpeg(&path, width, height);
    path
}

/// Set a file's modification time to `secs` after the Unix epoch.
pub fn set_mtime(path: &Path, secs: u64) {
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

/// Default config with every path pointing inside `root`.
///
/// The optimized directory sits next to the category folders (not inside
/// one) so it is never scanned as a category.
pub fn config_for(root: &Path) -> GalleryConfig {
    let mut config = GalleryConfig::default();
    config.paths.gallery_dir = root.join("gallery").to_string_lossy().into_owned();
    config.paths.optimized_dir = root.join("optimized").to_string_lossy().into_owned();
    config.paths.output_file = root.join("data/gallery.ts").to_string_lossy().into_owned();
    config.paths.source_dir = root.join("source").to_string_lossy().into_owned();
    config
}
