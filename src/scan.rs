//! Category folder scanning.
//!
//! First stage of the build. Walks the configured category folders in their
//! declared order and lists every photo file found directly inside each one.
//!
//! ## Directory Structure
//!
//! ```text
//! public/gallery/                  # paths.gallery_dir
//! ├── street/                      # one folder per [[categories]] entry
//! │   ├── DSC0042.jpg
//! │   └── DSC0043 #bw.jpg          # tagged: belongs to bw only
//! ├── landscape/
//! │   └── golden-hour.webp
//! ├── bw/
//! │   └── DSC0043 #bw.jpg          # same identity as above, deduplicated later
//! └── optimized/                   # renditions; not a category, never scanned
//! ```
//!
//! ## Ordering
//!
//! Folders are visited in config order; files within a folder are sorted by
//! name. Together these decide which copy of a duplicated photo becomes the
//! primary source in the [registry](crate::registry).
//!
//! ## Skipped entries
//!
//! - Missing category folders (logged at info, counted as zero photos)
//! - Hidden files (`.DS_Store`, `.freshness.json`, ...)
//! - Sub-directories
//! - Files whose extension is not a supported photo format

use crate::config::GalleryConfig;
use crate::imaging::is_supported_photo;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to read category folder {path}: {source}")]
    Folder {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One photo file found in a category folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePhoto {
    /// File name including extension and any embedded tags.
    pub raw_filename: String,
    /// Configured category id of the folder the file was found in.
    pub category: String,
    pub source_path: PathBuf,
    /// Source modification time in milliseconds since the Unix epoch.
    pub modified_ms: u64,
}

impl SourcePhoto {
    /// File name without its extension.
    pub fn stem(&self) -> &str {
        Path::new(&self.raw_filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.raw_filename)
    }
}

/// Per-folder outcome, in scan order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderScan {
    pub folder: String,
    pub category: String,
    pub photos: usize,
    pub missing: bool,
}

/// Everything the scan found.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub photos: Vec<SourcePhoto>,
    pub folders: Vec<FolderScan>,
}

/// Scan every configured category folder under `gallery_dir`.
pub fn scan(gallery_dir: &Path, config: &GalleryConfig) -> Result<ScanResult, ScanError> {
    let mut result = ScanResult::default();

    for category in &config.categories {
        let dir = gallery_dir.join(&category.folder);
        if !dir.is_dir() {
            info!("Category folder {} not found, skipping", dir.display());
            result.folders.push(FolderScan {
                folder: category.folder.clone(),
                category: category.id.clone(),
                photos: 0,
                missing: true,
            });
            continue;
        }

        let files = collect_photos(&dir)?;
        debug!("{}: {} photo(s)", category.folder, files.len());
        result.folders.push(FolderScan {
            folder: category.folder.clone(),
            category: category.id.clone(),
            photos: files.len(),
            missing: false,
        });

        for path in files {
            let raw_filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let modified_ms = modified_millis(&path)?;
            result.photos.push(SourcePhoto {
                raw_filename,
                category: category.id.clone(),
                source_path: path,
                modified_ms,
            });
        }
    }

    Ok(result)
}

/// Photo files directly inside `dir`, sorted by name.
fn collect_photos(dir: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let read = fs::read_dir(dir).map_err(|source| ScanError::Folder {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut entries: Vec<PathBuf> = read
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            let hidden = p
                .file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with('.'));
            !hidden && p.is_file() && is_supported_photo(p)
        })
        .collect();

    entries.sort();
    Ok(entries)
}

fn modified_millis(path: &Path) -> Result<u64, ScanError> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{config_for, set_mtime, write_photo};
    use tempfile::TempDir;

    #[test]
    fn scans_folders_in_config_order() {
        let tmp = TempDir::new().unwrap();
        let config = config_for(tmp.path());
        let gallery = tmp.path().join("gallery");
        write_photo(&gallery, "bw", "B1.jpg", 10, 10);
        write_photo(&gallery, "street", "S1.jpg", 10, 10);
        write_photo(&gallery, "landscape", "L1.png", 10, 10);

        let result = scan(&gallery, &config).unwrap();
        let order: Vec<&str> = result.photos.iter().map(|p| p.category.as_str()).collect();
        // street, landscape, ..., bw
        assert_eq!(order, vec!["street", "landscape", "bw"]);
    }

    #[test]
    fn files_sorted_within_folder() {
        let tmp = TempDir::new().unwrap();
        let config = config_for(tmp.path());
        let gallery = tmp.path().join("gallery");
        for name in ["c.jpg", "a.jpg", "b.jpg"] {
            write_photo(&gallery, "street", name, 10, 10);
        }

        let result = scan(&gallery, &config).unwrap();
        let names: Vec<&str> = result.photos.iter().map(|p| p.raw_filename.as_str()).collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg", "c.jpg"]);
    }

    #[test]
    fn missing_folders_count_as_zero() {
        let tmp = TempDir::new().unwrap();
        let config = config_for(tmp.path());
        let gallery = tmp.path().join("gallery");
        write_photo(&gallery, "street", "S1.jpg", 10, 10);

        let result = scan(&gallery, &config).unwrap();
        assert_eq!(result.photos.len(), 1);
        assert_eq!(result.folders.len(), 6);
        assert!(!result.folders[0].missing);
        assert_eq!(result.folders[0].photos, 1);
        assert!(result.folders[1..].iter().all(|f| f.missing && f.photos == 0));
    }

    #[test]
    fn missing_gallery_dir_is_not_an_error() {
        let tmp = TempDir::new().unwrap();
        let config = config_for(tmp.path());
        let result = scan(&tmp.path().join("nope"), &config).unwrap();
        assert!(result.photos.is_empty());
    }

    #[test]
    fn skips_hidden_unsupported_and_directories() {
        let tmp = TempDir::new().unwrap();
        let config = config_for(tmp.path());
        let gallery = tmp.path().join("gallery");
        write_photo(&gallery, "street", "keep.JPG", 10, 10);
        std::fs::write(gallery.join("street/.hidden.jpg"), b"x").unwrap();
        std::fs::write(gallery.join("street/notes.txt"), b"x").unwrap();
        std::fs::create_dir_all(gallery.join("street/nested.jpg")).unwrap();

        let result = scan(&gallery, &config).unwrap();
        let names: Vec<&str> = result.photos.iter().map(|p| p.raw_filename.as_str()).collect();
        assert_eq!(names, vec!["keep.JPG"]);
    }

    #[test]
    fn keeps_tags_in_raw_filename_and_reads_mtime() {
        let tmp = TempDir::new().unwrap();
        let config = config_for(tmp.path());
        let gallery = tmp.path().join("gallery");
        let path = write_photo(&gallery, "landscape", "DSC001 #bw.jpg", 10, 10);
        set_mtime(&path, 1_700_000_000);

        let result = scan(&gallery, &config).unwrap();
        let photo = &result.photos[0];
        assert_eq!(photo.raw_filename, "DSC001 #bw.jpg");
        assert_eq!(photo.stem(), "DSC001 #bw");
        assert_eq!(photo.category, "landscape");
        assert_eq!(photo.modified_ms, 1_700_000_000_000);
        assert_eq!(photo.source_path, path);
    }

    #[test]
    fn folder_name_maps_to_category_id() {
        let tmp = TempDir::new().unwrap();
        let mut config = config_for(tmp.path());
        config.categories[0].folder = "Street Photos".into();
        let gallery = tmp.path().join("gallery");
        write_photo(&gallery, "Street Photos", "a.jpg", 10, 10);

        let result = scan(&gallery, &config).unwrap();
        assert_eq!(result.photos[0].category, "street");
        assert_eq!(result.folders[0].folder, "Street Photos");
    }
}
