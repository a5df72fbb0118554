//! Photos in the gallery folders that the current artifact doesn't show yet.
//!
//! Each scanned photo is mapped to the rendition `href` a build would give
//! it (same identity dedupe and stem allocation as the registry, in scan
//! order) and kept if the artifact references no row with that `href`.

use super::artifact::ArtifactError;
use crate::config::GalleryConfig;
use crate::naming::{parse_tags, photo_identity};
use crate::process::rendition_href;
use crate::registry::StemAllocator;
use crate::scan::scan;
use crate::types::GalleryItem;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPhoto {
    pub category: String,
    pub file: String,
    pub path: PathBuf,
    pub href: String,
}

pub fn referenced_hrefs(items: &[GalleryItem]) -> HashSet<String> {
    items.iter().map(|i| i.href.clone()).collect()
}

pub fn find_new(
    gallery_dir: &Path,
    config: &GalleryConfig,
    href_prefix: &str,
    referenced: &HashSet<String>,
) -> Result<Vec<NewPhoto>, ArtifactError> {
    let scanned = scan(gallery_dir, config)?;
    let marker = config.marker();
    let mut stems = StemAllocator::default();
    let mut hrefs: HashMap<String, String> = HashMap::new();

    let mut found = Vec::new();
    for photo in scanned.photos {
        let stem = photo.stem().to_string();
        let identity = photo_identity(&stem, &parse_tags(&stem, marker));
        let href = hrefs
            .entry(identity)
            .or_insert_with_key(|identity| {
                let filename = format!("{}.avif", stems.claim(identity));
                rendition_href(href_prefix, &filename)
            })
            .clone();

        if !referenced.contains(&href) {
            found.push(NewPhoto {
                category: photo.category,
                file: photo.raw_filename,
                path: photo.source_path,
                href,
            });
        }
    }
    Ok(found)
}

/// Save the list as pretty JSON.
pub fn write_new_photos(path: &Path, photos: &[NewPhoto]) -> Result<(), ArtifactError> {
    let json = serde_json::to_string_pretty(photos)?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{config_for, write_photo};
    use tempfile::TempDir;

    #[test]
    fn unreferenced_photos_are_new() {
        let tmp = TempDir::new().unwrap();
        let config = config_for(tmp.path());
        let gallery = tmp.path().join("gallery");
        write_photo(&gallery, "street", "A.jpg", 8, 8);
        write_photo(&gallery, "street", "B #bw.jpg", 8, 8);
        write_photo(&gallery, "bw", "B #bw.jpg", 8, 8);

        let referenced: HashSet<String> = ["/gallery/optimized/A.avif".to_string()].into();
        let found = find_new(&gallery, &config, "/gallery/optimized", &referenced).unwrap();

        let files: Vec<(&str, &str)> = found
            .iter()
            .map(|p| (p.category.as_str(), p.file.as_str()))
            .collect();
        assert_eq!(files, vec![("street", "B #bw.jpg"), ("bw", "B #bw.jpg")]);
        assert!(found.iter().all(|p| p.href == "/gallery/optimized/B.avif"));
    }

    #[test]
    fn everything_referenced_finds_nothing() {
        let tmp = TempDir::new().unwrap();
        let config = config_for(tmp.path());
        let gallery = tmp.path().join("gallery");
        write_photo(&gallery, "street", "golden hour.jpg", 8, 8);
        write_photo(&gallery, "street", "golden-hour.jpg", 8, 8);

        let referenced: HashSet<String> =
            ["/g/golden-hour.avif".to_string(), "/g/golden-hour-2.avif".to_string()].into();
        assert!(find_new(&gallery, &config, "/g", &referenced).unwrap().is_empty());
    }

    #[test]
    fn write_new_photos_as_json() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("reports/new.json");
        let photos = vec![NewPhoto {
            category: "street".into(),
            file: "A.jpg".into(),
            path: "/g/street/A.jpg".into(),
            href: "/o/A.avif".into(),
        }];

        write_new_photos(&out, &photos).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(value[0]["category"], "street");
        assert_eq!(value[0]["href"], "/o/A.avif");
    }
}
