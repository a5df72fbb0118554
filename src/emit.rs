//! Gallery artifact emission.
//!
//! Final stage of the build. Turns the ordered photos into [`GalleryItem`]
//! rows and writes them, with the category taxonomy, to a TypeScript module
//! the page templates import:
//!
//! ```text
//! export interface GalleryItem { ... }
//!
//! // This file is auto-generated by folio-gallery.
//! // Run `folio-gallery build` to regenerate.
//! export const galleryItems: GalleryItem[] = [ ...JSON... ];
//!
//! export const categories = [ { "value": "all", "label": "All" }, ... ];
//! ```
//!
//! ## Emission modes
//!
//! - **Single** (recency strategy): one row per photo with `category: "all"`,
//!   `originalCategory` set to its first category, and the full `categories`
//!   list for client-side filtering.
//! - **Per category** (shuffle strategy): one `all` row per photo, then one
//!   row per (photo, category). Filter views are materialized up front, so an
//!   `href` deliberately appears more than once. Numbered copies like
//!   `DSC1234-2` get no `all` row when `emit.skip_variant_copies` is set.
//!
//! ## Writing
//!
//! The artifact is always regenerated whole. The new text goes to
//! `<file>.tmp` and is renamed over the target, so an interrupted run leaves
//! the previous artifact intact. With `emit.keep_backup`, the previous
//! artifact is first copied to `<file>.backup`.

use crate::config::{EmitConfig, GalleryConfig, OrderingStrategy};
use crate::naming::is_variant_copy;
use crate::process::ProcessedPhoto;
use crate::types::{ALL_CATEGORY, Category, GalleryItem};
use log::info;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// How photos become rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmissionMode {
    Single,
    PerCategory { skip_variant_copies: bool },
}

impl EmissionMode {
    pub fn for_strategy(strategy: OrderingStrategy, emit: &EmitConfig) -> Self {
        match strategy {
            OrderingStrategy::Recency => EmissionMode::Single,
            OrderingStrategy::Shuffle => EmissionMode::PerCategory {
                skip_variant_copies: emit.skip_variant_copies,
            },
        }
    }
}

/// The filter taxonomy: `all` followed by the configured categories.
pub fn taxonomy(config: &GalleryConfig) -> Vec<Category> {
    std::iter::once(Category::all())
        .chain(
            config
                .categories
                .iter()
                .map(|c| Category::new(c.id.clone(), c.label.clone())),
        )
        .collect()
}

fn base_item(photo: &ProcessedPhoto, category: &str) -> Option<GalleryItem> {
    let rendition = photo.rendition.as_ref()?;
    let record = &photo.record;
    Some(GalleryItem {
        label: record.label.clone(),
        href: rendition.href.clone(),
        thumbnail: rendition.thumbnail_href.clone(),
        category: category.to_string(),
        original_category: None,
        categories: Vec::new(),
        orientation: rendition.orientation,
        aspect_ratio: rendition.aspect_ratio.clone(),
        modified_time: Some(record.modified_ms),
        metadata: record.metadata.clone(),
    })
}

/// Rows for the ordered photos. Unoptimized photos are skipped.
pub fn build_items(photos: &[ProcessedPhoto], mode: EmissionMode) -> Vec<GalleryItem> {
    let all_row = |photo: &ProcessedPhoto| {
        base_item(photo, ALL_CATEGORY).map(|mut item| {
            item.original_category = photo.record.categories.first().cloned();
            item
        })
    };

    match mode {
        EmissionMode::Single => photos
            .iter()
            .filter_map(|photo| {
                all_row(photo).map(|mut item| {
                    item.categories = photo.record.categories.clone();
                    item
                })
            })
            .collect(),
        EmissionMode::PerCategory {
            skip_variant_copies,
        } => {
            let all_rows = photos
                .iter()
                .filter(|p| !(skip_variant_copies && is_variant_copy(&p.record.identity)))
                .filter_map(all_row);
            let category_rows = photos.iter().flat_map(|photo| {
                photo
                    .record
                    .categories
                    .iter()
                    .filter_map(move |category| base_item(photo, category))
            });
            all_rows.chain(category_rows).collect()
        }
    }
}

const INTERFACE: &str = r#"export interface GalleryItem {
  label: string;
  href: string;
  thumbnail?: string;
  category: string;
  originalCategory?: string;
  categories?: string[];
  orientation: "landscape" | "portrait" | "square";
  aspectRatio: string;
  modifiedTime?: number;
  metadata: {
    camera: string;
    lens: string;
    focalLength: string;
    aperture: string;
    shutterSpeed: string;
    iso: string;
  };
}
"#;

/// Full artifact text.
pub fn render_artifact(items: &[GalleryItem], categories: &[Category]) -> Result<String, EmitError> {
    let items_json = serde_json::to_string_pretty(items)?;
    let categories_json = serde_json::to_string_pretty(categories)?;
    Ok(format!(
        "{INTERFACE}
// This file is auto-generated by folio-gallery.
// Run `folio-gallery build` to regenerate.
export const galleryItems: GalleryItem[] = {items_json};

export const categories = {categories_json};
"
    ))
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// `<file>.backup` next to an artifact.
pub fn backup_path(path: &Path) -> PathBuf {
    sibling(path, ".backup")
}

/// Copy the current artifact to its backup path, if it exists.
pub fn backup_artifact(path: &Path) -> Result<Option<PathBuf>, EmitError> {
    if !path.is_file() {
        return Ok(None);
    }
    let backup = backup_path(path);
    fs::copy(path, &backup)?;
    Ok(Some(backup))
}

/// Replace `path` with `content` through a temp file and rename.
pub fn write_atomic(path: &Path, content: &str) -> Result<(), EmitError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let tmp = sibling(path, ".tmp");
    fs::write(&tmp, content)?;
    if let Err(e) = fs::rename(&tmp, path) {
        fs::remove_file(&tmp).ok();
        return Err(e.into());
    }
    Ok(())
}

/// What [`emit`] wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitSummary {
    pub path: PathBuf,
    pub rows: usize,
    pub backup: Option<PathBuf>,
}

/// Render and write the artifact.
pub fn emit(
    path: &Path,
    items: &[GalleryItem],
    categories: &[Category],
    keep_backup: bool,
) -> Result<EmitSummary, EmitError> {
    let content = render_artifact(items, categories)?;
    let backup = if keep_backup {
        backup_artifact(path)?
    } else {
        None
    };
    write_atomic(path, &content)?;
    info!("Wrote {} row(s) to {}", items.len(), path.display());
    Ok(EmitSummary {
        path: path.to_path_buf(),
        rows: items.len(),
        backup,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Metadata;
    use crate::process::Rendition;
    use crate::registry::PhotoRecord;
    use crate::types::Orientation;
    use tempfile::TempDir;

    fn photo(identity: &str, categories: &[&str], optimized: bool) -> ProcessedPhoto {
        ProcessedPhoto {
            record: PhotoRecord {
                identity: identity.to_string(),
                label: identity.to_string(),
                sequence: 0,
                categories: categories.iter().map(|c| c.to_string()).collect(),
                primary_category: categories[0].to_string(),
                source_path: format!("/g/{identity}.jpg").into(),
                modified_ms: 1_000,
                metadata: Metadata::default(),
                rendition_stem: identity.to_string(),
            },
            rendition: optimized.then(|| Rendition {
                path: format!("/o/{identity}.avif").into(),
                href: format!("/gallery/optimized/{identity}.avif"),
                thumbnail_href: None,
                width: 300,
                height: 200,
                orientation: Orientation::Landscape,
                aspect_ratio: "3:2".into(),
            }),
        }
    }

    fn rows(items: &[GalleryItem]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|i| (i.label.clone(), i.category.clone()))
            .collect()
    }

    fn pair(label: &str, category: &str) -> (String, String) {
        (label.to_string(), category.to_string())
    }

    // =========================================================================
    // Modes
    // =========================================================================

    #[test]
    fn mode_follows_strategy() {
        let emit = EmitConfig::default();
        assert_eq!(
            EmissionMode::for_strategy(OrderingStrategy::Recency, &emit),
            EmissionMode::Single
        );
        assert_eq!(
            EmissionMode::for_strategy(OrderingStrategy::Shuffle, &emit),
            EmissionMode::PerCategory {
                skip_variant_copies: true
            }
        );
    }

    #[test]
    fn single_mode_one_row_per_photo() {
        let photos = vec![photo("A", &["bw", "street"], true), photo("B", &["landscape"], true)];
        let items = build_items(&photos, EmissionMode::Single);

        assert_eq!(rows(&items), vec![pair("A", "all"), pair("B", "all")]);
        assert_eq!(items[0].original_category.as_deref(), Some("bw"));
        assert_eq!(items[0].categories, vec!["bw", "street"]);
        assert_eq!(items[0].modified_time, Some(1_000));
        assert_eq!(items[0].aspect_ratio, "3:2");
    }

    #[test]
    fn unoptimized_photos_are_not_emitted() {
        let photos = vec![photo("A", &["bw"], false), photo("B", &["bw"], true)];
        let single = build_items(&photos, EmissionMode::Single);
        assert_eq!(rows(&single), vec![pair("B", "all")]);

        let per = build_items(
            &photos,
            EmissionMode::PerCategory {
                skip_variant_copies: false,
            },
        );
        assert!(per.iter().all(|i| i.label == "B"));
    }

    #[test]
    fn per_category_all_rows_first() {
        let photos = vec![photo("A", &["bw", "street"], true), photo("B", &["landscape"], true)];
        let items = build_items(
            &photos,
            EmissionMode::PerCategory {
                skip_variant_copies: true,
            },
        );

        assert_eq!(
            rows(&items),
            vec![
                pair("A", "all"),
                pair("B", "all"),
                pair("A", "bw"),
                pair("A", "street"),
                pair("B", "landscape"),
            ]
        );
        assert_eq!(items[0].original_category.as_deref(), Some("bw"));
        assert!(items[2].original_category.is_none());
        assert!(items[2].categories.is_empty());
    }

    #[test]
    fn per_category_skips_variant_copies_in_all() {
        let photos = vec![photo("DSC100-2", &["bw"], true), photo("DSC100", &["street"], true)];

        let skipped = build_items(
            &photos,
            EmissionMode::PerCategory {
                skip_variant_copies: true,
            },
        );
        assert_eq!(
            rows(&skipped),
            vec![pair("DSC100", "all"), pair("DSC100-2", "bw"), pair("DSC100", "street")]
        );

        let kept = build_items(
            &photos,
            EmissionMode::PerCategory {
                skip_variant_copies: false,
            },
        );
        assert_eq!(kept.len(), 4);
    }

    // =========================================================================
    // Taxonomy and rendering
    // =========================================================================

    #[test]
    fn taxonomy_led_by_all() {
        let cats = taxonomy(&GalleryConfig::default());
        assert_eq!(cats[0], Category::all());
        assert_eq!(cats[1], Category::new("street", "Street Photography"));
        assert_eq!(cats.last(), Some(&Category::new("bw", "B&W")));
        assert_eq!(cats.len(), 7);
    }

    #[test]
    fn render_artifact_layout() {
        let items = build_items(&[photo("A", &["bw"], true)], EmissionMode::Single);
        let text = render_artifact(&items, &taxonomy(&GalleryConfig::default())).unwrap();

        assert!(text.starts_with("export interface GalleryItem {"));
        assert!(text.contains("// This file is auto-generated by folio-gallery."));
        assert!(text.contains("export const galleryItems: GalleryItem[] = [\n  {\n    \"label\": \"A\""));
        assert!(text.contains("\"originalCategory\": \"bw\""));
        assert!(text.contains("export const categories = [\n  {\n    \"value\": \"all\",\n    \"label\": \"All\"\n  }"));
        assert!(text.ends_with("];\n"));
    }

    #[test]
    fn render_empty_gallery() {
        let text = render_artifact(&[], &[Category::all()]).unwrap();
        assert!(text.contains("export const galleryItems: GalleryItem[] = [];"));
    }

    // =========================================================================
    // Writing
    // =========================================================================

    #[test]
    fn emit_creates_parent_dirs_and_no_tmp_left() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("src/data/gallery.ts");

        let summary = emit(&path, &[], &[Category::all()], true).unwrap();

        assert!(path.exists());
        assert!(!tmp.path().join("src/data/gallery.ts.tmp").exists());
        assert_eq!(summary.backup, None);
        assert_eq!(summary.rows, 0);
    }

    #[test]
    fn emit_keeps_backup_of_previous_artifact() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("gallery.ts");
        fs::write(&path, "old contents").unwrap();

        let summary = emit(&path, &[], &[Category::all()], true).unwrap();

        let backup = summary.backup.unwrap();
        assert_eq!(backup, tmp.path().join("gallery.ts.backup"));
        assert_eq!(fs::read_to_string(backup).unwrap(), "old contents");
        assert_ne!(fs::read_to_string(&path).unwrap(), "old contents");
    }

    #[test]
    fn emit_without_backup() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("gallery.ts");
        fs::write(&path, "old").unwrap();

        let summary = emit(&path, &[], &[Category::all()], false).unwrap();
        assert_eq!(summary.backup, None);
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn emit_is_byte_identical_for_same_input() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("gallery.ts");
        let items = build_items(&[photo("A", &["bw"], true)], EmissionMode::Single);
        let cats = taxonomy(&GalleryConfig::default());

        emit(&path, &items, &cats, false).unwrap();
        let first = fs::read(&path).unwrap();
        emit(&path, &items, &cats, false).unwrap();
        assert_eq!(fs::read(&path).unwrap(), first);
    }
}
