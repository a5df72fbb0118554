//! Deduplicating photo registry.
//!
//! The same photo often sits in several category folders, sometimes with a
//! different tag combination in each copy. The registry folds every
//! [`SourcePhoto`] into one [`PhotoRecord`] per identity (the tag-stripped
//! filename stem):
//!
//! - **First encounter** creates the record: source path, modification time,
//!   and folder are taken from this copy, EXIF is read and normalized exactly
//!   once, and categories are seeded from the filename tags, or from the
//!   folder when the name has no tags.
//! - **Later encounters** only add categories (their tags, or their folder if
//!   untagged). Nothing else on the record changes.
//!
//! A registry is built fresh for each run and handed on by value; there is no
//! shared state between runs.

use crate::imaging::ImageBackend;
use crate::metadata::{Metadata, Normalizer};
use crate::naming::{display_label, parse_tags, photo_identity, rendition_stem, sequence_number};
use crate::scan::SourcePhoto;
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// One unique photo.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoRecord {
    /// Deduplication key: tag-stripped stem, or the raw stem if that is empty.
    pub identity: String,
    pub label: String,
    /// First digit run of the label, 0 if none.
    pub sequence: u64,
    /// Category ids, unique, in the order they were first contributed.
    pub categories: Vec<String>,
    /// Folder category of the first encountered copy.
    pub primary_category: String,
    pub source_path: PathBuf,
    pub modified_ms: u64,
    pub metadata: Metadata,
    /// Rendition filename stem, unique within the registry.
    pub rendition_stem: String,
}

impl PhotoRecord {
    fn add_category(&mut self, id: String) -> bool {
        if self.categories.contains(&id) {
            false
        } else {
            self.categories.push(id);
            true
        }
    }
}

/// What [`PhotoRegistry::register`] did with a source photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Created,
    Merged,
}

/// Insertion-ordered index of unique photos.
pub struct PhotoRegistry {
    marker: char,
    normalizer: Normalizer,
    records: Vec<PhotoRecord>,
    by_identity: HashMap<String, usize>,
    stems: StemAllocator,
}

impl PhotoRegistry {
    pub fn new(marker: char, normalizer: Normalizer) -> Self {
        Self {
            marker,
            normalizer,
            records: Vec::new(),
            by_identity: HashMap::new(),
            stems: StemAllocator::default(),
        }
    }

    /// Categories implied by one copy: its lower-cased tags, or its folder.
    fn implied_categories(&self, tags: &[String], folder_category: &str) -> Vec<String> {
        if tags.is_empty() {
            vec![folder_category.to_string()]
        } else {
            tags.iter().map(|t| t.to_lowercase()).collect()
        }
    }

    /// Fold one source photo into the registry.
    pub fn register(&mut self, photo: SourcePhoto, backend: &impl ImageBackend) -> Registration {
        let stem = photo.stem().to_string();
        let parsed = parse_tags(&stem, self.marker);
        let identity = photo_identity(&stem, &parsed);
        let implied = self.implied_categories(&parsed.tags, &photo.category);

        if let Some(&idx) = self.by_identity.get(&identity) {
            let record = &mut self.records[idx];
            for category in implied {
                if record.add_category(category.clone()) {
                    debug!(
                        "{}: added category {} from {}",
                        record.identity,
                        category,
                        photo.source_path.display()
                    );
                }
            }
            return Registration::Merged;
        }

        let metadata = match backend.read_exif(&photo.source_path) {
            Ok(raw) => self.normalizer.normalize(&raw),
            Err(e) => {
                warn!(
                    "Could not read EXIF from {}: {}",
                    photo.source_path.display(),
                    e
                );
                Metadata::default()
            }
        };

        let label = display_label(&identity, self.marker);
        let mut record = PhotoRecord {
            sequence: sequence_number(&label),
            label,
            categories: Vec::new(),
            primary_category: photo.category.clone(),
            rendition_stem: self.stems.claim(&identity),
            source_path: photo.source_path,
            modified_ms: photo.modified_ms,
            metadata,
            identity: identity.clone(),
        };
        for category in implied {
            record.add_category(category);
        }

        self.by_identity.insert(identity, self.records.len());
        self.records.push(record);
        Registration::Created
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, identity: &str) -> Option<&PhotoRecord> {
        self.by_identity.get(identity).map(|&i| &self.records[i])
    }

    pub fn records(&self) -> &[PhotoRecord] {
        &self.records
    }

    /// Freeze the registry; records stay in registration order.
    pub fn into_records(self) -> Vec<PhotoRecord> {
        self.records
    }
}

/// Hands out unique rendition stems in request order.
///
/// Comparison is case-insensitive so renditions don't collide on
/// case-insensitive filesystems. Collisions get `-2`, `-3`, ... appended.
#[derive(Debug, Default)]
pub struct StemAllocator {
    taken: HashSet<String>,
}

impl StemAllocator {
    pub fn claim(&mut self, identity: &str) -> String {
        let base = rendition_stem(identity);
        let mut candidate = base.clone();
        let mut n = 2;
        while self.taken.contains(&candidate.to_lowercase()) {
            candidate = format!("{}-{}", base, n);
            n += 1;
        }
        self.taken.insert(candidate.to_lowercase());
        candidate
    }
}

/// Build a registry from a whole scan, in scan order.
pub fn build_registry(
    photos: Vec<SourcePhoto>,
    marker: char,
    normalizer: Normalizer,
    backend: &impl ImageBackend,
) -> PhotoRegistry {
    let mut registry = PhotoRegistry::new(marker, normalizer);
    for photo in photos {
        registry.register(photo, backend);
    }
    registry
}

/// Category ids used by records but not declared in `known`, sorted.
pub fn unknown_categories<'a>(
    records: &'a [PhotoRecord],
    known: &HashSet<&str>,
) -> Vec<&'a str> {
    let mut unknown: Vec<&str> = records
        .iter()
        .flat_map(|r| r.categories.iter().map(String::as_str))
        .filter(|c| !known.contains(c))
        .collect();
    unknown.sort_unstable();
    unknown.dedup();
    unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::metadata::RawExif;
    use std::path::Path;

    fn photo(folder: &str, filename: &str) -> SourcePhoto {
        SourcePhoto {
            raw_filename: filename.to_string(),
            category: folder.to_string(),
            source_path: PathBuf::from(format!("/g/{folder}/{filename}")),
            modified_ms: 1000,
        }
    }

    fn registry() -> PhotoRegistry {
        PhotoRegistry::new('#', Normalizer::default())
    }

    fn canon() -> RawExif {
        RawExif {
            make: Some("Canon".into()),
            model: Some("EOS R5".into()),
            iso: Some(100),
            ..RawExif::default()
        }
    }

    #[test]
    fn untagged_photo_seeds_folder_category() {
        let backend = MockBackend::new();
        let mut reg = registry();
        assert_eq!(reg.register(photo("street", "DSC001.jpg"), &backend), Registration::Created);

        let rec = reg.get("DSC001").unwrap();
        assert_eq!(rec.categories, vec!["street"]);
        assert_eq!(rec.primary_category, "street");
        assert_eq!(rec.label, "DSC001");
        assert_eq!(rec.sequence, 1);
        assert_eq!(rec.rendition_stem, "DSC001");
    }

    #[test]
    fn tags_override_folder_and_are_lowercased() {
        let backend = MockBackend::new();
        let mut reg = registry();
        reg.register(photo("landscape", "DSC001 #BW #street #bw.jpg"), &backend);

        let rec = reg.get("DSC001").unwrap();
        assert_eq!(rec.categories, vec!["bw", "street"]);
        assert_eq!(rec.primary_category, "landscape");
    }

    #[test]
    fn same_identity_in_two_folders_dedupes() {
        let backend = MockBackend::new();
        backend.set_exif(Path::new("/g/landscape/DSC001#bw.jpg"), canon());
        let mut reg = registry();

        reg.register(photo("landscape", "DSC001#bw.jpg"), &backend);
        assert_eq!(reg.register(photo("bw", "DSC001#bw.jpg"), &backend), Registration::Merged);

        assert_eq!(reg.len(), 1);
        let rec = reg.get("DSC001").unwrap();
        assert_eq!(rec.categories, vec!["bw"]);
        assert_eq!(rec.metadata.camera, "Canon EOS R5");
        assert_eq!(rec.metadata.iso, "100");
        assert_eq!(rec.source_path, Path::new("/g/landscape/DSC001#bw.jpg"));
    }

    #[test]
    fn categories_are_union_of_contributors() {
        let backend = MockBackend::new();
        let mut reg = registry();
        reg.register(photo("street", "IMG7.jpg"), &backend);
        reg.register(photo("landscape", "IMG7 #bw.jpg"), &backend);
        reg.register(photo("abstract", "IMG7.jpg"), &backend);
        reg.register(photo("street", "IMG7 #street.jpg"), &backend);

        assert_eq!(reg.len(), 1);
        assert_eq!(
            reg.get("IMG7").unwrap().categories,
            vec!["street", "bw", "abstract"]
        );
    }

    #[test]
    fn exif_read_once_from_first_copy() {
        let backend = MockBackend::new();
        backend.set_exif(Path::new("/g/street/A.jpg"), canon());
        backend.set_exif(
            Path::new("/g/bw/A.jpg"),
            RawExif {
                make: Some("Nikon".into()),
                ..RawExif::default()
            },
        );
        let mut reg = registry();
        reg.register(photo("street", "A.jpg"), &backend);
        reg.register(photo("bw", "A.jpg"), &backend);

        assert_eq!(backend.count(|op| matches!(op, RecordedOp::ReadExif(_))), 1);
        assert_eq!(reg.get("A").unwrap().metadata.camera, "Canon EOS R5");
    }

    #[test]
    fn exif_failure_yields_default_bundle() {
        let backend = MockBackend::new();
        backend.fail_exif(Path::new("/g/street/A.jpg"));
        let mut reg = registry();
        reg.register(photo("street", "A.jpg"), &backend);

        assert_eq!(reg.get("A").unwrap().metadata, Metadata::default());
    }

    #[test]
    fn tag_only_filename_keeps_raw_stem_identity() {
        let backend = MockBackend::new();
        let mut reg = registry();
        reg.register(photo("street", "#bw.jpg"), &backend);

        let rec = reg.get("#bw").unwrap();
        assert_eq!(rec.categories, vec!["bw"]);
        assert_eq!(rec.label, "Bw");
        assert_eq!(rec.rendition_stem, "bw");
    }

    #[test]
    fn colliding_rendition_stems_get_suffixes() {
        let backend = MockBackend::new();
        let mut reg = registry();
        reg.register(photo("street", "golden hour.jpg"), &backend);
        reg.register(photo("street", "golden-hour.jpg"), &backend);
        reg.register(photo("street", "golden_hour!.jpg"), &backend);
        reg.register(photo("street", "Golden Hour!.jpg"), &backend);

        let stems: Vec<&str> = reg.records().iter().map(|r| r.rendition_stem.as_str()).collect();
        assert_eq!(
            stems,
            vec!["golden-hour", "golden-hour-2", "golden_hour", "Golden-Hour-3"]
        );
    }

    #[test]
    fn records_keep_registration_order() {
        let backend = MockBackend::new();
        let reg = build_registry(
            vec![photo("street", "B.jpg"), photo("street", "A.jpg"), photo("bw", "B.jpg")],
            '#',
            Normalizer::default(),
            &backend,
        );
        let ids: Vec<&str> = reg.records().iter().map(|r| r.identity.as_str()).collect();
        assert_eq!(ids, vec!["B", "A"]);
    }

    #[test]
    fn unknown_categories_listed() {
        let backend = MockBackend::new();
        let reg = build_registry(
            vec![photo("street", "A #travel #bw.jpg"), photo("street", "B #zoo.jpg")],
            '#',
            Normalizer::default(),
            &backend,
        );
        let known: HashSet<&str> = ["street", "bw"].into_iter().collect();
        assert_eq!(unknown_categories(reg.records(), &known), vec!["travel", "zoo"]);
    }
}
