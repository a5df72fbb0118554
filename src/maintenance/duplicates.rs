//! Duplicate rows in an emitted artifact.
//!
//! Per-category emission repeats every `href` on purpose (one `all` row plus
//! one row per category). [`check_duplicates`] reports those repeats;
//! [`remove_duplicates`] drops the `all` rows that are covered by a category
//! row, for sites that switched to filtering on `originalCategory`.

use super::artifact::{ArtifactError, parse_artifact};
use crate::emit::{backup_path, render_artifact, write_atomic};
use crate::types::{ALL_CATEGORY, GalleryItem};
use log::{error, info};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Every row sharing one `href`, in artifact order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub href: String,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateReport {
    pub total_rows: usize,
    pub unique_hrefs: usize,
    /// Hrefs with more than one row, in order of first appearance.
    pub groups: Vec<DuplicateGroup>,
    /// Rows repeating an earlier row's `href` and `category` exactly.
    pub exact_duplicates: usize,
    /// Row count per category.
    pub category_counts: BTreeMap<String, usize>,
}

impl DuplicateReport {
    pub fn all_rows(&self) -> usize {
        self.category_counts.get(ALL_CATEGORY).copied().unwrap_or(0)
    }

    /// True when there are duplicates and each group involves an `all` row.
    pub fn only_all_duplicates(&self) -> bool {
        !self.groups.is_empty()
            && self
                .groups
                .iter()
                .all(|g| g.categories.iter().any(|c| c == ALL_CATEGORY))
    }
}

pub fn check_duplicates(items: &[GalleryItem]) -> DuplicateReport {
    let mut order: Vec<&str> = Vec::new();
    let mut by_href: HashMap<&str, Vec<String>> = HashMap::new();
    let mut seen_pairs: HashSet<(&str, &str)> = HashSet::new();
    let mut report = DuplicateReport {
        total_rows: items.len(),
        ..DuplicateReport::default()
    };

    for item in items {
        let entry = by_href.entry(item.href.as_str()).or_insert_with(|| {
            order.push(item.href.as_str());
            Vec::new()
        });
        entry.push(item.category.clone());

        if !seen_pairs.insert((item.href.as_str(), item.category.as_str())) {
            report.exact_duplicates += 1;
        }
        *report
            .category_counts
            .entry(item.category.clone())
            .or_insert(0) += 1;
    }

    report.unique_hrefs = order.len();
    report.groups = order
        .into_iter()
        .filter_map(|href| {
            let categories = by_href.remove(href)?;
            (categories.len() > 1).then(|| DuplicateGroup {
                href: href.to_string(),
                categories,
            })
        })
        .collect();
    report
}

/// Drop `all` rows whose `href` also has a category row. Returns the kept
/// rows and the number removed.
pub fn drop_redundant_all_rows(items: Vec<GalleryItem>) -> (Vec<GalleryItem>, usize) {
    let covered: HashSet<String> = items
        .iter()
        .filter(|i| i.category != ALL_CATEGORY)
        .map(|i| i.href.clone())
        .collect();
    let before = items.len();
    let kept: Vec<GalleryItem> = items
        .into_iter()
        .filter(|i| !(i.category == ALL_CATEGORY && covered.contains(&i.href)))
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalSummary {
    pub original: usize,
    pub removed: usize,
    pub kept: usize,
    pub backup: PathBuf,
}

fn rewrite(path: &Path, content: &str) -> Result<(usize, usize), ArtifactError> {
    let parsed = parse_artifact(content)?;
    let original = parsed.items.len();
    let (kept, removed) = drop_redundant_all_rows(parsed.items);
    let text = render_artifact(&kept, &parsed.categories)?;
    write_atomic(path, &text)?;
    Ok((original, removed))
}

/// Back up the artifact, then rewrite it without redundant `all` rows.
///
/// On any failure after the backup, the backup is copied back before the
/// error is returned.
pub fn remove_duplicates(path: &Path) -> Result<RemovalSummary, ArtifactError> {
    let content = fs::read_to_string(path)?;
    let backup = backup_path(path);
    fs::write(&backup, &content)?;
    info!("Backup created at {}", backup.display());

    match rewrite(path, &content) {
        Ok((original, removed)) => Ok(RemovalSummary {
            original,
            removed,
            kept: original - removed,
            backup,
        }),
        Err(e) => {
            error!("Rewrite failed, restoring {} from backup", path.display());
            if let Err(restore) = fs::copy(&backup, path) {
                error!("Could not restore from backup: {}", restore);
            }
            Err(e)
        }
    }
}
