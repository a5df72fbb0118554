//! Give camera-less files camera-style names.
//!
//! Phone exports and editing apps produce names with no capture number
//! (`FullSizeRender (3).jpg`, `Snapseed.jpg`, UUIDs), which sort and shuffle
//! poorly. [`plan_renames`] finds those JPEGs anywhere under the source tree
//! and assigns `IMG<NNNNN>.jpg` names that continue after the highest
//! `DSC`/`IMG`/`DSCF` number already present, oldest file first. Nothing is
//! touched until [`apply_renames`].

use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum RenameError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to walk source tree: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Source directory not found: {0}")]
    MissingSource(PathBuf),
    #[error("Refusing to overwrite existing file {0}")]
    TargetExists(PathBuf),
}

/// One pending rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePlan {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Result of [`apply_renames`]: each plan and whether it went through.
#[derive(Debug)]
pub struct RenameOutcome {
    pub renamed: Vec<RenamePlan>,
    pub failed: Vec<(RenamePlan, RenameError)>,
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
}

fn is_uuid(stem: &str) -> bool {
    let groups: Vec<&str> = stem.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8, 4, 4, 4, 12])
            .all(|(g, len)| g.len() == len && g.chars().all(|c| c.is_ascii_hexdigit()))
}

/// `FullSizeRender (3)`, `FullSizeRender(12)`.
fn is_numbered_full_size_render(stem: &str) -> bool {
    let Some(rest) = stem.strip_prefix("FullSizeRender") else {
        return false;
    };
    let Some(inner) = rest
        .trim_start()
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
    else {
        return false;
    };
    !inner.is_empty() && inner.chars().all(|c| c.is_ascii_digit())
}

/// Whether a file stem carries no camera capture number.
pub fn is_camera_less_name(stem: &str) -> bool {
    is_uuid(stem)
        || matches!(stem, "Snapseed" | "FullSizeRender" | "IMG" | "Photo")
        || is_numbered_full_size_render(stem)
}

/// Capture number from a camera-style name: digits after the first
/// `DSC`, `IMG` or `DSCF` (any case, optional `_`).
pub fn camera_file_number(filename: &str) -> Option<u64> {
    let lower = filename.to_ascii_lowercase();
    (0..lower.len()).find_map(|i| {
        let here = lower.get(i..)?;
        ["dsc", "img", "dscf"].iter().find_map(|prefix| {
            let after = here.strip_prefix(prefix)?;
            let after = after.strip_prefix('_').unwrap_or(after);
            let digits: String = after.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().ok()
        })
    })
}

struct Candidate {
    path: PathBuf,
    modified: SystemTime,
}

/// Find camera-less JPEGs under `source_dir` and name them.
pub fn plan_renames(source_dir: &Path) -> Result<Vec<RenamePlan>, RenameError> {
    if !source_dir.is_dir() {
        return Err(RenameError::MissingSource(source_dir.to_path_buf()));
    }

    let mut highest = 0u64;
    let mut candidates = Vec::new();
    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_jpeg(path) {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if let Some(n) = camera_file_number(&name) {
            highest = highest.max(n);
        }
        let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
        if is_camera_less_name(&stem) {
            candidates.push(Candidate {
                path: path.to_path_buf(),
                modified: entry.metadata()?.modified()?,
            });
        }
    }
    info!("Highest capture number found: {}", highest);

    // Stable: equal times keep walk order
    candidates.sort_by_key(|c| c.modified);

    Ok(candidates
        .into_iter()
        .zip(highest + 1..)
        .map(|(c, n)| RenamePlan {
            to: c.path.with_file_name(format!("IMG{:05}.jpg", n)),
            from: c.path,
        })
        .collect())
}

/// Perform the renames. Each one is attempted once; failures are collected.
pub fn apply_renames(plans: Vec<RenamePlan>) -> RenameOutcome {
    let mut outcome = RenameOutcome {
        renamed: Vec::new(),
        failed: Vec::new(),
    };
    for plan in plans {
        let result = if plan.to.exists() {
            Err(RenameError::TargetExists(plan.to.clone()))
        } else {
            fs::rename(&plan.from, &plan.to).map_err(RenameError::from)
        };
        match result {
            Ok(()) => outcome.renamed.push(plan),
            Err(e) => {
                warn!("Failed to rename {}: {}", plan.from.display(), e);
                outcome.failed.push((plan, e));
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::set_mtime;
    use tempfile::TempDir;

    fn touch(path: &Path, secs: u64) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"jpeg").unwrap();
        set_mtime(path, secs);
    }

    #[test]
    fn camera_less_patterns() {
        for stem in [
            "Snapseed",
            "FullSizeRender",
            "FullSizeRender (3)",
            "FullSizeRender(12)",
            "IMG",
            "Photo",
            "3F2504E0-4F89-11D3-9A0C-0305E82C3301",
            "3f2504e0-4f89-11d3-9a0c-0305e82c3301",
        ] {
            assert!(is_camera_less_name(stem), "{stem}");
        }
        for stem in [
            "DSC0042",
            "IMG_1234",
            "FullSizeRender (x)",
            "FullSizeRender ()",
            "photo",
            "Snapseed 2",
            "3F2504E0-4F89-11D3-9A0C",
        ] {
            assert!(!is_camera_less_name(stem), "{stem}");
        }
    }

    #[test]
    fn file_numbers() {
        assert_eq!(camera_file_number("DSC00042.jpg"), Some(42));
        assert_eq!(camera_file_number("img_1234.JPG"), Some(1234));
        assert_eq!(camera_file_number("DSCF0007.jpg"), Some(7));
        assert_eq!(camera_file_number("edit of DSC123 #bw.jpg"), Some(123));
        assert_eq!(camera_file_number("IMG.jpg"), None);
        assert_eq!(camera_file_number("Photo.jpg"), None);
    }

    #[test]
    fn plans_oldest_first_after_highest_number() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("street/DSC00100.jpg"), 1);
        touch(&root.join("bw/IMG_00250.jpeg"), 1);
        touch(&root.join("street/Snapseed.jpg"), 300);
        touch(&root.join("bw/FullSizeRender (2).jpg"), 100);
        touch(&root.join("bw/Photo.png"), 50);

        let plans = plan_renames(root).unwrap();

        assert_eq!(
            plans,
            vec![
                RenamePlan {
                    from: root.join("bw/FullSizeRender (2).jpg"),
                    to: root.join("bw/IMG00251.jpg"),
                },
                RenamePlan {
                    from: root.join("street/Snapseed.jpg"),
                    to: root.join("street/IMG00252.jpg"),
                },
            ]
        );
    }

    #[test]
    fn plan_does_not_touch_files() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("Snapseed.jpg"), 10);
        let plans = plan_renames(tmp.path()).unwrap();
        assert_eq!(plans.len(), 1);
        assert!(tmp.path().join("Snapseed.jpg").exists());
        assert_eq!(plans[0].to, tmp.path().join("IMG00001.jpg"));
    }

    #[test]
    fn apply_renames_moves_files() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("Photo.jpg"), 10);
        let plans = plan_renames(tmp.path()).unwrap();

        let outcome = apply_renames(plans);

        assert_eq!(outcome.renamed.len(), 1);
        assert!(outcome.failed.is_empty());
        assert!(!tmp.path().join("Photo.jpg").exists());
        assert!(tmp.path().join("IMG00001.jpg").exists());
    }

    #[test]
    fn apply_refuses_to_overwrite() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("Photo.jpg"), 10);
        touch(&tmp.path().join("taken.jpg"), 10);
        let plan = RenamePlan {
            from: tmp.path().join("Photo.jpg"),
            to: tmp.path().join("taken.jpg"),
        };

        let outcome = apply_renames(vec![plan]);

        assert!(outcome.renamed.is_empty());
        assert!(matches!(outcome.failed[0].1, RenameError::TargetExists(_)));
        assert!(tmp.path().join("Photo.jpg").exists());
    }

    #[test]
    fn missing_source_dir_errors() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            plan_renames(&tmp.path().join("nope")),
            Err(RenameError::MissingSource(_))
        ));
    }
}
