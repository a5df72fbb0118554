//! CLI output formatting for the build and the maintenance tools.
//!
//! Output leads with what the user cares about (folders, photos, duplicate
//! hrefs) and puts paths and counts on indented context lines.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Folders
//!     street → street (12 photos)
//!     bw → bw (missing)
//!
//! 14 photo files, 11 unique
//! Multi-category
//!     DSC0042: bw, street
//! ```
//!
//! ## Build
//!
//! ```text
//! DSC0042: encoded 2400x1600
//! DSC0043: up to date
//! DSC0044: failed (Image processing failed: ...)
//!
//! 14 photo files, 11 unique
//! Renditions: 9 up to date, 1 encoded (10 total), 1 failed
//! Skipped (no rendition)
//!     DSC0044
//! Wrote 10 rows (recency) to src/data/gallery.ts
//!     Backup: src/data/gallery.ts.backup
//! ```
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::config::OrderingStrategy;
use crate::maintenance::{DuplicateReport, NewPhoto, RemovalSummary, RenameOutcome, RenamePlan};
use crate::pipeline::{BuildReport, Survey};
use crate::process::ProcessEvent;
use crate::scan::FolderScan;
use std::path::Path;

/// Duplicate groups shown in full before the rest are summarized.
const DETAILED_GROUPS: usize = 20;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

fn folder_lines(folders: &[FolderScan]) -> Vec<String> {
    let mut lines = vec!["Folders".to_string()];
    for folder in folders {
        let detail = if folder.missing {
            "missing".to_string()
        } else {
            plural(folder.photos, "photo", "photos")
        };
        lines.push(format!(
            "{}{} \u{2192} {} ({})",
            indent(1),
            folder.folder,
            folder.category,
            detail
        ));
    }
    lines
}

fn totals_line(total_files: usize, unique: usize) -> String {
    format!(
        "{}, {} unique",
        plural(total_files, "photo file", "photo files"),
        unique
    )
}

fn unknown_lines(unknown: &[String]) -> Vec<String> {
    if unknown.is_empty() {
        return Vec::new();
    }
    vec![
        "Unconfigured tag categories".to_string(),
        format!("{}{}", indent(1), unknown.join(", ")),
    ]
}

// ============================================================================
// Scan / build
// ============================================================================

pub fn format_scan_output(survey: &Survey) -> Vec<String> {
    let mut lines = folder_lines(&survey.folders);
    lines.push(String::new());
    lines.push(totals_line(survey.total_files, survey.records.len()));

    let multi: Vec<_> = survey.multi_category().collect();
    if !multi.is_empty() {
        lines.push("Multi-category".to_string());
        for record in multi {
            lines.push(format!(
                "{}{}: {}",
                indent(1),
                record.identity,
                record.categories.join(", ")
            ));
        }
    }
    lines.extend(unknown_lines(&survey.unknown_categories));
    lines
}

pub fn print_scan_output(survey: &Survey) {
    print_lines(format_scan_output(survey));
}

/// One progress line per transcoded photo.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::Encoded {
            identity,
            width,
            height,
        } => vec![format!("{}: encoded {}x{}", identity, width, height)],
        ProcessEvent::UpToDate { identity } => vec![format!("{}: up to date", identity)],
        ProcessEvent::Failed { identity, error } => {
            vec![format!("{}: failed ({})", identity, error)]
        }
    }
}

fn strategy_name(strategy: OrderingStrategy) -> &'static str {
    match strategy {
        OrderingStrategy::Recency => "recency",
        OrderingStrategy::Shuffle => "shuffle",
    }
}

pub fn format_build_summary(report: &BuildReport) -> Vec<String> {
    let mut lines = vec![
        totals_line(report.total_files, report.unique_photos),
        format!("Renditions: {}", report.stats),
    ];
    if !report.skipped.is_empty() {
        lines.push("Skipped (no rendition)".to_string());
        for identity in &report.skipped {
            lines.push(format!("{}{}", indent(1), identity));
        }
    }
    lines.extend(unknown_lines(&report.unknown_categories));
    lines.push(format!(
        "Wrote {} ({}) to {}",
        plural(report.emitted.rows, "row", "rows"),
        strategy_name(report.strategy),
        report.emitted.path.display()
    ));
    if let Some(backup) = &report.emitted.backup {
        lines.push(format!("{}Backup: {}", indent(1), backup.display()));
    }
    lines
}

pub fn print_build_summary(report: &BuildReport) {
    print_lines(format_build_summary(report));
}

// ============================================================================
// Maintenance
// ============================================================================

pub fn format_duplicate_report(report: &DuplicateReport) -> Vec<String> {
    let mut lines = vec![
        format!("Total rows: {}", report.total_rows),
        format!("Unique hrefs: {}", report.unique_hrefs),
    ];

    if report.groups.is_empty() {
        lines.push("No duplicate hrefs.".to_string());
    } else {
        lines.push(format!(
            "Hrefs with more than one row: {}",
            report.groups.len()
        ));
        for group in report.groups.iter().take(DETAILED_GROUPS) {
            lines.push(format!("{}{}", indent(1), group.href));
            lines.push(format!(
                "{}{} rows: {}",
                indent(2),
                group.categories.len(),
                group.categories.join(", ")
            ));
        }
        if report.groups.len() > DETAILED_GROUPS {
            lines.push(format!(
                "{}... and {} more",
                indent(1),
                report.groups.len() - DETAILED_GROUPS
            ));
        }
    }

    if report.exact_duplicates > 0 {
        lines.push(format!(
            "Exact href+category duplicates: {}",
            report.exact_duplicates
        ));
    }

    lines.push("Rows per category".to_string());
    for (category, count) in &report.category_counts {
        lines.push(format!("{}{}: {}", indent(1), category, count));
    }

    if report.only_all_duplicates() {
        lines.push(format!(
            "Every duplicate involves an \"all\" row ({} total); \
             run remove-duplicates to keep only category rows.",
            report.all_rows()
        ));
    }
    lines
}

pub fn print_duplicate_report(report: &DuplicateReport) {
    print_lines(format_duplicate_report(report));
}

pub fn format_removal_summary(summary: &RemovalSummary) -> Vec<String> {
    vec![
        format!("Original rows: {}", summary.original),
        format!("Removed: {}", summary.removed),
        format!("Kept: {}", summary.kept),
        format!("{}Backup: {}", indent(1), summary.backup.display()),
    ]
}

pub fn print_removal_summary(summary: &RemovalSummary) {
    print_lines(format_removal_summary(summary));
}

pub fn format_new_photos(photos: &[NewPhoto]) -> Vec<String> {
    if photos.is_empty() {
        return vec!["No new photos.".to_string()];
    }
    let mut lines = vec![format!(
        "{} not in the gallery",
        plural(photos.len(), "photo", "photos")
    )];
    for photo in photos {
        lines.push(format!("{}{}/{}", indent(1), photo.category, photo.file));
        lines.push(format!("{}Would be: {}", indent(2), photo.href));
    }
    lines
}

pub fn print_new_photos(photos: &[NewPhoto]) {
    print_lines(format_new_photos(photos));
}

fn relative<'a>(path: &'a Path, root: &Path) -> std::path::Display<'a> {
    path.strip_prefix(root).unwrap_or(path).display()
}

/// Pending renames, paths shown relative to the source directory.
pub fn format_rename_plans(plans: &[RenamePlan], source_dir: &Path) -> Vec<String> {
    if plans.is_empty() {
        return vec!["Nothing to rename.".to_string()];
    }
    let mut lines = Vec::with_capacity(plans.len() + 1);
    for plan in plans {
        lines.push(format!(
            "{} \u{2192} {}",
            relative(&plan.from, source_dir),
            relative(&plan.to, source_dir)
        ));
    }
    lines.push(format!(
        "{} to rename (run with --apply to rename)",
        plural(plans.len(), "file", "files")
    ));
    lines
}

pub fn print_rename_plans(plans: &[RenamePlan], source_dir: &Path) {
    print_lines(format_rename_plans(plans, source_dir));
}

pub fn format_rename_outcome(outcome: &RenameOutcome, source_dir: &Path) -> Vec<String> {
    let mut lines = vec![format!(
        "Renamed {}",
        plural(outcome.renamed.len(), "file", "files")
    )];
    if !outcome.failed.is_empty() {
        lines.push(format!("Failed: {}", outcome.failed.len()));
        for (plan, error) in &outcome.failed {
            lines.push(format!(
                "{}{}: {}",
                indent(1),
                relative(&plan.from, source_dir),
                error
            ));
        }
    }
    lines
}

pub fn print_rename_outcome(outcome: &RenameOutcome, source_dir: &Path) {
    print_lines(format_rename_outcome(outcome, source_dir));
}
