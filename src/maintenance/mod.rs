//! Maintenance tools that work on a previously emitted artifact or on the
//! photo folders, outside the build.
//!
//! | Tool | Reads | Writes |
//! |---|---|---|
//! | [`check_duplicates`] | artifact | nothing |
//! | [`remove_duplicates`] | artifact | artifact + `.backup` |
//! | [`find_new`] | artifact, gallery folders | optional JSON list |
//! | [`plan_renames`] / [`apply_renames`] | source tree | renamed files |

pub mod artifact;
pub mod duplicates;
pub mod find_new;
pub mod rename;

pub use artifact::{ArtifactError, ParsedArtifact, parse_artifact, read_artifact};
pub use duplicates::{
    DuplicateGroup, DuplicateReport, RemovalSummary, check_duplicates, drop_redundant_all_rows,
    remove_duplicates,
};
pub use find_new::{NewPhoto, find_new, referenced_hrefs, write_new_photos};
pub use rename::{RenameError, RenameOutcome, RenamePlan, apply_renames, plan_renames};
