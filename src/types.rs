//! Shared types emitted into the generated gallery artifact.
//!
//! These are serialized into `src/data/gallery.ts` by [`crate::emit`] and read
//! back by the [`crate::maintenance`] tools, so both directions go through the
//! same serde definitions. Field names are camelCase to match what the page
//! templates import.

use crate::metadata::Metadata;
use serde::{Deserialize, Serialize};

/// Category id reserved for the unfiltered view.
pub const ALL_CATEGORY: &str = "all";

/// Orientation of a rendition, derived from its pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
    Square,
}

impl Orientation {
    /// Classify by aspect ratio:
    /// - `|w/h - 1| < 0.1` → square
    /// - `w/h > 1.2` → landscape
    /// - anything else → portrait
    ///
    /// Ratios between 1.1 and 1.2 therefore classify as portrait.
    pub fn classify(width: u32, height: u32) -> Self {
        if height == 0 {
            return Orientation::Landscape;
        }
        let ratio = width as f64 / height as f64;
        if (ratio - 1.0).abs() < 0.1 {
            Orientation::Square
        } else if ratio > 1.2 {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }

    pub fn is_portrait(self) -> bool {
        self == Orientation::Portrait
    }
}

/// One entry of the category filter taxonomy.
///
/// Serialized as `{ "value": ..., "label": ... }`, the shape the filter bar
/// consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "value")]
    pub id: String,
    pub label: String,
}

impl Category {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    /// The leading `all` entry of every taxonomy.
    pub fn all() -> Self {
        Self::new(ALL_CATEGORY, "All")
    }
}

/// One row of the emitted gallery list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItem {
    pub label: String,
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_category: Option<String>,
    /// Every category the photo belongs to (single-emission mode only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default)]
    pub aspect_ratio: String,
    /// Source modification time, milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<u64>,
    #[serde(default)]
    pub metadata: Metadata,
}
