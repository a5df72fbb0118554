//! Gallery configuration module.
//!
//! Handles loading, validating, and merging `gallery.toml`. The file is
//! optional and sparse: stock defaults are serialized to a TOML table, the
//! user file is deep-merged on top, and the result is deserialized and
//! validated.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [paths]
//! gallery_dir = "public/gallery"            # Category folders live here
//! optimized_dir = "public/gallery/optimized"
//! output_file = "src/data/gallery.ts"
//! href_prefix = "/gallery/optimized"        # Public URL of optimized_dir
//! source_dir = "gallery-source"             # Tree the renamer works on
//!
//! [[categories]]                            # Scan order = declaration order
//! folder = "street"
//! id = "street"
//! label = "Street Photography"
//!
//! [tags]
//! marker = "#"
//!
//! [images]
//! max_width = 2400
//! max_height = 2400
//! quality = 80
//!
//! [thumbnails]
//! enabled = false
//! max_width = 600
//! max_height = 600
//! quality = 60
//!
//! [ordering]
//! strategy = "recency"                      # or "shuffle"
//! randomize = false
//! # seed = 42
//! brickwork = true
//! columns = 3
//! lookahead = 6
//!
//! [emit]
//! keep_backup = true
//! skip_variant_copies = true
//!
//! [cache]
//! freshness = "mtime"                       # or "content"
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Arrays (`categories`, `metadata.camera_aliases`, `metadata.lens_rewrites`)
//! replace the defaults wholesale rather than being merged element-wise.
//!
//! Unknown keys are rejected to catch typos early.

use crate::metadata::{CameraAlias, LensRewrite, default_camera_aliases, default_lens_rewrites};
use crate::types::ALL_CATEGORY;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Gallery configuration loaded from `gallery.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryConfig {
    /// Project-relative input and output locations.
    pub paths: PathsConfig,
    /// Category folders in scan order.
    pub categories: Vec<CategoryConfig>,
    /// Filename tag syntax.
    pub tags: TagsConfig,
    /// Main rendition settings.
    pub images: ImagesConfig,
    /// Optional thumbnail rendition settings.
    pub thumbnails: ThumbnailsConfig,
    /// Display order settings.
    pub ordering: OrderingConfig,
    /// Artifact writing settings.
    pub emit: EmitConfig,
    /// Staleness check settings.
    pub cache: CacheConfig,
    /// Camera/lens rewrite tables.
    pub metadata: MetadataConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            categories: default_categories(),
            tags: TagsConfig::default(),
            images: ImagesConfig::default(),
            thumbnails: ThumbnailsConfig::default(),
            ordering: OrderingConfig::default(),
            emit: EmitConfig::default(),
            cache: CacheConfig::default(),
            metadata: MetadataConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl GalleryConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg: &str| Err(ConfigError::Validation(msg.into()));

        for (name, quality) in [
            ("images.quality", self.images.quality),
            ("thumbnails.quality", self.thumbnails.quality),
        ] {
            if !(1..=100).contains(&quality) {
                return Err(ConfigError::Validation(format!("{name} must be 1-100")));
            }
        }
        if self.images.max_width == 0 || self.images.max_height == 0 {
            return fail("images bounding box must be non-zero");
        }
        if self.thumbnails.max_width == 0 || self.thumbnails.max_height == 0 {
            return fail("thumbnails bounding box must be non-zero");
        }
        if self.thumbnails.max_width > self.images.max_width
            || self.thumbnails.max_height > self.images.max_height
        {
            return fail("thumbnails bounding box must not exceed the images bounding box");
        }
        if self.categories.is_empty() {
            return fail("at least one category must be configured");
        }

        let mut seen = HashSet::new();
        for category in &self.categories {
            if category.id.is_empty() || category.folder.is_empty() {
                return fail("category id and folder must not be empty");
            }
            if category.id == ALL_CATEGORY {
                return fail("category id \"all\" is reserved");
            }
            if category.id != category.id.to_lowercase() {
                return Err(ConfigError::Validation(format!(
                    "category id {:?} must be lowercase",
                    category.id
                )));
            }
            if !seen.insert(category.id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate category id {:?}",
                    category.id
                )));
            }
        }

        let mut marker = self.tags.marker.chars();
        match (marker.next(), marker.next()) {
            (Some(c), None) if !(c.is_alphanumeric() || c == '_' || c.is_whitespace()) => {}
            _ => return fail("tags.marker must be a single punctuation character"),
        }

        if self.ordering.columns == 0 {
            return fail("ordering.columns must be at least 1");
        }
        Ok(())
    }

    /// Tag marker as a `char`. Only meaningful on a validated config.
    pub fn marker(&self) -> char {
        self.tags.marker.chars().next().unwrap_or('#')
    }

    /// Look up the configured category for a folder name.
    pub fn category_for_folder(&self, folder: &str) -> Option<&CategoryConfig> {
        self.categories.iter().find(|c| c.folder == folder)
    }

    /// Whether a category id is declared in the taxonomy.
    pub fn is_known_category(&self, id: &str) -> bool {
        self.categories.iter().any(|c| c.id == id)
    }
}

/// Project-relative locations. Resolved against `--root` by [`PathsConfig::resolve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub gallery_dir: String,
    pub optimized_dir: String,
    pub output_file: String,
    pub href_prefix: String,
    pub source_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            gallery_dir: "public/gallery".to_string(),
            optimized_dir: "public/gallery/optimized".to_string(),
            output_file: "src/data/gallery.ts".to_string(),
            href_prefix: "/gallery/optimized".to_string(),
            source_dir: "gallery-source".to_string(),
        }
    }
}

/// [`PathsConfig`] with every path joined onto the project root.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPaths {
    pub gallery_dir: PathBuf,
    pub optimized_dir: PathBuf,
    pub output_file: PathBuf,
    pub source_dir: PathBuf,
    pub href_prefix: String,
}

impl PathsConfig {
    pub fn resolve(&self, root: &Path) -> ResolvedPaths {
        ResolvedPaths {
            gallery_dir: root.join(&self.gallery_dir),
            optimized_dir: root.join(&self.optimized_dir),
            output_file: root.join(&self.output_file),
            source_dir: root.join(&self.source_dir),
            href_prefix: self.href_prefix.trim_end_matches('/').to_string(),
        }
    }
}

/// One category folder: where it lives, its id, and its filter label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryConfig {
    pub folder: String,
    pub id: String,
    pub label: String,
}

fn default_categories() -> Vec<CategoryConfig> {
    [
        ("street", "Street Photography"),
        ("landscape", "Landscape"),
        ("architecture", "Architecture"),
        ("portrait", "Portrait"),
        ("abstract", "Abstract"),
        ("bw", "B&W"),
    ]
    .into_iter()
    .map(|(id, label)| CategoryConfig {
        folder: id.to_string(),
        id: id.to_string(),
        label: label.to_string(),
    })
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TagsConfig {
    pub marker: String,
}

impl Default for TagsConfig {
    fn default() -> Self {
        Self {
            marker: "#".to_string(),
        }
    }
}

/// Main rendition settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Bounding box; sources are never upscaled.
    pub max_width: u32,
    pub max_height: u32,
    /// AVIF encoding quality (1 = worst, 100 = best).
    pub quality: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            max_width: 2400,
            max_height: 2400,
            quality: 80,
        }
    }
}

/// Thumbnail rendition settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailsConfig {
    pub enabled: bool,
    pub max_width: u32,
    pub max_height: u32,
    pub quality: u32,
}

impl Default for ThumbnailsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_width: 600,
            max_height: 600,
            quality: 60,
        }
    }
}

/// How the unique photos are ordered for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OrderingStrategy {
    /// Newest first by source modification time.
    #[default]
    Recency,
    /// Spread consecutive capture numbers apart.
    Shuffle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrderingConfig {
    pub strategy: OrderingStrategy,
    /// Shuffle only: perturb the interleave with a random source.
    pub randomize: bool,
    /// Seed for the random source. Absent means seeded from entropy.
    pub seed: Option<u64>,
    pub brickwork: bool,
    /// Grid column count the brickwork pass assumes.
    pub columns: usize,
    /// How far down a column the brickwork pass looks for a swap partner.
    pub lookahead: usize,
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            strategy: OrderingStrategy::Recency,
            randomize: false,
            seed: None,
            brickwork: true,
            columns: 3,
            lookahead: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmitConfig {
    /// Copy the previous artifact to `<file>.backup` before overwriting.
    pub keep_backup: bool,
    /// Per-category emission: no `all` row for `DSC1234-2` style copies.
    pub skip_variant_copies: bool,
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            keep_backup: true,
            skip_variant_copies: true,
        }
    }
}

/// Which staleness check decides whether a rendition must be re-encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FreshnessMode {
    /// Destination newer than source.
    #[default]
    Mtime,
    /// SHA-256 of source bytes and encode parameters.
    Content,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub freshness: FreshnessMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetadataConfig {
    pub camera_aliases: Vec<CameraAlias>,
    pub lens_rewrites: Vec<LensRewrite>,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            camera_aliases: default_camera_aliases(),
            lens_rewrites: default_lens_rewrites(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(GalleryConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<GalleryConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: GalleryConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the given `gallery.toml` path.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the stock defaults.
pub fn load_config(path: &Path) -> Result<GalleryConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `gallery.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Folio Gallery Configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Paths (relative to the project root)
# ---------------------------------------------------------------------------
[paths]
# Directory holding one sub-folder per category.
gallery_dir = "public/gallery"

# Where optimized renditions are written.
optimized_dir = "public/gallery/optimized"

# Generated TypeScript data module.
output_file = "src/data/gallery.ts"

# Public URL under which optimized_dir is served.
href_prefix = "/gallery/optimized"

# Tree scanned by the `rename` maintenance command.
source_dir = "gallery-source"

# ---------------------------------------------------------------------------
# Categories, scanned in the order declared here.
# A photo found in several folders keeps the first one as its source file.
# ---------------------------------------------------------------------------
[[categories]]
folder = "street"
id = "street"
label = "Street Photography"

[[categories]]
folder = "landscape"
id = "landscape"
label = "Landscape"

[[categories]]
folder = "architecture"
id = "architecture"
label = "Architecture"

[[categories]]
folder = "portrait"
id = "portrait"
label = "Portrait"

[[categories]]
folder = "abstract"
id = "abstract"
label = "Abstract"

[[categories]]
folder = "bw"
id = "bw"
label = "B&W"

# ---------------------------------------------------------------------------
# Filename tags: "DSC001 #bw #street.jpg" belongs to bw and street.
# ---------------------------------------------------------------------------
[tags]
marker = "#"

# ---------------------------------------------------------------------------
# Main renditions (AVIF)
# ---------------------------------------------------------------------------
[images]
# Bounding box. Smaller sources are never upscaled.
max_width = 2400
max_height = 2400

# AVIF encoding quality (1 = worst, 100 = best).
quality = 80

# ---------------------------------------------------------------------------
# Thumbnails (AVIF, written as <name>-thumb.avif)
# ---------------------------------------------------------------------------
[thumbnails]
enabled = false
max_width = 600
max_height = 600
quality = 60

# ---------------------------------------------------------------------------
# Display order
# ---------------------------------------------------------------------------
[ordering]
# "recency": newest first, one row per photo.
# "shuffle": spread consecutive frame numbers apart, one row per category.
strategy = "recency"

# Shuffle only: perturb the interleave randomly.
randomize = false

# Fix the random source for reproducible shuffles.
# seed = 42

# Avoid stacking portrait photos in the grid.
brickwork = true
columns = 3
lookahead = 6

# ---------------------------------------------------------------------------
# Artifact writing
# ---------------------------------------------------------------------------
[emit]
# Keep the previous artifact as <output_file>.backup.
keep_backup = true

# Shuffle emission: leave numbered copies (DSC1234-2) out of the "all" view.
skip_variant_copies = true

# ---------------------------------------------------------------------------
# Re-encoding decisions
# ---------------------------------------------------------------------------
[cache]
# "mtime": re-encode when the source is newer than the rendition.
# "content": re-encode when the source bytes or encode settings change.
freshness = "mtime"

# ---------------------------------------------------------------------------
# Caption metadata rewrites
# ---------------------------------------------------------------------------
[metadata]
# Exact make/model pairs shown under a friendlier name.
camera_aliases = [
    { make = "SONY", model = "ILCE-7M3", alias = "Sony A7 III" },
    { make = "SONY", model = "ILCE-7M4", alias = "Sony A7 IV" },
    { make = "SONY", model = "ILCE-6400", alias = "Sony A6400" },
    { make = "NIKON CORPORATION", model = "NIKON Z 6_2", alias = "Nikon Z6 II" },
    { make = "FUJIFILM", model = "X100V", alias = "Fujifilm X100V" },
]

# Lens strings containing `contains` are cut after `keep_through`.
lens_rewrites = [
    { contains = "back triple camera", keep_through = "back triple camera" },
    { contains = "back dual wide camera", keep_through = "back dual wide camera" },
    { contains = "back dual camera", keep_through = "back dual camera" },
    { contains = "back camera", keep_through = "back camera" },
    { contains = "front camera", keep_through = "front camera" },
]

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
