//! Rendition generation.
//!
//! Takes the frozen registry and produces one AVIF rendition per unique photo
//! (plus an optional thumbnail), skipping encodes the [`Freshness`] check says
//! are already up to date.
//!
//! ## Output Structure
//!
//! ```text
//! public/gallery/optimized/        # paths.optimized_dir
//! ├── .freshness.json              # content-hash manifest (cache.freshness = "content")
//! ├── .sources.json                # which source each rendition was written from
//! ├── DSC0042.avif                 # fits within images.max_width x max_height
//! ├── DSC0042-thumb.avif           # only with thumbnails.enabled
//! └── golden-hour.avif
//! ```
//!
//! ## Failures
//!
//! Failures are per photo and never abort the stage. A photo whose source
//! cannot be identified or encoded, or whose rendition is missing or empty
//! after the encode, comes back without a [`Rendition`] and is left out of the
//! emitted gallery. A failed thumbnail only drops the thumbnail.
//!
//! ## Parallel Processing
//!
//! Photos are processed in parallel using [rayon](https://docs.rs/rayon);
//! results keep registry order. The pool size comes from
//! `processing.max_processes`.

use crate::cache::{CacheStats, Freshness};
use crate::config::{GalleryConfig, ResolvedPaths};
use crate::imaging::{
    BackendError, ImageBackend, RenditionSpec, aspect_ratio_string, create_rendition,
    create_thumbnail, get_dimensions,
};
use crate::registry::PhotoRecord;
use crate::types::Orientation;
use log::{debug, warn};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image processing failed: {0}")]
    Imaging(#[from] BackendError),
    #[error("Rendition {0} is missing or empty after encoding")]
    EmptyOutput(PathBuf),
}

/// What to produce and where.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeSettings {
    pub optimized_dir: PathBuf,
    pub href_prefix: String,
    pub main: RenditionSpec,
    pub thumbnail: Option<RenditionSpec>,
}

impl TranscodeSettings {
    pub fn from_config(config: &GalleryConfig, paths: &ResolvedPaths) -> Self {
        let thumbnail = config.thumbnails.enabled.then(|| {
            RenditionSpec::thumbnail(
                config.thumbnails.max_width,
                config.thumbnails.max_height,
                config.thumbnails.quality,
            )
        });
        Self {
            optimized_dir: paths.optimized_dir.clone(),
            href_prefix: paths.href_prefix.clone(),
            main: RenditionSpec::main(
                config.images.max_width,
                config.images.max_height,
                config.images.quality,
            ),
            thumbnail,
        }
    }

    fn href(&self, filename: &str) -> String {
        rendition_href(&self.href_prefix, filename)
    }
}

/// Public URL of a rendition file under `href_prefix`.
pub fn rendition_href(href_prefix: &str, filename: &str) -> String {
    if href_prefix.is_empty() {
        filename.to_string()
    } else {
        format!("{}/{}", href_prefix, filename)
    }
}

/// Shape of an optimized image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Optimized {
    pub width: u32,
    pub height: u32,
    pub orientation: Orientation,
    pub aspect_ratio: String,
    /// False when the existing file was up to date and left untouched.
    pub encoded: bool,
}

/// A deployable rendition of one photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendition {
    pub path: PathBuf,
    pub href: String,
    pub thumbnail_href: Option<String>,
    pub width: u32,
    pub height: u32,
    pub orientation: Orientation,
    pub aspect_ratio: String,
}

/// A registry record after the transcode stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedPhoto {
    pub record: PhotoRecord,
    /// `None` when the photo could not be optimized.
    pub rendition: Option<Rendition>,
}

impl ProcessedPhoto {
    pub fn optimized(&self) -> bool {
        self.rendition.is_some()
    }
}

/// Progress events, one per photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Encoded { identity: String, width: u32, height: u32 },
    UpToDate { identity: String },
    Failed { identity: String, error: String },
}

#[derive(Debug)]
pub struct TranscodeResult {
    pub photos: Vec<ProcessedPhoto>,
    pub stats: CacheStats,
}

impl TranscodeResult {
    /// Photos with a usable rendition, in registry order.
    pub fn optimized(&self) -> impl Iterator<Item = &ProcessedPhoto> {
        self.photos.iter().filter(|p| p.optimized())
    }
}

/// Resize `source` into `destination` unless the existing file is fresh.
///
/// The source is always identified. A skipped encode reports the dimensions
/// read from the existing rendition's header, since it may have been written
/// under different size settings; an unreadable header forces a re-encode.
pub fn optimize(
    backend: &impl ImageBackend,
    freshness: &dyn Freshness,
    source: &Path,
    destination: &Path,
    spec: &RenditionSpec,
) -> Result<Optimized, ProcessError> {
    render(backend, freshness, source, destination, spec, create_rendition)
}

/// Thumbnail counterpart of [`optimize`]: smaller box, lower quality, light sharpening.
pub fn thumbnail(
    backend: &impl ImageBackend,
    freshness: &dyn Freshness,
    source: &Path,
    destination: &Path,
    spec: &RenditionSpec,
) -> Result<Optimized, ProcessError> {
    render(backend, freshness, source, destination, spec, create_thumbnail)
}

fn render<B: ImageBackend>(
    backend: &B,
    freshness: &dyn Freshness,
    source: &Path,
    destination: &Path,
    spec: &RenditionSpec,
    encode: impl FnOnce(&B, &Path, &Path, (u32, u32), &RenditionSpec) -> Result<(u32, u32), BackendError>,
) -> Result<Optimized, ProcessError> {
    let source_dims = get_dimensions(backend, source)?;
    let params = spec.fingerprint();

    let existing = if freshness.is_stale(source, destination, &params) {
        None
    } else {
        match backend.identify(destination) {
            Ok(dims) => Some((dims.width, dims.height)),
            Err(e) => {
                debug!("Re-encoding unreadable {}: {}", destination.display(), e);
                None
            }
        }
    };

    let (width, height, encoded) = match existing {
        Some((w, h)) => (w, h, false),
        None => {
            let (w, h) = encode(backend, source, destination, source_dims, spec)?;
            verify_output(destination)?;
            freshness.record(source, destination, &params);
            (w, h, true)
        }
    };

    Ok(Optimized {
        width,
        height,
        orientation: Orientation::classify(width, height),
        aspect_ratio: aspect_ratio_string(width, height),
        encoded,
    })
}

fn verify_output(path: &Path) -> Result<(), ProcessError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => Ok(()),
        _ => Err(ProcessError::EmptyOutput(path.to_path_buf())),
    }
}

/// Per-photo outcome before aggregation.
struct PhotoOutcome {
    photo: ProcessedPhoto,
    stats: CacheStats,
}

fn transcode_one(
    backend: &impl ImageBackend,
    freshness: &dyn Freshness,
    settings: &TranscodeSettings,
    record: PhotoRecord,
    progress: Option<&Sender<ProcessEvent>>,
) -> PhotoOutcome {
    let mut stats = CacheStats::default();
    let filename = format!("{}.avif", record.rendition_stem);
    let destination = settings.optimized_dir.join(&filename);

    let main = match optimize(backend, freshness, &record.source_path, &destination, &settings.main) {
        Ok(main) => main,
        Err(e) => {
            warn!("Failed to optimize {}: {}", record.source_path.display(), e);
            stats.failed += 1;
            if let Some(tx) = progress {
                tx.send(ProcessEvent::Failed {
                    identity: record.identity.clone(),
                    error: e.to_string(),
                })
                .ok();
            }
            return PhotoOutcome {
                photo: ProcessedPhoto {
                    record,
                    rendition: None,
                },
                stats,
            };
        }
    };

    if main.encoded {
        stats.encoded += 1;
    } else {
        stats.fresh += 1;
        debug!("{} is up to date", destination.display());
    }
    if let Some(tx) = progress {
        let event = if main.encoded {
            ProcessEvent::Encoded {
                identity: record.identity.clone(),
                width: main.width,
                height: main.height,
            }
        } else {
            ProcessEvent::UpToDate {
                identity: record.identity.clone(),
            }
        };
        tx.send(event).ok();
    }

    let thumbnail_href = settings.thumbnail.as_ref().and_then(|spec| {
        let thumb_name = format!("{}-thumb.avif", record.rendition_stem);
        let thumb_path = settings.optimized_dir.join(&thumb_name);
        match thumbnail(backend, freshness, &record.source_path, &thumb_path, spec) {
            Ok(_) => Some(settings.href(&thumb_name)),
            Err(e) => {
                warn!("Failed to create thumbnail for {}: {}", record.source_path.display(), e);
                None
            }
        }
    });

    PhotoOutcome {
        photo: ProcessedPhoto {
            rendition: Some(Rendition {
                href: settings.href(&filename),
                path: destination,
                thumbnail_href,
                width: main.width,
                height: main.height,
                orientation: main.orientation,
                aspect_ratio: main.aspect_ratio,
            }),
            record,
        },
        stats,
    }
}

/// Transcode every record. Only a failure to create the output directory
/// or persist the freshness state is an error.
pub fn transcode_all(
    backend: &impl ImageBackend,
    freshness: &dyn Freshness,
    settings: &TranscodeSettings,
    records: Vec<PhotoRecord>,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<TranscodeResult, ProcessError> {
    std::fs::create_dir_all(&settings.optimized_dir)?;

    let outcomes: Vec<PhotoOutcome> = records
        .into_par_iter()
        .map(|record| transcode_one(backend, freshness, settings, record, progress.as_ref()))
        .collect();

    freshness.persist()?;

    let mut stats = CacheStats::default();
    let photos = outcomes
        .into_iter()
        .map(|outcome| {
            stats += outcome.stats;
            outcome.photo
        })
        .collect();

    Ok(TranscodeResult { photos, stats })
}
