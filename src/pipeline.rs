//! End-to-end build: scan → register → transcode → order → emit.
//!
//! Every stage takes the previous stage's output by value and nothing is
//! shared between runs. The artifact is written last, after the whole item
//! list exists in memory, so an interrupted build leaves the previous
//! artifact in place (already-encoded renditions stay on disk and are picked
//! up as fresh next time).

use crate::cache::{CacheStats, freshness_for};
use crate::config::{GalleryConfig, OrderingStrategy};
use crate::emit::{EmissionMode, EmitError, EmitSummary, build_items, emit, taxonomy};
use crate::imaging::ImageBackend;
use crate::metadata::Normalizer;
use crate::ordering::{arrange, rng_for};
use crate::process::{ProcessError, ProcessEvent, ProcessedPhoto, TranscodeSettings, transcode_all};
use crate::registry::{PhotoRecord, PhotoRegistry, build_registry, unknown_categories};
use crate::scan::{FolderScan, ScanError, scan};
use log::{info, warn};
use std::collections::HashSet;
use std::path::Path;
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),
    #[error("Transcode failed: {0}")]
    Process(#[from] ProcessError),
    #[error("Emit failed: {0}")]
    Emit(#[from] EmitError),
}

/// Command-line overrides applied on top of the loaded config.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Re-encode every rendition regardless of freshness.
    pub no_cache: bool,
    pub seed: Option<u64>,
    pub strategy: Option<OrderingStrategy>,
}

/// What the scan and registry stages found.
#[derive(Debug)]
pub struct Survey {
    pub folders: Vec<FolderScan>,
    /// Image files seen across all folders, copies included.
    pub total_files: usize,
    pub records: Vec<PhotoRecord>,
    /// Categories found in filename tags that are not configured.
    pub unknown_categories: Vec<String>,
}

impl Survey {
    /// Records carrying more than one category.
    pub fn multi_category(&self) -> impl Iterator<Item = &PhotoRecord> {
        self.records.iter().filter(|r| r.categories.len() > 1)
    }
}

#[derive(Debug)]
pub struct BuildReport {
    pub folders: Vec<FolderScan>,
    pub total_files: usize,
    pub unique_photos: usize,
    pub unknown_categories: Vec<String>,
    pub stats: CacheStats,
    /// Identities left out of the artifact because they have no rendition.
    pub skipped: Vec<String>,
    pub strategy: OrderingStrategy,
    pub emitted: EmitSummary,
}

fn normalizer_for(config: &GalleryConfig) -> Normalizer {
    Normalizer {
        camera_aliases: config.metadata.camera_aliases.clone(),
        lens_rewrites: config.metadata.lens_rewrites.clone(),
    }
}

fn register_all(
    root: &Path,
    config: &GalleryConfig,
    backend: &impl ImageBackend,
) -> Result<(Survey, PhotoRegistry), ScanError> {
    let paths = config.paths.resolve(root);
    let scanned = scan(&paths.gallery_dir, config)?;
    let total_files = scanned.photos.len();
    let registry = build_registry(
        scanned.photos,
        config.marker(),
        normalizer_for(config),
        backend,
    );

    let known: HashSet<&str> = config.categories.iter().map(|c| c.id.as_str()).collect();
    let unknown: Vec<String> = unknown_categories(registry.records(), &known)
        .into_iter()
        .map(String::from)
        .collect();
    if !unknown.is_empty() {
        warn!("Tags that are not configured categories: {}", unknown.join(", "));
    }
    info!(
        "Found {} photo file(s), {} unique",
        total_files,
        registry.len()
    );

    Ok((
        Survey {
            folders: scanned.folders,
            total_files,
            records: Vec::new(),
            unknown_categories: unknown,
        },
        registry,
    ))
}

/// Scan and deduplicate without transcoding or writing anything.
pub fn survey(
    root: &Path,
    config: &GalleryConfig,
    backend: &impl ImageBackend,
) -> Result<Survey, PipelineError> {
    let (mut survey, registry) = register_all(root, config, backend)?;
    survey.records = registry.into_records();
    Ok(survey)
}

/// Run the whole build and write the artifact.
pub fn build(
    root: &Path,
    config: &GalleryConfig,
    options: &BuildOptions,
    backend: &impl ImageBackend,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<BuildReport, PipelineError> {
    let paths = config.paths.resolve(root);
    let (survey, registry) = register_all(root, config, backend)?;
    let unique_photos = registry.len();

    let settings = TranscodeSettings::from_config(config, &paths);
    let freshness = freshness_for(config.cache.freshness, &paths, options.no_cache);
    let transcoded = transcode_all(
        backend,
        freshness.as_ref(),
        &settings,
        registry.into_records(),
        progress,
    )?;

    let (optimized, unoptimized): (Vec<ProcessedPhoto>, Vec<ProcessedPhoto>) =
        transcoded.photos.into_iter().partition(ProcessedPhoto::optimized);
    let skipped: Vec<String> = unoptimized.into_iter().map(|p| p.record.identity).collect();
    if !skipped.is_empty() {
        warn!("{} photo(s) have no rendition and are left out", skipped.len());
    }

    let mut ordering = config.ordering.clone();
    if let Some(strategy) = options.strategy {
        ordering.strategy = strategy;
    }
    if options.seed.is_some() {
        ordering.seed = options.seed;
    }
    let mut rng = rng_for(ordering.seed);
    let ordered = arrange(optimized, &ordering, &mut rng);

    let mode = EmissionMode::for_strategy(ordering.strategy, &config.emit);
    let items = build_items(&ordered, mode);
    let emitted = emit(
        &paths.output_file,
        &items,
        &taxonomy(config),
        config.emit.keep_backup,
    )?;

    Ok(BuildReport {
        folders: survey.folders,
        total_files: survey.total_files,
        unique_photos,
        unknown_categories: survey.unknown_categories,
        stats: transcoded.stats,
        skipped,
        strategy: ordering.strategy,
        emitted,
    })
}
