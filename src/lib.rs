//! # Folio Gallery
//!
//! Build-time gallery generator for a photography portfolio site. Category
//! folders of photos go in; AVIF renditions and one generated TypeScript data
//! file (`galleryItems` + `categories`) come out, ready to be imported by the
//! site's gallery page.
//!
//! # Architecture: One-Shot Pipeline
//!
//! ```text
//! 1. Scan       category folders  →  SourcePhoto list   (one per file copy)
//! 2. Register   SourcePhotos      →  PhotoRecords       (deduplicated by identity, EXIF read once)
//! 3. Transcode  PhotoRecords      →  optimized/*.avif   (skipped when fresh)
//! 4. Order      ProcessedPhotos   →  display sequence   (recency or shuffle, then brickwork)
//! 5. Emit       display sequence  →  gallery.ts         (atomic write, optional backup)
//! ```
//!
//! Every stage hands its output to the next by value; a run keeps no state
//! beyond the renditions on disk and the optional freshness manifest.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`naming`] | Filename tags (`DSC0042 #bw #street.jpg`), identity, labels, rendition names |
//! | [`metadata`] | EXIF normalization into display strings, camera aliases, lens rewrites |
//! | [`scan`] | Walks the configured category folders |
//! | [`registry`] | Deduplicates photos across folders |
//! | [`imaging`] | Pure-Rust image operations behind the [`imaging::ImageBackend`] trait |
//! | [`cache`] | Staleness checks for renditions (mtime or content hash) |
//! | [`process`] | Transcodes every record in parallel |
//! | [`ordering`] | Recency sort, sequence-spreading shuffle, brickwork layout pass |
//! | [`emit`] | Renders and writes the TypeScript artifact |
//! | [`pipeline`] | Wires the stages into `build` and `survey` |
//! | [`maintenance`] | Duplicate report/removal, new-photo finder, camera-less file renamer |
//! | [`config`] | `gallery.toml` loading over stock defaults, validation |
//! | [`output`] | CLI report formatting |
//! | [`types`] | Emitted shapes: `GalleryItem`, `Category`, `Orientation` |
//!
//! # Design Decisions
//!
//! ## Tags Live in Filenames
//!
//! A photo's categories are written into its filename (`#bw`), so the same
//! file can be copied into several folders and still dedupe to one record.
//! Untagged files fall back to the folder they were found in.
//!
//! ## Emission Follows the Strategy
//!
//! Recency builds emit one row per photo with `category: "all"` and the full
//! category list; the site filters on `categories`. Shuffle builds emit an
//! `all` row per photo followed by one row per category, which is what older
//! site revisions filter on. The maintenance tools understand both.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate (Lanczos3 resampling) and
//! `rav1e` (AVIF encoding), so the binary has no system dependencies.

pub mod cache;
pub mod config;
pub mod emit;
pub mod imaging;
pub mod maintenance;
pub mod metadata;
pub mod naming;
pub mod ordering;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod registry;
pub mod scan;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
