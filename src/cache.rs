//! Staleness checks for incremental builds.
//!
//! AVIF encoding dominates build time, so the transcode stage asks a
//! [`Freshness`] implementation whether a rendition needs rebuilding before it
//! touches the encoder. Everything else (identify, EXIF, ordering, emission)
//! always runs.
//!
//! Three implementations:
//!
//! - [`MtimeFreshness`]: the rendition is fresh when it exists, is non-empty,
//!   and its modification time is strictly newer than the source's. Cheap,
//!   but a `git checkout` that resets timestamps forces a rebuild.
//! - [`ContentFreshness`]: the rendition is fresh when it exists and the
//!   manifest records the same SHA-256 of the source bytes and of the encode
//!   parameters ([`RenditionSpec::fingerprint`](crate::imaging::RenditionSpec::fingerprint)).
//!   Survives timestamp churn and notices quality or size changes.
//! - [`ForceRebuild`]: everything is stale (`--no-cache`).
//!
//! [`freshness_for`] wraps whichever check is configured in [`OwnedFreshness`],
//! which also requires that a rendition was last written from the same
//! source file. Rendition stems are handed out per run, so a newly added
//! photo can be given a file name that an older photo's rendition already
//! occupies; without the ownership check that rendition would look fresh.
//!
//! ## Storage
//!
//! The content manifest is a JSON file at `<optimized_dir>/.freshness.json`
//! and the ownership ledger is `<optimized_dir>/.sources.json`, both keyed by
//! rendition file name. A missing, corrupt, or old-version file loads as
//! empty, which simply means one full rebuild.

use crate::config::{FreshnessMode, ResolvedPaths};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Name of the content manifest within the optimized directory.
const MANIFEST_FILENAME: &str = ".freshness.json";

/// Name of the rendition ownership ledger within the optimized directory.
const LEDGER_FILENAME: &str = ".sources.json";

/// Bump to invalidate every existing manifest.
const MANIFEST_VERSION: u32 = 1;

/// Decides whether a rendition must be rebuilt.
///
/// `Sync` because the transcode stage consults it from rayon workers.
pub trait Freshness: Sync {
    /// True when `destination` is missing or out of date for `source`
    /// encoded with parameters `params`.
    fn is_stale(&self, source: &Path, destination: &Path, params: &str) -> bool;

    /// Note that `destination` was just written from `source`.
    fn record(&self, _source: &Path, _destination: &Path, _params: &str) {}

    /// Flush any state to disk.
    fn persist(&self) -> io::Result<()> {
        Ok(())
    }
}

fn non_empty(path: &Path) -> Option<fs::Metadata> {
    fs::metadata(path).ok().filter(|m| m.is_file() && m.len() > 0)
}

/// Destination strictly newer than source.
#[derive(Debug, Default, Clone, Copy)]
pub struct MtimeFreshness;

impl Freshness for MtimeFreshness {
    fn is_stale(&self, source: &Path, destination: &Path, _params: &str) -> bool {
        let Some(dest_meta) = non_empty(destination) else {
            return true;
        };
        let source_time = fs::metadata(source).and_then(|m| m.modified());
        let dest_time = dest_meta.modified();
        match (source_time, dest_time) {
            (Ok(src), Ok(dst)) => dst <= src,
            _ => true,
        }
    }
}

/// Every rendition is stale.
#[derive(Debug, Default, Clone, Copy)]
pub struct ForceRebuild;

impl Freshness for ForceRebuild {
    fn is_stale(&self, _source: &Path, _destination: &Path, _params: &str) -> bool {
        true
    }
}

/// Hashes recorded for one rendition.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct ManifestEntry {
    pub source_hash: String,
    pub params_hash: String,
}

/// On-disk map from rendition file name to the hashes it was built from.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FreshnessManifest {
    pub version: u32,
    pub entries: HashMap<String, ManifestEntry>,
}

impl FreshnessManifest {
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: HashMap::new(),
        }
    }

    /// Load from the optimized directory, falling back to empty.
    pub fn load(optimized_dir: &Path) -> Self {
        let Ok(content) = fs::read_to_string(manifest_path(optimized_dir)) else {
            return Self::empty();
        };
        match serde_json::from_str::<Self>(&content) {
            Ok(m) if m.version == MANIFEST_VERSION => m,
            _ => Self::empty(),
        }
    }

    pub fn save(&self, optimized_dir: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(manifest_path(optimized_dir), json)
    }
}

/// SHA-256 of source bytes and encode parameters.
pub struct ContentFreshness {
    optimized_dir: PathBuf,
    manifest: Mutex<FreshnessManifest>,
    /// Source hashes computed this run, so `record` doesn't re-read the file.
    source_hashes: Mutex<HashMap<PathBuf, String>>,
}

impl ContentFreshness {
    pub fn load(optimized_dir: &Path) -> Self {
        Self {
            optimized_dir: optimized_dir.to_path_buf(),
            manifest: Mutex::new(FreshnessManifest::load(optimized_dir)),
            source_hashes: Mutex::new(HashMap::new()),
        }
    }

    fn key(&self, destination: &Path) -> String {
        rendition_key(&self.optimized_dir, destination)
    }

    fn source_hash(&self, source: &Path) -> Option<String> {
        if let Ok(memo) = self.source_hashes.lock()
            && let Some(hash) = memo.get(source)
        {
            return Some(hash.clone());
        }
        let hash = hash_file(source).ok()?;
        if let Ok(mut memo) = self.source_hashes.lock() {
            memo.insert(source.to_path_buf(), hash.clone());
        }
        Some(hash)
    }

    /// Snapshot of the current manifest.
    pub fn manifest(&self) -> FreshnessManifest {
        self.manifest
            .lock()
            .map(|m| m.clone())
            .unwrap_or_else(|_| FreshnessManifest::empty())
    }
}

impl Freshness for ContentFreshness {
    fn is_stale(&self, source: &Path, destination: &Path, params: &str) -> bool {
        if non_empty(destination).is_none() {
            return true;
        }
        let Some(source_hash) = self.source_hash(source) else {
            return true;
        };
        let expected = ManifestEntry {
            source_hash,
            params_hash: hash_params(params),
        };
        let Ok(manifest) = self.manifest.lock() else {
            return true;
        };
        manifest.entries.get(&self.key(destination)) != Some(&expected)
    }

    fn record(&self, source: &Path, destination: &Path, params: &str) {
        let Some(source_hash) = self.source_hash(source) else {
            return;
        };
        if let Ok(mut manifest) = self.manifest.lock() {
            manifest.entries.insert(
                self.key(destination),
                ManifestEntry {
                    source_hash,
                    params_hash: hash_params(params),
                },
            );
        }
    }

    fn persist(&self) -> io::Result<()> {
        self.manifest().save(&self.optimized_dir)
    }
}

fn rendition_key(optimized_dir: &Path, destination: &Path) -> String {
    destination
        .strip_prefix(optimized_dir)
        .unwrap_or(destination)
        .to_string_lossy()
        .into_owned()
}

/// On-disk map from rendition file name to the source it was written from.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct SourceLedger {
    pub version: u32,
    pub owners: HashMap<String, String>,
}

impl SourceLedger {
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            owners: HashMap::new(),
        }
    }

    pub fn load(optimized_dir: &Path) -> Self {
        let Ok(content) = fs::read_to_string(ledger_path(optimized_dir)) else {
            return Self::empty();
        };
        match serde_json::from_str::<Self>(&content) {
            Ok(l) if l.version == MANIFEST_VERSION => l,
            _ => Self::empty(),
        }
    }

    pub fn save(&self, optimized_dir: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(ledger_path(optimized_dir), json)
    }
}

/// Any [`Freshness`] check plus "the rendition was written from this source".
///
/// Sources are recorded relative to `source_root` so moving the whole
/// project doesn't invalidate every rendition. A rendition with no recorded
/// owner, or owned by a different source, is stale.
pub struct OwnedFreshness<F> {
    inner: F,
    optimized_dir: PathBuf,
    source_root: PathBuf,
    ledger: Mutex<SourceLedger>,
}

impl<F: Freshness> OwnedFreshness<F> {
    pub fn load(inner: F, optimized_dir: &Path, source_root: &Path) -> Self {
        Self {
            inner,
            optimized_dir: optimized_dir.to_path_buf(),
            source_root: source_root.to_path_buf(),
            ledger: Mutex::new(SourceLedger::load(optimized_dir)),
        }
    }

    fn owner_key(&self, source: &Path) -> String {
        source
            .strip_prefix(&self.source_root)
            .unwrap_or(source)
            .to_string_lossy()
            .into_owned()
    }

    /// Snapshot of the current ledger.
    pub fn ledger(&self) -> SourceLedger {
        self.ledger
            .lock()
            .map(|l| l.clone())
            .unwrap_or_else(|_| SourceLedger::empty())
    }
}

impl<F: Freshness> Freshness for OwnedFreshness<F> {
    fn is_stale(&self, source: &Path, destination: &Path, params: &str) -> bool {
        let owned = self.ledger.lock().is_ok_and(|ledger| {
            ledger.owners.get(&rendition_key(&self.optimized_dir, destination))
                == Some(&self.owner_key(source))
        });
        !owned || self.inner.is_stale(source, destination, params)
    }

    fn record(&self, source: &Path, destination: &Path, params: &str) {
        if let Ok(mut ledger) = self.ledger.lock() {
            ledger.owners.insert(
                rendition_key(&self.optimized_dir, destination),
                self.owner_key(source),
            );
        }
        self.inner.record(source, destination, params);
    }

    fn persist(&self) -> io::Result<()> {
        self.ledger().save(&self.optimized_dir)?;
        self.inner.persist()
    }
}

/// Pick the staleness check for a run.
///
/// `--no-cache` still goes through the ownership ledger so the next run
/// knows which source each rendition came from.
pub fn freshness_for(mode: FreshnessMode, paths: &ResolvedPaths, no_cache: bool) -> Box<dyn Freshness> {
    let dir = &paths.optimized_dir;
    let root = &paths.gallery_dir;
    if no_cache {
        return Box::new(OwnedFreshness::load(ForceRebuild, dir, root));
    }
    match mode {
        FreshnessMode::Mtime => Box::new(OwnedFreshness::load(MtimeFreshness, dir, root)),
        FreshnessMode::Content => {
            Box::new(OwnedFreshness::load(ContentFreshness::load(dir), dir, root))
        }
    }
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}

/// SHA-256 hash of an encode-parameter fingerprint.
pub fn hash_params(params: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"rendition\0");
    hasher.update(params.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn manifest_path(optimized_dir: &Path) -> PathBuf {
    optimized_dir.join(MANIFEST_FILENAME)
}

pub fn ledger_path(optimized_dir: &Path) -> PathBuf {
    optimized_dir.join(LEDGER_FILENAME)
}

/// Summary of rendition work for a build run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub fresh: u32,
    pub encoded: u32,
    pub failed: u32,
}

impl CacheStats {
    pub fn total(&self) -> u32 {
        self.fresh + self.encoded + self.failed
    }
}

impl std::ops::AddAssign for CacheStats {
    fn add_assign(&mut self, other: Self) {
        self.fresh += other.fresh;
        self.encoded += other.encoded;
        self.failed += other.failed;
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fresh > 0 {
            write!(
                f,
                "{} up to date, {} encoded ({} total)",
                self.fresh,
                self.encoded,
                self.total()
            )?;
        } else {
            write!(f, "{} encoded", self.encoded)?;
        }
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        Ok(())
    }
}
