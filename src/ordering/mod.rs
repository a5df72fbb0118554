//! Display order of the unique photos.
//!
//! Two interchangeable strategies, picked by `ordering.strategy`:
//!
//! | Strategy | Order |
//! |---|---|
//! | `recency` | Newest source modification time first, scan order on ties |
//! | `shuffle` | Capture numbers spread apart ([`shuffle`]) |
//!
//! Either one may be followed by the [`brickwork`] pass, which moves
//! portraits around so a multi-column grid doesn't stack them.
//!
//! Everything here works over any [`Placeable`] sequence; the build feeds it
//! [`ProcessedPhoto`]s.

pub mod brickwork;
pub mod shuffle;

use crate::config::{OrderingConfig, OrderingStrategy};
use crate::process::ProcessedPhoto;
use crate::types::Orientation;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub use brickwork::{BrickworkStats, brickwork, window_violations};
pub use shuffle::{interleave, interleave_randomized};

/// The attributes the ordering strategies look at.
pub trait Placeable {
    /// Capture-sequence number (first digit run of the label).
    fn sequence(&self) -> u64;
    /// Source modification time in milliseconds.
    fn modified_ms(&self) -> u64;
    fn orientation(&self) -> Orientation;

    fn is_portrait(&self) -> bool {
        self.orientation().is_portrait()
    }
}

impl Placeable for ProcessedPhoto {
    fn sequence(&self) -> u64 {
        self.record.sequence
    }

    fn modified_ms(&self) -> u64 {
        self.record.modified_ms
    }

    fn orientation(&self) -> Orientation {
        self.rendition
            .as_ref()
            .map(|r| r.orientation)
            .unwrap_or_default()
    }
}

/// Newest first. Stable, so equal timestamps keep their incoming order.
pub fn recency<T: Placeable>(items: &mut [T]) {
    items.sort_by(|a, b| b.modified_ms().cmp(&a.modified_ms()));
}

/// Random source for a run: seeded when a seed is configured.
pub fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Apply the configured strategy and optional brickwork pass.
pub fn arrange<T: Placeable>(mut items: Vec<T>, config: &OrderingConfig, rng: &mut impl Rng) -> Vec<T> {
    items = match config.strategy {
        OrderingStrategy::Recency => {
            recency(&mut items);
            items
        }
        OrderingStrategy::Shuffle if config.randomize => interleave_randomized(items, rng),
        OrderingStrategy::Shuffle => interleave(items),
    };

    if config.brickwork {
        let stats = brickwork(&mut items, config.columns, config.lookahead);
        debug!(
            "Brickwork: {} window swap(s), {} column swap(s)",
            stats.window_swaps, stats.column_swaps
        );
    }
    items
}
