//! Brickwork pass: keep portraits from bunching up in a column grid.
//!
//! The gallery renders as a grid `columns` wide, filled row by row. Two
//! portraits in the same row, or one directly above another, make ragged
//! rows. This pass moves portraits out of the way with plain swaps over the
//! already-ordered list, in two phases:
//!
//! 1. **Windows**: slide a window of `columns` items over the list. Whenever
//!    it holds two or more portraits, swap the second one with the nearest
//!    landscape/square item at or beyond the window's end. Swaps only ever
//!    move portraits rightward, so earlier windows never get worse.
//! 2. **Columns**: walk each grid column (`i`, `i + columns`, ...). When two
//!    vertically consecutive cells are both portraits, look up to `lookahead`
//!    positions past the lower one for a landscape/square item to trade
//!    places with. A trade is kept only if it doesn't add window violations.
//!
//! No qualifying partner means no swap; the pass never fails.

use super::Placeable;

/// Swaps performed by one [`brickwork`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BrickworkStats {
    pub window_swaps: usize,
    pub column_swaps: usize,
}

/// Number of `columns`-wide windows holding two or more portraits.
pub fn window_violations<T: Placeable>(items: &[T], columns: usize) -> usize {
    if columns == 0 || items.len() < columns {
        return 0;
    }
    items
        .windows(columns)
        .filter(|w| w.iter().filter(|i| i.is_portrait()).count() >= 2)
        .count()
}

/// Reorder `items` in place. See the module docs.
pub fn brickwork<T: Placeable>(items: &mut [T], columns: usize, lookahead: usize) -> BrickworkStats {
    let mut stats = BrickworkStats::default();
    if columns < 2 || items.len() < 2 {
        return stats;
    }
    stats.window_swaps = spread_windows(items, columns);
    stats.column_swaps = spread_columns(items, columns, lookahead);
    stats
}

fn spread_windows<T: Placeable>(items: &mut [T], columns: usize) -> usize {
    let mut swaps = 0;
    if items.len() < columns {
        return swaps;
    }

    for start in 0..=items.len() - columns {
        let end = start + columns;
        loop {
            let mut portraits = (start..end).filter(|&i| items[i].is_portrait());
            let (Some(_), Some(second)) = (portraits.next(), portraits.next()) else {
                break;
            };
            let Some(partner) = (end..items.len()).find(|&j| !items[j].is_portrait()) else {
                break;
            };
            items.swap(second, partner);
            swaps += 1;
        }
    }
    swaps
}

fn spread_columns<T: Placeable>(items: &mut [T], columns: usize, lookahead: usize) -> usize {
    let mut swaps = 0;
    let n = items.len();

    for col in 0..columns {
        let mut upper = col;
        while upper + columns < n {
            let lower = upper + columns;
            if items[upper].is_portrait() && items[lower].is_portrait() {
                let before = window_violations(items, columns);
                let last = (lower + lookahead).min(n - 1);
                for candidate in lower + 1..=last {
                    if items[candidate].is_portrait() {
                        continue;
                    }
                    items.swap(lower, candidate);
                    if window_violations(items, columns) <= before {
                        swaps += 1;
                        break;
                    }
                    items.swap(lower, candidate);
                }
            }
            upper = lower;
        }
    }
    swaps
}
