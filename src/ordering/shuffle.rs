//! Sequence-spreading shuffle.
//!
//! Photos shot in a burst have consecutive capture numbers (`DSC0041`,
//! `DSC0042`, ...) and usually look alike. Both variants sort by
//! [`Placeable::sequence`] and then interleave so neighbours in capture order
//! land far apart.
//!
//! ## Deterministic
//!
//! Lay the sorted list out row by row in a grid `k` wide and read it back
//! column by column:
//!
//! ```text
//! n = 9, k = 3       sorted positions      output
//!                    0 1 2
//!                    3 4 5                 0 3 6 1 4 7 2 5 8
//!                    6 7 8
//! ```
//!
//! `k = ceil(sqrt(n))` clamped to `3..=n/2`, so every column holds at least
//! two items and consecutive outputs are at least two sorted positions apart.
//! Small lists use fixed layouts: `n = 4` → `1 3 0 2`, `n = 5` → `0 2 4 1 3`,
//! `n < 4` stays sorted (no arrangement can separate them).
//!
//! With distinct sequence numbers that alone keeps two photos whose numbers
//! differ by one apart for `n >= 4`. Repeated numbers (every label without
//! digits is 0) can still meet, so a repair pass follows: each adjacent pair
//! differing by one has one side swapped with whichever item, later ones
//! first, lowers the count of such pairs. Passes repeat until nothing
//! improves. If pairs remain, the list is split by parity (numbers of equal
//! parity never differ by one), evens then odds, each side keeping its spread
//! order, with a non-adjacent even/odd pair placed at the seam. When no such
//! pair exists, no arrangement avoids adjacency and the list is left as is.
//!
//! ## Randomized
//!
//! 1. Fisher–Yates shuffle within consecutive groups of `max(3, n / 20)`.
//! 2. Start at a random slot; place each item at the current slot, probing
//!    forward to the next empty one on collision.
//! 3. Advance by `ceil(sqrt(n))` perturbed by up to ±20%, drawn per placement.
//!
//! Every slot gets filled. The spread is best effort only.

use super::Placeable;
use rand::Rng;
use rand::seq::SliceRandom;

fn sort_by_sequence<T: Placeable>(items: &mut [T]) {
    items.sort_by_key(|item| item.sequence());
}

fn base_step(n: usize) -> usize {
    ((n as f64).sqrt().ceil() as usize).max(1)
}

/// Sorted position read order for a list of `n`.
fn column_major_order(n: usize) -> Vec<usize> {
    match n {
        0..=3 => (0..n).collect(),
        4 => vec![1, 3, 0, 2],
        5 => vec![0, 2, 4, 1, 3],
        _ => {
            let k = base_step(n).clamp(3, n / 2);
            (0..k).flat_map(|col| (col..n).step_by(k)).collect()
        }
    }
}

fn adjacent_numbers(a: u64, b: u64) -> bool {
    a.abs_diff(b) == 1
}

/// Conflicting pairs among the edges touching positions `p` and `q`.
/// Edge `e` joins positions `e` and `e + 1`.
fn local_conflicts(seqs: &[u64], p: usize, q: usize) -> usize {
    let last_edge = seqs.len().saturating_sub(1);
    let mut edges: Vec<usize> = [p.checked_sub(1), Some(p), q.checked_sub(1), Some(q)]
        .into_iter()
        .flatten()
        .filter(|&e| e < last_edge)
        .collect();
    edges.sort_unstable();
    edges.dedup();
    edges
        .into_iter()
        .filter(|&e| adjacent_numbers(seqs[e], seqs[e + 1]))
        .count()
}

/// Swap partner for `p` that strictly lowers the number of conflicting pairs.
fn better_partner(seqs: &mut [u64], p: usize) -> Option<usize> {
    let n = seqs.len();
    for q in (p + 1..n).chain(0..p) {
        let before = local_conflicts(seqs, p, q);
        seqs.swap(p, q);
        let after = local_conflicts(seqs, p, q);
        seqs.swap(p, q);
        if after < before {
            return Some(q);
        }
    }
    None
}

/// Break up neighbours whose sequence numbers differ by one.
fn separate_neighbours<T: Placeable>(items: &mut [T]) {
    let mut seqs: Vec<u64> = items.iter().map(|item| item.sequence()).collect();
    // Every accepted swap lowers the conflict count, so this terminates.
    loop {
        let mut improved = false;
        for e in 0..seqs.len().saturating_sub(1) {
            if !adjacent_numbers(seqs[e], seqs[e + 1]) {
                continue;
            }
            for p in [e + 1, e] {
                if let Some(q) = better_partner(&mut seqs, p) {
                    seqs.swap(p, q);
                    items.swap(p, q);
                    improved = true;
                    break;
                }
            }
        }
        if !improved {
            break;
        }
    }
}

fn has_adjacent_numbers<T: Placeable>(items: &[T]) -> bool {
    items
        .windows(2)
        .any(|w| adjacent_numbers(w[0].sequence(), w[1].sequence()))
}

/// Evens then odds, joined at a pair that doesn't differ by one.
/// Returns `items` unchanged when every even/odd pair differs by one.
fn split_by_parity<T: Placeable>(items: Vec<T>) -> Vec<T> {
    let seqs: Vec<u64> = items.iter().map(|item| item.sequence()).collect();
    let seam = seqs.iter().filter(|&&e| e % 2 == 0).find_map(|&even| {
        seqs.iter()
            .find(|&&odd| odd % 2 == 1 && !adjacent_numbers(even, odd))
            .map(|&odd| (even, odd))
    });
    let Some((seam_even, seam_odd)) = seam else {
        return items;
    };

    let (mut evens, mut odds): (Vec<T>, Vec<T>) =
        items.into_iter().partition(|item| item.sequence() % 2 == 0);
    if let Some(i) = evens.iter().position(|item| item.sequence() == seam_even) {
        let item = evens.remove(i);
        evens.push(item);
    }
    if let Some(j) = odds.iter().position(|item| item.sequence() == seam_odd) {
        let item = odds.remove(j);
        odds.insert(0, item);
    }
    evens.extend(odds);
    evens
}

/// Deterministic spread.
pub fn interleave<T: Placeable>(mut items: Vec<T>) -> Vec<T> {
    sort_by_sequence(&mut items);
    let order = column_major_order(items.len());

    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let mut out: Vec<T> = order
        .into_iter()
        .filter_map(|pos| slots.get_mut(pos).and_then(Option::take))
        .collect();
    if out.len() < 4 {
        return out;
    }
    separate_neighbours(&mut out);
    if has_adjacent_numbers(&out) {
        return split_by_parity(out);
    }
    out
}

/// Randomized spread driven by `rng`.
pub fn interleave_randomized<T: Placeable>(mut items: Vec<T>, rng: &mut impl Rng) -> Vec<T> {
    sort_by_sequence(&mut items);
    let n = items.len();
    if n < 2 {
        return items;
    }

    let group = (n / 20).max(3);
    for chunk in items.chunks_mut(group) {
        chunk.shuffle(rng);
    }

    let base = base_step(n) as f64;
    let mut slots: Vec<Option<T>> = (0..n).map(|_| None).collect();
    let mut cursor = rng.gen_range(0..n);

    for item in items {
        let mut slot = cursor % n;
        while slots[slot].is_some() {
            slot = (slot + 1) % n;
        }
        slots[slot] = Some(item);

        let factor: f64 = rng.gen_range(0.8..=1.2);
        let step = ((base * factor).round() as usize).max(1);
        cursor = slot + step;
    }

    slots.into_iter().flatten().collect()
}
