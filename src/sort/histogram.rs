//! Per-tile digit histograms
//!
//! Each tile owns one 256-wide row of the table; rows are counted independently
//! and in parallel, so no tile ever touches another tile's row. The per-digit
//! totals across all tiles are kept alongside for the global digit offsets.

use rayon::prelude::*;

use crate::constants::{DIGIT_BITS, DIGIT_MASK, RADIX_SIZE};
use crate::sort::key::Entry;

const RADIX: usize = RADIX_SIZE as usize;

/// Digit of `key` examined by `pass`
#[inline]
pub fn digit_of(key: u32, pass: u32) -> usize {
    ((key >> (pass * DIGIT_BITS)) & DIGIT_MASK) as usize
}

/// Number of tiles covering `entry_count` entries
#[inline]
pub fn tile_count(entry_count: usize, tile_size: usize) -> usize {
    entry_count.div_ceil(tile_size)
}

/// `tile_count x 256` digit counts plus their per-digit totals
#[derive(Debug, Clone)]
pub struct TileHistogram {
    tile_size: usize,
    tiles: usize,
    counts: Vec<u32>,
    totals: [u32; RADIX],
}

impl TileHistogram {
    /// Allocate a zeroed table for `entry_count` entries
    pub fn new(entry_count: usize, tile_size: usize) -> Self {
        assert!(tile_size > 0, "tile size must be non-zero");
        let tiles = tile_count(entry_count, tile_size);
        Self {
            tile_size,
            tiles,
            counts: vec![0; tiles * RADIX],
            totals: [0; RADIX],
        }
    }

    /// Count digit `pass` of every entry, replacing any previous contents
    pub fn build(entries: &[Entry], tile_size: usize, pass: u32) -> Self {
        let mut histogram = Self::new(entries.len(), tile_size);
        histogram.rebuild(entries, pass);
        histogram
    }

    /// Reset and recount in place
    pub fn rebuild(&mut self, entries: &[Entry], pass: u32) {
        debug_assert_eq!(
            tile_count(entries.len(), self.tile_size),
            self.tiles,
            "histogram sized for a different entry count"
        );

        self.clear();

        self.counts
            .par_chunks_mut(RADIX)
            .zip(entries.par_chunks(self.tile_size))
            .for_each(|(row, tile)| {
                // The last tile may be partial; chunking never reads past the end
                for entry in tile {
                    row[digit_of(entry.key, pass)] += 1;
                }
            });

        for row in self.counts.chunks_exact(RADIX) {
            for (total, &count) in self.totals.iter_mut().zip(row) {
                *total += count;
            }
        }
    }

    /// Zero every row and total
    pub fn clear(&mut self) {
        self.counts.fill(0);
        self.totals = [0; RADIX];
    }

    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    pub fn tiles(&self) -> usize {
        self.tiles
    }

    /// Entries of `tile` whose digit equals `digit`
    #[inline]
    pub fn count(&self, tile: usize, digit: usize) -> u32 {
        self.counts[tile * RADIX + digit]
    }

    /// The full row of a tile
    pub fn row(&self, tile: usize) -> &[u32] {
        &self.counts[tile * RADIX..(tile + 1) * RADIX]
    }

    /// Per-digit totals over every tile
    pub fn totals(&self) -> &[u32; RADIX] {
        &self.totals
    }

    /// Exclusive scan of the totals: where each digit's run starts in the output
    pub fn global_offsets(&self) -> [u32; RADIX] {
        let mut offsets = [0u32; RADIX];
        let mut running = 0u32;
        for (offset, &total) in offsets.iter_mut().zip(self.totals.iter()) {
            *offset = running;
            running += total;
        }
        offsets
    }
}
