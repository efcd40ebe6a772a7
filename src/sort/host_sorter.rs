//! Host execution of the sort pipeline
//!
//! Runs exactly the stages the device runs (histogram, decoupled lookback,
//! stable binning, four ping-pong passes, draw-argument publication) with rayon
//! standing in for workgroups. Tiles of a bin pass resolve their lookback
//! concurrently against a shared atomic status table, so the bounded-poll
//! fallback is exercised for real whenever the thread pool schedules a tile
//! ahead of its predecessor.
//!
//! All buffers are sized once in [`HostRadixSorter::new`]; sorting a frame only
//! rewrites their contents.

use glam::{Mat4, Vec3};
use rayon::prelude::*;

use crate::config::SortConfig;
use crate::constants::{status, PASS_COUNT, RADIX_SIZE};
use crate::error::{SortError, SortResult};
use crate::gpu::layouts::DrawIndirectArgs;
use crate::sort::histogram::{digit_of, TileHistogram};
use crate::sort::key::{derive_entries, sort_key, Entry};
use crate::sort::lookback::{LookbackScanner, LookbackStats, StatusTable};
use crate::sort::passes::{final_buffer, pass_buffers, BufferRole};

const RADIX: usize = RADIX_SIZE as usize;

/// Lookback behaviour of a single digit pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
    pub pass: u32,
    pub lookback: LookbackStats,
}

/// What one call to [`HostRadixSorter::sort`] did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortReport {
    pub passes: Vec<PassReport>,
}

impl SortReport {
    pub fn total_fallbacks(&self) -> u64 {
        self.passes.iter().map(|p| p.lookback.fallbacks).sum()
    }
}

pub struct HostRadixSorter {
    config: SortConfig,
    scanner: LookbackScanner,
    entry_count: usize,
    entries_a: Vec<Entry>,
    entries_b: Vec<Entry>,
    slots: Vec<u32>,
    histogram: TileHistogram,
    status: StatusTable,
    draw_args: DrawIndirectArgs,
}

impl HostRadixSorter {
    pub fn new(config: SortConfig, entry_count: usize) -> SortResult<Self> {
        config.validate()?;

        if entry_count as u64 > status::MAX_ENTRY_COUNT as u64 {
            return Err(SortError::TooManyPrimitives {
                count: entry_count as u64,
                max: status::MAX_ENTRY_COUNT,
            });
        }

        let tile_size = config.tile_size as usize;
        let histogram = TileHistogram::new(entry_count, tile_size);
        let status = StatusTable::new(histogram.tiles());

        log::debug!(
            "[HostRadixSorter] Sized for {} entries ({} tiles of {})",
            entry_count,
            histogram.tiles(),
            tile_size
        );

        Ok(Self {
            scanner: LookbackScanner::new(config.lookback_spin_limit),
            draw_args: DrawIndirectArgs::new(config.vertices_per_splat, 0),
            config,
            entry_count,
            entries_a: vec![Entry::default(); entry_count],
            entries_b: vec![Entry::default(); entry_count],
            slots: vec![0; entry_count],
            histogram,
            status,
        })
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    pub fn tile_count(&self) -> usize {
        self.histogram.tiles()
    }

    /// Load pre-built entries into the pass-0 source buffer
    pub fn load_entries(&mut self, entries: &[Entry]) {
        debug_assert_eq!(entries.len(), self.entry_count, "entry count changed without a rebuild");
        self.entries_a.copy_from_slice(entries);
    }

    /// Key every primitive by its depth, index = position in `depths`
    pub fn load_depths(&mut self, depths: &[f32]) {
        debug_assert_eq!(depths.len(), self.entry_count, "entry count changed without a rebuild");
        let order = self.config.order;
        self.entries_a
            .par_iter_mut()
            .zip(depths.par_iter())
            .enumerate()
            .for_each(|(index, (entry, &depth))| {
                *entry = Entry::new(sort_key(depth, order), index as u32);
            });
    }

    /// Key every splat by its view-space depth
    pub fn derive_keys(&mut self, view: &Mat4, positions: &[Vec3]) {
        debug_assert_eq!(positions.len(), self.entry_count, "entry count changed without a rebuild");
        derive_entries(view, positions, self.config.order, &mut self.entries_a);
    }

    /// Sort the loaded entries and publish the draw count
    pub fn sort(&mut self) -> SortReport {
        let mut report = SortReport::default();

        if self.entry_count == 0 {
            self.draw_args.instance_count = 0;
            return report;
        }

        for pass in 0..PASS_COUNT {
            let roles = pass_buffers(pass);
            let (source, destination) = match roles.source {
                BufferRole::A => (&self.entries_a, &mut self.entries_b),
                BufferRole::B => (&self.entries_b, &mut self.entries_a),
            };

            // Fresh per-pass state: nothing from the previous digit survives
            self.status.reset();
            self.histogram.rebuild(source, pass);

            let lookback = bin_pass(
                source,
                destination,
                &mut self.slots,
                &self.histogram,
                &self.status,
                &self.scanner,
                pass,
            );

            if lookback.fallbacks > 0 {
                log::debug!(
                    "[HostRadixSorter] Pass {} resolved {} predecessors through the fallback",
                    pass,
                    lookback.fallbacks
                );
            }

            report.passes.push(PassReport { pass, lookback });
        }

        self.draw_args.instance_count = self.entry_count as u32;
        report
    }

    /// The fully sorted entries
    pub fn sorted(&self) -> &[Entry] {
        final_buffer(PASS_COUNT).select(&self.entries_a, &self.entries_b)
    }

    /// Sorted primitive indices, the order the renderer draws in
    pub fn sorted_indices(&self) -> Vec<u32> {
        self.sorted().iter().map(|entry| entry.index).collect()
    }

    pub fn draw_args(&self) -> DrawIndirectArgs {
        self.draw_args
    }
}

/// Compute every destination slot of one pass, then scatter
fn bin_pass(
    source: &[Entry],
    destination: &mut [Entry],
    slots: &mut [u32],
    histogram: &TileHistogram,
    status: &StatusTable,
    scanner: &LookbackScanner,
    pass: u32,
) -> LookbackStats {
    let tile_size = histogram.tile_size();
    let global_offsets = histogram.global_offsets();

    let stats = slots
        .par_chunks_mut(tile_size)
        .zip(source.par_chunks(tile_size))
        .enumerate()
        .map(|(tile, (tile_slots, tile_entries))| {
            let mut stats = LookbackStats::default();
            let mut tile_prefix = [0u32; RADIX];
            scanner.resolve_tile(status, histogram, tile, &mut tile_prefix, &mut stats);

            // Rank within the tile in source order keeps equal digits stable
            let mut rank = [0u32; RADIX];
            for (slot, entry) in tile_slots.iter_mut().zip(tile_entries) {
                let digit = digit_of(entry.key, pass);
                *slot = global_offsets[digit] + tile_prefix[digit] + rank[digit];
                rank[digit] += 1;
            }

            stats
        })
        .reduce(LookbackStats::default, LookbackStats::merge);

    #[cfg(debug_assertions)]
    assert_bijection(slots);

    for (entry, &slot) in source.iter().zip(slots.iter()) {
        destination[slot as usize] = *entry;
    }

    stats
}

/// Two entries landing on one slot would silently drop one of them
#[cfg(debug_assertions)]
fn assert_bijection(slots: &[u32]) {
    let mut taken = vec![false; slots.len()];
    for &slot in slots {
        let slot = slot as usize;
        assert!(slot < taken.len(), "destination slot {slot} out of range");
        assert!(!taken[slot], "destination slot {slot} assigned twice");
        taken[slot] = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SortOrder;

    fn sorter(entry_count: usize, tile_size: u32) -> HostRadixSorter {
        let config = SortConfig {
            tile_size,
            ..Default::default()
        };
        HostRadixSorter::new(config, entry_count).unwrap()
    }

    #[test]
    fn test_five_depths_sort_stably() {
        let mut sorter = sorter(5, 256);
        sorter.load_depths(&[3.0, -1.0, 0.0, -1.0, 2.0]);
        sorter.sort();

        assert_eq!(sorter.sorted_indices(), vec![1, 3, 2, 4, 0]);
        assert_eq!(sorter.draw_args().instance_count, 5);
    }

    #[test]
    fn test_empty_sort_publishes_zero() {
        let mut sorter = sorter(0, 256);
        let report = sorter.sort();

        assert!(report.passes.is_empty());
        assert!(sorter.sorted().is_empty());
        assert_eq!(sorter.draw_args().instance_count, 0);
        assert_eq!(sorter.draw_args().vertex_count, 4);
    }

    #[test]
    fn test_each_pass_orders_low_bits() {
        // After pass p the destination is ordered by the low 8*(p+1) bits
        let keys: Vec<u32> = (0..97u32).map(|i| i.wrapping_mul(2_654_435_761)).collect();
        let entries: Vec<Entry> = keys.iter().enumerate().map(|(i, &k)| Entry::new(k, i as u32)).collect();

        let tile_size = 8;
        let mut source = entries.clone();
        let mut destination = vec![Entry::default(); entries.len()];
        let mut slots = vec![0u32; entries.len()];
        let scanner = LookbackScanner::new(4);

        for pass in 0..PASS_COUNT {
            let histogram = TileHistogram::build(&source, tile_size, pass);
            let status = StatusTable::new(histogram.tiles());
            bin_pass(&source, &mut destination, &mut slots, &histogram, &status, &scanner, pass);

            let bits = 8 * (pass + 1);
            let mask = if bits == 32 { u32::MAX } else { (1u32 << bits) - 1 };
            for pair in destination.windows(2) {
                assert!(pair[0].key & mask <= pair[1].key & mask, "pass {pass} not ordered");
            }
            std::mem::swap(&mut source, &mut destination);
        }
    }

    #[test]
    fn test_descending_order_reverses_draw_order() {
        let config = SortConfig {
            order: SortOrder::Descending,
            ..Default::default()
        };
        let mut sorter = HostRadixSorter::new(config, 4).unwrap();
        sorter.load_depths(&[-5.0, -1.0, -3.0, 2.0]);
        sorter.sort();

        assert_eq!(sorter.sorted_indices(), vec![3, 1, 2, 0]);
    }

    #[test]
    fn test_rejects_counts_beyond_status_range() {
        let err = HostRadixSorter::new(SortConfig::default(), status::MAX_ENTRY_COUNT as usize + 1)
            .err()
            .expect("oversized sorter accepted");
        assert!(matches!(err, SortError::TooManyPrimitives { .. }));
    }

    #[test]
    fn test_derive_keys_from_camera() {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        let positions = vec![
            Vec3::new(0.0, 0.0, 5.0),  // 5 in front
            Vec3::new(0.0, 0.0, -5.0), // 15 in front
            Vec3::new(1.0, 0.0, 0.0),  // 10 in front
        ];

        let mut sorter = sorter(3, 256);
        sorter.derive_keys(&view, &positions);
        sorter.sort();

        // Back to front: farthest first
        assert_eq!(sorter.sorted_indices(), vec![1, 2, 0]);
    }
}
