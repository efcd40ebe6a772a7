//! Decoupled lookback prefix scan
//!
//! Every tile publishes its digit aggregate, then walks backwards over its
//! predecessors' published state until it meets an inclusive prefix. No tile
//! ever waits on a global barrier. Polling a predecessor is bounded: once
//! `spin_limit` polls pass without the predecessor publishing anything, its
//! aggregate is read straight from the tile histogram (complete before the scan
//! starts) and the walk moves on. Tile 0 resolves without looking back, so the
//! lowest unresolved tile can always finish.
//!
//! Status words pack a 2-bit flag over a 30-bit value and are published with a
//! single store, so a reader never sees a flag paired with a stale value.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::constants::{status, RADIX_SIZE};
use crate::sort::histogram::TileHistogram;

const RADIX: usize = RADIX_SIZE as usize;

/// Published state of one (tile, digit) cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileStatus {
    NotReady,
    /// The tile's own count for this digit
    Aggregate(u32),
    /// Count of this digit over tiles `0..=tile`
    InclusivePrefix(u32),
}

impl TileStatus {
    #[inline]
    pub fn pack(self) -> u32 {
        let (flag, value) = match self {
            TileStatus::NotReady => (status::FLAG_NOT_READY, 0),
            TileStatus::Aggregate(value) => (status::FLAG_AGGREGATE, value),
            TileStatus::InclusivePrefix(value) => (status::FLAG_PREFIX, value),
        };
        debug_assert!(value <= status::VALUE_MASK, "status value {value} overflows");
        (flag << status::FLAG_SHIFT) | (value & status::VALUE_MASK)
    }

    #[inline]
    pub fn unpack(word: u32) -> Self {
        let value = word & status::VALUE_MASK;
        match word >> status::FLAG_SHIFT {
            status::FLAG_AGGREGATE => TileStatus::Aggregate(value),
            status::FLAG_PREFIX => TileStatus::InclusivePrefix(value),
            _ => TileStatus::NotReady,
        }
    }
}

/// Where tiles publish and poll their status
///
/// Implemented by [`StatusTable`]; tests wrap it to force adversarial
/// publication orders.
pub trait StatusBoard: Sync {
    fn publish(&self, tile: usize, digit: usize, status: TileStatus);
    fn poll(&self, tile: usize, digit: usize) -> TileStatus;
}

/// One atomic status word per (tile, digit), tile-major
pub struct StatusTable {
    tiles: usize,
    words: Vec<AtomicU32>,
}

impl StatusTable {
    pub fn new(tiles: usize) -> Self {
        Self {
            tiles,
            words: (0..tiles * RADIX).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    pub fn tiles(&self) -> usize {
        self.tiles
    }

    /// Return every cell to `NotReady`
    ///
    /// Takes `&mut self`: nothing can be polling while the table is cleared.
    pub fn reset(&mut self) {
        for word in &mut self.words {
            *word.get_mut() = 0;
        }
    }
}

impl StatusBoard for StatusTable {
    #[inline]
    fn publish(&self, tile: usize, digit: usize, status: TileStatus) {
        self.words[tile * RADIX + digit].store(status.pack(), Ordering::Release);
    }

    #[inline]
    fn poll(&self, tile: usize, digit: usize) -> TileStatus {
        TileStatus::unpack(self.words[tile * RADIX + digit].load(Ordering::Acquire))
    }
}

/// How a pass's lookbacks were resolved
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LookbackStats {
    /// Walks that ended on a predecessor's inclusive prefix
    pub resolved_by_prefix: u64,
    /// Predecessor aggregates added while walking
    pub aggregates_consumed: u64,
    /// Predecessors whose raw count was read after the poll bound ran out
    pub fallbacks: u64,
    pub polls: u64,
}

impl LookbackStats {
    pub fn merge(mut self, other: LookbackStats) -> LookbackStats {
        self.resolved_by_prefix += other.resolved_by_prefix;
        self.aggregates_consumed += other.aggregates_consumed;
        self.fallbacks += other.fallbacks;
        self.polls += other.polls;
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LookbackScanner {
    spin_limit: u32,
}

impl LookbackScanner {
    pub fn new(spin_limit: u32) -> Self {
        assert!(spin_limit > 0, "lookback needs at least one poll per predecessor");
        Self { spin_limit }
    }

    /// Resolve the exclusive prefix of `digit` for `tile`
    ///
    /// Publishes the tile's aggregate first and its inclusive prefix last.
    pub fn resolve<B: StatusBoard + ?Sized>(
        &self,
        board: &B,
        histogram: &TileHistogram,
        tile: usize,
        digit: usize,
        stats: &mut LookbackStats,
    ) -> u32 {
        let aggregate = histogram.count(tile, digit);

        if tile == 0 {
            board.publish(0, digit, TileStatus::InclusivePrefix(aggregate));
            return 0;
        }

        board.publish(tile, digit, TileStatus::Aggregate(aggregate));

        let mut exclusive = 0u32;
        let mut predecessor = tile - 1;
        let mut spins = 0u32;

        loop {
            stats.polls += 1;
            match board.poll(predecessor, digit) {
                TileStatus::InclusivePrefix(value) => {
                    exclusive += value;
                    stats.resolved_by_prefix += 1;
                    break;
                }
                TileStatus::Aggregate(value) => {
                    exclusive += value;
                    stats.aggregates_consumed += 1;
                    if predecessor == 0 {
                        break;
                    }
                    predecessor -= 1;
                    spins = 0;
                }
                TileStatus::NotReady => {
                    spins += 1;
                    if spins < self.spin_limit {
                        std::hint::spin_loop();
                        continue;
                    }

                    exclusive += histogram.count(predecessor, digit);
                    stats.fallbacks += 1;
                    if predecessor == 0 {
                        break;
                    }
                    predecessor -= 1;
                    spins = 0;
                }
            }
        }

        board.publish(tile, digit, TileStatus::InclusivePrefix(exclusive + aggregate));
        exclusive
    }

    /// Resolve all 256 digits of one tile
    pub fn resolve_tile<B: StatusBoard + ?Sized>(
        &self,
        board: &B,
        histogram: &TileHistogram,
        tile: usize,
        prefixes: &mut [u32; RADIX],
        stats: &mut LookbackStats,
    ) {
        for (digit, prefix) in prefixes.iter_mut().enumerate() {
            *prefix = self.resolve(board, histogram, tile, digit, stats);
        }
    }
}

/// Sequential exclusive scan over tiles, tile-major like the status table
pub fn sequential_exclusive_prefixes(histogram: &TileHistogram) -> Vec<u32> {
    let mut prefixes = vec![0u32; histogram.tiles() * RADIX];
    let mut running = [0u32; RADIX];

    for tile in 0..histogram.tiles() {
        for digit in 0..RADIX {
            prefixes[tile * RADIX + digit] = running[digit];
            running[digit] += histogram.count(tile, digit);
        }
    }

    prefixes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::key::Entry;
    use std::sync::atomic::AtomicU64;

    fn histogram_for(tiles: usize, tile_size: usize) -> TileHistogram {
        let entries: Vec<Entry> = (0..tiles * tile_size)
            .map(|i| Entry::new(((i * 7919) % 5) as u32, i as u32))
            .collect();
        TileHistogram::build(&entries, tile_size, 0)
    }

    /// Hides one tile's published state for a fixed number of polls
    struct DelayedBoard {
        inner: StatusTable,
        delayed_tile: usize,
        hidden_polls: AtomicU64,
    }

    impl StatusBoard for DelayedBoard {
        fn publish(&self, tile: usize, digit: usize, status: TileStatus) {
            self.inner.publish(tile, digit, status);
        }

        fn poll(&self, tile: usize, digit: usize) -> TileStatus {
            if tile == self.delayed_tile {
                let hidden = self
                    .hidden_polls
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
                    .is_ok();
                if hidden {
                    return TileStatus::NotReady;
                }
            }
            self.inner.poll(tile, digit)
        }
    }

    #[test]
    fn test_status_pack_round_trip() {
        for status in [
            TileStatus::NotReady,
            TileStatus::Aggregate(0),
            TileStatus::Aggregate(12345),
            TileStatus::InclusivePrefix(status::VALUE_MASK),
        ] {
            assert_eq!(TileStatus::unpack(status.pack()), status);
        }
        assert_eq!(TileStatus::unpack(0), TileStatus::NotReady);
    }

    #[test]
    fn test_in_order_resolution_never_falls_back() {
        let histogram = histogram_for(6, 8);
        let board = StatusTable::new(histogram.tiles());
        let scanner = LookbackScanner::new(4);
        let expected = sequential_exclusive_prefixes(&histogram);
        let mut stats = LookbackStats::default();

        for tile in 0..histogram.tiles() {
            for digit in 0..RADIX {
                let prefix = scanner.resolve(&board, &histogram, tile, digit, &mut stats);
                assert_eq!(prefix, expected[tile * RADIX + digit]);
            }
        }

        assert_eq!(stats.fallbacks, 0);
        assert_eq!(stats.aggregates_consumed, 0);
    }

    #[test]
    fn test_reverse_order_resolves_through_fallback() {
        // The last tile runs first and nobody has published anything yet
        let histogram = histogram_for(5, 4);
        let board = StatusTable::new(histogram.tiles());
        let scanner = LookbackScanner::new(3);
        let expected = sequential_exclusive_prefixes(&histogram);
        let mut stats = LookbackStats::default();

        for tile in (0..histogram.tiles()).rev() {
            for digit in 0..RADIX {
                let prefix = scanner.resolve(&board, &histogram, tile, digit, &mut stats);
                assert_eq!(prefix, expected[tile * RADIX + digit], "tile {tile} digit {digit}");
            }
        }

        assert!(stats.fallbacks > 0);
    }

    #[test]
    fn test_late_predecessor_beyond_spin_limit_uses_fallback() {
        let histogram = histogram_for(3, 16);
        let board = DelayedBoard {
            inner: StatusTable::new(histogram.tiles()),
            delayed_tile: 1,
            hidden_polls: AtomicU64::new(10),
        };
        let scanner = LookbackScanner::new(4);
        let expected = sequential_exclusive_prefixes(&histogram);

        let mut stats = LookbackStats::default();
        scanner.resolve(&board, &histogram, 0, 0, &mut stats);
        scanner.resolve(&board, &histogram, 1, 0, &mut stats);

        let mut tile2 = LookbackStats::default();
        let prefix = scanner.resolve(&board, &histogram, 2, 0, &mut tile2);

        assert_eq!(prefix, expected[2 * RADIX]);
        assert_eq!(tile2.fallbacks, 1);
        assert_eq!(tile2.resolved_by_prefix, 1, "walk should end on tile 0's prefix");
    }

    #[test]
    fn test_late_predecessor_within_spin_limit_is_waited_for() {
        let histogram = histogram_for(3, 16);
        let board = DelayedBoard {
            inner: StatusTable::new(histogram.tiles()),
            delayed_tile: 1,
            hidden_polls: AtomicU64::new(10),
        };
        let scanner = LookbackScanner::new(32);
        let expected = sequential_exclusive_prefixes(&histogram);

        let mut stats = LookbackStats::default();
        scanner.resolve(&board, &histogram, 0, 3, &mut stats);
        scanner.resolve(&board, &histogram, 1, 3, &mut stats);

        let mut tile2 = LookbackStats::default();
        let prefix = scanner.resolve(&board, &histogram, 2, 3, &mut tile2);

        assert_eq!(prefix, expected[2 * RADIX + 3]);
        assert_eq!(tile2.fallbacks, 0);
        assert_eq!(tile2.polls, 11);
    }

    #[test]
    fn test_concurrent_tiles_match_sequential_scan() {
        let histogram = histogram_for(16, 32);
        let board = StatusTable::new(histogram.tiles());
        let scanner = LookbackScanner::new(2);
        let expected = sequential_exclusive_prefixes(&histogram);

        let results: Vec<(usize, [u32; RADIX])> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..histogram.tiles())
                .rev()
                .map(|tile| {
                    let board = &board;
                    let histogram = &histogram;
                    scope.spawn(move || {
                        let mut prefixes = [0u32; RADIX];
                        let mut stats = LookbackStats::default();
                        scanner.resolve_tile(board, histogram, tile, &mut prefixes, &mut stats);
                        (tile, prefixes)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for (tile, prefixes) in results {
            assert_eq!(&prefixes[..], &expected[tile * RADIX..(tile + 1) * RADIX]);
        }
    }

    #[test]
    fn test_reset_clears_every_cell() {
        let mut table = StatusTable::new(2);
        table.publish(1, 200, TileStatus::InclusivePrefix(9));
        table.reset();
        assert_eq!(table.poll(1, 200), TileStatus::NotReady);
    }
}
