use super::*;
use crate::config::SortConfig;
use rand::{rngs::StdRng, Rng, SeedableRng};

fn sort_depths(depths: &[f32], tile_size: u32, spin_limit: u32) -> HostRadixSorter {
    let config = SortConfig {
        tile_size,
        lookback_spin_limit: spin_limit,
        ..Default::default()
    };
    let mut sorter = HostRadixSorter::new(config, depths.len()).unwrap();
    sorter.load_depths(depths);
    sorter.sort();
    sorter
}

fn assert_sorted_permutation(sorter: &HostRadixSorter, count: usize) {
    let sorted = sorter.sorted();
    assert_eq!(sorted.len(), count);

    for pair in sorted.windows(2) {
        assert!(pair[0].key <= pair[1].key, "keys out of order: {:?}", pair);
    }

    let mut indices = sorter.sorted_indices();
    indices.sort_unstable();
    let expected: Vec<u32> = (0..count as u32).collect();
    assert_eq!(indices, expected, "entries lost or duplicated");

    assert_eq!(sorter.draw_args().instance_count as usize, count);
}

fn random_depths(count: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| match rng.gen_range(0..10) {
            0 => 0.0,
            1 => -0.0,
            2 => -1.0, // plenty of duplicates
            _ => rng.gen_range(-1000.0f32..1000.0),
        })
        .collect()
}

#[test]
fn test_partial_final_tile_across_boundaries() {
    let tile_size = 256;
    let count = 3 * tile_size + 7;
    let depths = random_depths(count, 7);
    let sorter = sort_depths(&depths, tile_size as u32, 64);

    assert_eq!(sorter.tile_count(), 4);
    assert_sorted_permutation(&sorter, count);
}

#[test]
fn test_permutation_over_sizes() {
    let tile_size = 32u32;
    for count in [0usize, 1, 32, 33, 5 * 32, 5 * 32 + 1] {
        let depths = random_depths(count, count as u64);
        let sorter = sort_depths(&depths, tile_size, 8);
        assert_sorted_permutation(&sorter, count);
    }
}

#[test]
fn test_duplicates_keep_input_order() {
    let depths = vec![2.0, 1.0, 2.0, 1.0, 2.0, 1.0, 0.5, 2.0, 1.0];
    let sorter = sort_depths(&depths, 2, 1);

    assert_eq!(sorter.sorted_indices(), vec![6, 1, 3, 5, 8, 0, 2, 4, 7]);
}

#[test]
fn test_sorting_sorted_input_is_idempotent() {
    let depths = random_depths(1000, 99);
    let first = sort_depths(&depths, 64, 16);
    let sorted_entries: Vec<Entry> = first.sorted().to_vec();

    let mut second = HostRadixSorter::new(first.config().clone(), sorted_entries.len()).unwrap();
    second.load_entries(&sorted_entries);
    second.sort();

    assert_eq!(second.sorted(), &sorted_entries[..]);
}

#[test]
fn test_tiny_tiles_and_spin_limit_still_correct() {
    // Hundreds of tiles and a single poll per predecessor push most lookbacks
    // onto the fallback path whenever tiles run out of order.
    let depths = random_depths(4099, 3);
    let sorter = sort_depths(&depths, 4, 1);
    assert_sorted_permutation(&sorter, depths.len());
}

#[test]
fn test_repeated_frames_reuse_buffers() {
    let config = SortConfig {
        tile_size: 16,
        ..Default::default()
    };
    let mut sorter = HostRadixSorter::new(config, 300).unwrap();

    for frame in 0..4u64 {
        let depths = random_depths(300, 1000 + frame);
        sorter.load_depths(&depths);
        let report = sorter.sort();

        assert_eq!(report.passes.len(), 4);
        assert_sorted_permutation(&sorter, 300);

        // Output must depend on this frame's depths only
        let mut expected: Vec<(u32, u32)> = depths
            .iter()
            .enumerate()
            .map(|(i, &d)| (depth_to_key(d), i as u32))
            .collect();
        expected.sort_by_key(|&(key, _)| key);
        let expected_indices: Vec<u32> = expected.into_iter().map(|(_, i)| i).collect();
        assert_eq!(sorter.sorted_indices(), expected_indices);
    }
}

#[test]
fn test_matches_std_stable_sort() {
    let depths = random_depths(2500, 42);
    let sorter = sort_depths(&depths, 128, 64);

    let mut reference = entries_from_depths(&depths, sorter.config().order);
    reference.sort_by_key(|entry| entry.key);

    assert_eq!(sorter.sorted(), &reference[..]);
}
