//! Property tests for the host execution of the sort pipeline

use proptest::prelude::*;
use splat_sort::sort::{depth_to_key, entries_from_depths, HostRadixSorter};
use splat_sort::{SortConfig, SortOrder};

fn depth() -> impl Strategy<Value = f32> {
    prop_oneof![
        -1.0e6f32..1.0e6f32,
        Just(0.0f32),
        Just(-0.0f32),
        Just(f32::MAX),
        Just(f32::MIN),
        Just(f32::INFINITY),
        Just(f32::NEG_INFINITY),
        (-8i32..8).prop_map(|d| d as f32),
    ]
}

fn tile_size() -> impl Strategy<Value = u32> {
    prop::sample::select(vec![1u32, 2, 4, 32, 64, 256])
}

fn sort(depths: &[f32], config: SortConfig) -> HostRadixSorter {
    let mut sorter = HostRadixSorter::new(config, depths.len()).unwrap();
    sorter.load_depths(depths);
    sorter.sort();
    sorter
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn sorted_keys_are_non_decreasing(
        depths in prop::collection::vec(depth(), 0..1500),
        tile_size in tile_size(),
        spin_limit in 1u32..16,
    ) {
        let config = SortConfig { tile_size, lookback_spin_limit: spin_limit, ..Default::default() };
        let sorter = sort(&depths, config);

        for pair in sorter.sorted().windows(2) {
            prop_assert!(pair[0].key <= pair[1].key);
        }
        for pair in sorter.sorted().windows(2) {
            let (a, b) = (depths[pair[0].index as usize], depths[pair[1].index as usize]);
            prop_assert!(a <= b || (a == 0.0 && b == 0.0));
        }
    }

    #[test]
    fn output_is_a_stable_permutation(
        depths in prop::collection::vec(depth(), 0..1500),
        tile_size in tile_size(),
        descending in any::<bool>(),
    ) {
        let order = if descending { SortOrder::Descending } else { SortOrder::Ascending };
        let config = SortConfig { tile_size, order, ..Default::default() };
        let sorter = sort(&depths, config);

        let mut reference = entries_from_depths(&depths, order);
        reference.sort_by_key(|entry| entry.key);

        prop_assert_eq!(sorter.sorted(), &reference[..]);
        prop_assert_eq!(sorter.draw_args().instance_count as usize, depths.len());
    }

    #[test]
    fn sorting_twice_changes_nothing(
        depths in prop::collection::vec(depth(), 1..800),
        tile_size in tile_size(),
    ) {
        let config = SortConfig { tile_size, ..Default::default() };
        let first = sort(&depths, config.clone());

        let mut second = HostRadixSorter::new(config, depths.len()).unwrap();
        second.load_entries(first.sorted());
        second.sort();

        prop_assert_eq!(second.sorted(), first.sorted());
    }

    #[test]
    fn key_transform_is_monotone(a in depth(), b in depth()) {
        if a < b {
            prop_assert!(depth_to_key(a) < depth_to_key(b));
        }
    }
}
