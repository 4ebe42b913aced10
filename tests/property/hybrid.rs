//! Hybrid-layout equivalence: promotion must never change the logical tree.
//!
//! Each `compact_limit` moves the promotion point somewhere else in the
//! build; every resulting hybrid file must answer every query exactly as
//! the pure-compact tree does, hash-equal included.

use proptest::prelude::*;
use sylva::{
    logical_hash, HeapStorage, PersistentTree, SuffixTree, HEADER_SIZE, VERSION_COMPACT,
    VERSION_HYBRID,
};

use super::common::text_strategy;

/// Limits that promote at the root, mid-build, and never.
fn limits_for(text: &str) -> Vec<u64> {
    vec![
        HEADER_SIZE,          // promote on the first allocation
        HEADER_SIZE + 28,     // promote right after the root
        200,
        500,
        1_000,
        2_000 + text.len() as u64 * 10,
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_promotion_point_is_equivalent(text in text_strategy()) {
        let reference = SuffixTree::build(&text);
        let compact = PersistentTree::build_in_heap(&text).unwrap();
        prop_assert_eq!(compact.header().version, VERSION_COMPACT);
        let reference_hash = logical_hash(&reference).unwrap();
        prop_assert_eq!(logical_hash(&compact).unwrap(), reference_hash);

        for limit in limits_for(&text) {
            let hybrid = PersistentTree::build_with(&text, HeapStorage::new(), limit).unwrap();

            prop_assert_eq!(hybrid.node_count().unwrap(), reference.node_count());
            prop_assert_eq!(hybrid.leaf_count().unwrap(), reference.leaf_count());
            prop_assert_eq!(
                hybrid.longest_repeated_substring().unwrap(),
                reference.longest_repeated_substring().unwrap()
            );
            prop_assert_eq!(
                hybrid.find_all_occurrences("ab").unwrap(),
                reference.find_all_occurrences("ab").unwrap()
            );
            prop_assert_eq!(
                hybrid.count_occurrences("a").unwrap(),
                reference.count_occurrences("a").unwrap()
            );
            prop_assert_eq!(
                hybrid.longest_common_substring("bcab bc").unwrap(),
                reference.longest_common_substring("bcab bc").unwrap()
            );
            prop_assert_eq!(logical_hash(&hybrid).unwrap(), reference_hash,
                "limit {}", limit);
        }
    }

    #[test]
    fn hybrid_headers_hold_their_invariants(text in text_strategy()) {
        for limit in limits_for(&text) {
            let tree = PersistentTree::build_with(&text, HeapStorage::new(), limit).unwrap();
            let header = tree.header();
            if header.version == VERSION_COMPACT {
                prop_assert_eq!(header.transition_offset, 0);
                prop_assert_eq!(header.jump_start, header.jump_end);
                continue;
            }
            prop_assert_eq!(header.version, VERSION_HYBRID);
            prop_assert!(header.transition_offset >= HEADER_SIZE);
            prop_assert!(header.transition_offset <= limit.max(HEADER_SIZE));
            prop_assert_eq!((header.jump_end - header.jump_start) % 8, 0);
            if header.jump_start != header.jump_end {
                prop_assert!(header.jump_start >= header.transition_offset);
            }
            prop_assert_eq!(header.storage_size, tree.storage().as_bytes().len() as u64);
        }
    }

    #[test]
    fn forced_promotion_round_trips_through_bytes(text in text_strategy()) {
        // Build hybrid, copy the raw image, load it fresh: the loader must
        // reconstruct bookkeeping purely from the header.
        let built = PersistentTree::build_with(&text, HeapStorage::new(), 256).unwrap();
        let image = built.storage().as_bytes().to_vec();
        let loaded = PersistentTree::load(HeapStorage::from_bytes(image)).unwrap();

        prop_assert_eq!(loaded.header(), built.header());
        prop_assert_eq!(
            logical_hash(&loaded).unwrap(),
            logical_hash(&built).unwrap()
        );
        prop_assert_eq!(
            loaded.all_suffixes().unwrap(),
            built.all_suffixes().unwrap()
        );
    }
}

#[test]
fn tiny_limit_promotes_even_the_root() {
    let tree = PersistentTree::build_with("banana", HeapStorage::new(), HEADER_SIZE).unwrap();
    let header = tree.header();
    assert_eq!(header.version, VERSION_HYBRID);
    assert_eq!(header.transition_offset, HEADER_SIZE);
    // Nothing compact exists, so nothing needs the jump table.
    assert_eq!(header.jump_start, header.jump_end);
    assert!(tree.contains("nan").unwrap());
    assert_eq!(tree.leaf_count().unwrap(), 7);
}

#[test]
fn large_default_limit_stays_compact() {
    let tree = PersistentTree::build_in_heap("banana").unwrap();
    assert_eq!(tree.header().version, VERSION_COMPACT);
    assert_eq!(tree.header().transition_offset, 0);
}
