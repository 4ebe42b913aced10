//! Canonical export/import round-trips and determinism.

use proptest::prelude::*;
use sylva::{export, import, logical_hash, HeapStorage, PersistentTree, SuffixTree};

use super::common::text_strategy;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn export_is_byte_deterministic(text in text_strategy()) {
        let tree = SuffixTree::build(&text);
        let mut first = Vec::new();
        let mut second = Vec::new();
        export(&tree, &mut first).unwrap();
        export(&tree, &mut second).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn export_is_layout_independent(text in text_strategy()) {
        let in_memory = SuffixTree::build(&text);
        let compact = PersistentTree::build_in_heap(&text).unwrap();
        let hybrid = PersistentTree::build_with(&text, HeapStorage::new(), 300).unwrap();

        let mut from_memory = Vec::new();
        let mut from_compact = Vec::new();
        let mut from_hybrid = Vec::new();
        export(&in_memory, &mut from_memory).unwrap();
        export(&compact, &mut from_compact).unwrap();
        export(&hybrid, &mut from_hybrid).unwrap();

        prop_assert_eq!(&from_memory, &from_compact);
        prop_assert_eq!(&from_memory, &from_hybrid);
    }

    #[test]
    fn import_preserves_hash_and_behavior(text in text_strategy()) {
        let tree = SuffixTree::build(&text);
        let mut stream = Vec::new();
        export(&tree, &mut stream).unwrap();

        let imported = import(&mut stream.as_slice(), HeapStorage::new()).unwrap();
        prop_assert_eq!(logical_hash(&imported).unwrap(), logical_hash(&tree).unwrap());
        prop_assert_eq!(
            imported.longest_repeated_substring().unwrap(),
            tree.longest_repeated_substring().unwrap()
        );
        prop_assert_eq!(imported.all_suffixes().unwrap(), tree.all_suffixes().unwrap());

        // Re-exporting the imported tree reproduces the stream.
        let mut second = Vec::new();
        export(&imported, &mut second).unwrap();
        prop_assert_eq!(stream, second);
    }

    #[test]
    fn any_single_byte_flip_is_detected(text in text_strategy(), seed in 0usize..1024) {
        let tree = SuffixTree::build(&text);
        let mut stream = Vec::new();
        export(&tree, &mut stream).unwrap();

        let index = seed % stream.len();
        stream[index] ^= 0x01;
        prop_assert!(import(&mut stream.as_slice(), HeapStorage::new()).is_err(),
            "flip at byte {} went undetected", index);
    }
}
