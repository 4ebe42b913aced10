//! Universal invariants checked against brute-force oracles.

use proptest::prelude::*;
use sylva::{Navigator, SuffixTree};

use super::common::{naive_lcs_len, naive_lrs_len, naive_occurrences, pair_strategy, text_strategy};

proptest! {
    #[test]
    fn every_suffix_is_contained(text in text_strategy()) {
        let tree = SuffixTree::build(&text);
        for start in 0..text.len() {
            prop_assert!(tree.contains(&text[start..]).unwrap(), "suffix at {}", start);
        }
    }

    #[test]
    fn occurrences_match_naive_scan(text in text_strategy(), pattern in proptest::string::string_regex("[ab c]{0,5}").unwrap()) {
        let tree = SuffixTree::build(&text);
        prop_assert_eq!(
            tree.find_all_occurrences(&pattern).unwrap(),
            naive_occurrences(&text, &pattern)
        );
    }

    #[test]
    fn lrs_repeats_and_is_maximal(text in text_strategy()) {
        let tree = SuffixTree::build(&text);
        let lrs = tree.longest_repeated_substring().unwrap();
        prop_assert_eq!(lrs.len(), naive_lrs_len(&text));
        if !lrs.is_empty() {
            prop_assert!(tree.count_occurrences(&lrs).unwrap() >= 2);
        }
        prop_assert_eq!(tree.max_depth(), lrs.len());
    }

    #[test]
    fn lcs_is_common_and_maximal((text, other) in pair_strategy()) {
        let tree = SuffixTree::build(&text);
        let expected_len = naive_lcs_len(&text, &other);
        let lcs = tree.longest_common_substring(&other).unwrap();
        prop_assert_eq!(lcs.len(), expected_len);
        if !lcs.is_empty() {
            prop_assert!(text.contains(&lcs));
            prop_assert!(other.contains(&lcs));
        }
    }

    #[test]
    fn lcs_info_positions_are_real((text, other) in pair_strategy()) {
        let tree = SuffixTree::build(&text);
        if let Some(found) = tree.longest_common_substring_info(&other).unwrap() {
            let len = found.substring.len();
            prop_assert_eq!(&text[found.position_in_text..found.position_in_text + len],
                found.substring.as_str());
            prop_assert_eq!(&other[found.position_in_other..found.position_in_other + len],
                found.substring.as_str());
        }
    }

    #[test]
    fn all_lcs_positions_are_real((text, other) in pair_strategy()) {
        let tree = SuffixTree::build(&text);
        if let Some(all) = tree.find_all_longest_common_substrings(&other).unwrap() {
            let len = all.substring.len();
            prop_assert!(len > 0);
            for &position in &all.positions_in_text {
                let candidate = &text[position..position + len];
                // Every reported text position holds SOME maximal match.
                prop_assert!(other.contains(candidate), "text position {}", position);
            }
            for &position in &all.positions_in_other {
                let candidate = &other[position..position + len];
                prop_assert!(text.contains(candidate), "query position {}", position);
            }
        }
    }

    #[test]
    fn anchors_are_increasing_real_matches((text, query) in pair_strategy()) {
        let tree = SuffixTree::build(&text);
        let min_length = 2;
        let anchors = tree.find_exact_match_anchors(&query, min_length).unwrap();
        let mut previous_query_position = None;
        for anchor in &anchors {
            prop_assert!(anchor.length >= min_length);
            if let Some(previous) = previous_query_position {
                prop_assert!(anchor.position_in_query > previous, "anchors out of order");
            }
            previous_query_position = Some(anchor.position_in_query);
            let in_text = &text[anchor.position_in_text..anchor.position_in_text + anchor.length];
            let in_query = &query[anchor.position_in_query..anchor.position_in_query + anchor.length];
            prop_assert_eq!(in_text, in_query);
        }
    }

    #[test]
    fn suffix_enumeration_is_sorted_and_complete(text in text_strategy()) {
        let tree = SuffixTree::build(&text);
        let suffixes: Vec<String> = tree.all_suffixes().unwrap();
        prop_assert_eq!(suffixes.len(), text.len());

        let mut expected: Vec<String> =
            (0..text.len()).map(|start| text[start..].to_string()).collect();
        expected.sort();
        prop_assert_eq!(suffixes, expected);
    }

    #[test]
    fn traversal_is_preorder_with_sorted_siblings(text in text_strategy()) {
        let tree = SuffixTree::build(&text);
        let mut nodes = 0usize;
        let mut leaf_total = 0u64;
        tree.traverse(|node| {
            nodes += 1;
            if node.is_leaf {
                leaf_total += 1;
            }
            let keys: Vec<u32> = node.child_symbols.iter().map(|&s| sylva::edge_key(s)).collect();
            assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
        }).unwrap();
        prop_assert_eq!(nodes, tree.node_count());
        prop_assert_eq!(leaf_total as usize, text.len() + 1);
    }

    #[test]
    fn internal_nodes_branch_and_suffix_links_shorten(text in text_strategy()) {
        let tree = SuffixTree::build(&text);
        // Walk by navigator handles so structural fields are reachable.
        let mut stack = vec![tree.root()];
        while let Some(node) = stack.pop() {
            let children = tree.children(node).unwrap();
            if !tree.is_root(node) && !children.is_empty() {
                prop_assert!(children.len() >= 2, "unary internal node");
                let link = tree.suffix_link(node).unwrap();
                let link_depth = tree.total_depth(link).unwrap();
                prop_assert_eq!(link_depth + 1, tree.total_depth(node).unwrap());
            }
            for (_, child) in children {
                stack.push(child);
            }
        }
    }
}
