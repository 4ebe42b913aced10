//! Concrete end-to-end scenarios, exercised over both implementations.

use sylva::{HeapStorage, PersistentTree, SuffixTree};

use super::common::naive_occurrences;

/// Run the same assertions against the in-memory and the persistent tree.
fn with_both(text: &str, check: impl Fn(&dyn Queryable)) {
    let in_memory = SuffixTree::build(text);
    let stored = PersistentTree::build_in_heap(text).unwrap();
    let hybrid = PersistentTree::build_with(text, HeapStorage::new(), 256).unwrap();
    check(&in_memory);
    check(&stored);
    check(&hybrid);
}

/// The query surface shared by both trees, object-safe for test plumbing.
trait Queryable {
    fn contains(&self, pattern: &str) -> bool;
    fn count(&self, pattern: &str) -> usize;
    fn find_all(&self, pattern: &str) -> Vec<usize>;
    fn lrs(&self) -> String;
    fn lcs(&self, other: &str) -> String;
    fn suffix_list(&self) -> Vec<String>;
    fn anchors(&self, query: &str, min_length: usize) -> Vec<sylva::Anchor>;
}

impl Queryable for SuffixTree {
    fn contains(&self, pattern: &str) -> bool {
        SuffixTree::contains(self, pattern).unwrap()
    }
    fn count(&self, pattern: &str) -> usize {
        self.count_occurrences(pattern).unwrap()
    }
    fn find_all(&self, pattern: &str) -> Vec<usize> {
        self.find_all_occurrences(pattern).unwrap()
    }
    fn lrs(&self) -> String {
        self.longest_repeated_substring().unwrap()
    }
    fn lcs(&self, other: &str) -> String {
        self.longest_common_substring(other).unwrap()
    }
    fn suffix_list(&self) -> Vec<String> {
        self.all_suffixes().unwrap()
    }
    fn anchors(&self, query: &str, min_length: usize) -> Vec<sylva::Anchor> {
        self.find_exact_match_anchors(query, min_length).unwrap()
    }
}

impl Queryable for PersistentTree<HeapStorage> {
    fn contains(&self, pattern: &str) -> bool {
        PersistentTree::contains(self, pattern).unwrap()
    }
    fn count(&self, pattern: &str) -> usize {
        self.count_occurrences(pattern).unwrap()
    }
    fn find_all(&self, pattern: &str) -> Vec<usize> {
        self.find_all_occurrences(pattern).unwrap()
    }
    fn lrs(&self) -> String {
        self.longest_repeated_substring().unwrap()
    }
    fn lcs(&self, other: &str) -> String {
        self.longest_common_substring(other).unwrap()
    }
    fn suffix_list(&self) -> Vec<String> {
        self.all_suffixes().unwrap()
    }
    fn anchors(&self, query: &str, min_length: usize) -> Vec<sylva::Anchor> {
        self.find_exact_match_anchors(query, min_length).unwrap()
    }
}

#[test]
fn banana() {
    with_both("banana", |tree| {
        assert!(tree.contains("ana"));
        assert_eq!(tree.find_all("ana"), vec![1, 3]);
        assert_eq!(tree.count("a"), 3);
        assert_eq!(tree.lrs(), "ana");
    });
}

#[test]
fn mississippi() {
    with_both("mississippi", |tree| {
        assert_eq!(tree.lrs(), "issi");
        assert_eq!(tree.find_all("ssi"), vec![2, 5]);
        assert_eq!(tree.count("i"), 4);
        assert_eq!(tree.count("issi"), 2);
    });
}

#[test]
fn abracadabra() {
    with_both("abracadabra", |tree| {
        assert_eq!(tree.find_all("abra"), vec![0, 7]);
        assert_eq!(tree.lcs("xxcadyy"), "cad");
    });
}

#[test]
fn runs_of_a_single_symbol() {
    with_both("aaaa", |tree| {
        assert_eq!(tree.count("aa"), 3);
        assert_eq!(tree.lrs(), "aaa");
        assert_eq!(tree.find_all("aaaa"), vec![0]);
        assert_eq!(tree.suffix_list(), vec!["a", "aa", "aaa", "aaaa"]);
    });
}

#[test]
fn abcabxabcd() {
    with_both("abcabxabcd", |tree| {
        assert!(tree.contains("xab"));
        assert_eq!(tree.find_all("ab"), vec![0, 3, 6]);
        let anchors = tree.anchors("abcabx", 3);
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].position_in_text, 0);
        assert_eq!(anchors[0].position_in_query, 0);
        assert_eq!(anchors[0].length, 6);
    });
}

#[test]
fn empty_text() {
    with_both("", |tree| {
        assert!(tree.contains(""));
        assert_eq!(tree.count(""), 0);
        assert_eq!(tree.find_all(""), Vec::<usize>::new());
        assert_eq!(tree.lrs(), "");
        assert!(!tree.contains("a"));
        assert!(tree.suffix_list().is_empty());
    });
}

#[test]
fn empty_pattern_counts_every_position() {
    with_both("banana", |tree| {
        assert!(tree.contains(""));
        assert_eq!(tree.count(""), 6);
        assert_eq!(tree.find_all(""), vec![0, 1, 2, 3, 4, 5]);
    });
}

#[test]
fn pattern_longer_than_text() {
    with_both("abc", |tree| {
        assert!(!tree.contains("abcd"));
        assert_eq!(tree.count("abcd"), 0);
        assert!(tree.find_all("abcabc").is_empty());
    });
}

#[test]
fn non_ascii_text_matches_by_code_units() {
    with_both("héllo héllo", |tree| {
        assert!(tree.contains("héllo"));
        assert_eq!(tree.lrs(), "héllo");
        assert_eq!(tree.count("é"), 2);
    });
}

#[test]
fn disjoint_strings_share_nothing() {
    with_both("aaaa", |tree| {
        assert_eq!(tree.lcs("bbbb"), "");
        assert!(tree.anchors("bbbb", 1).is_empty());
    });
}

#[test]
fn anchors_split_around_a_mismatch() {
    // Query = two text substrings glued with a symbol absent from the text.
    with_both("abcabxabcd", |tree| {
        let anchors = tree.anchors("abcaZbxab", 3);
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors[0].position_in_query, 0);
        assert_eq!(anchors[0].length, 4); // "abca"
        assert_eq!(anchors[1].position_in_query, 5);
        assert_eq!(anchors[1].length, 4); // "bxab"
        assert!(anchors[0].position_in_query < anchors[1].position_in_query);
    });
}

#[test]
fn occurrences_agree_with_scanning() {
    let text = "abcab abcab xbc";
    with_both(text, |tree| {
        for pattern in ["a", "ab", "bc", "abcab", " ", "xbc", "zz"] {
            assert_eq!(
                tree.find_all(pattern),
                naive_occurrences(text, pattern),
                "pattern {:?}",
                pattern
            );
        }
    });
}

#[test]
fn all_longest_common_substrings_reports_every_site() {
    let tree = SuffixTree::build("abXcdYabZcd");
    let all = tree.find_all_longest_common_substrings("ab~cd").unwrap().unwrap();
    assert_eq!(all.substring.len(), 2);
    // "ab" occurs at 0 and 6 in the text, "cd" at 3 and 9; both are
    // maximal-length common substrings.
    assert_eq!(all.positions_in_other, vec![0, 3]);
    assert_eq!(all.positions_in_text, vec![0, 3, 6, 9]);
}
