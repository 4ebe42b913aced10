//! Shared test utilities: naive oracles and corpus strategies.
//!
//! The oracles are deliberately brute force. When a property test fails,
//! the disagreement between the tree and an O(n³) loop is the whole
//! diagnosis. Corpora are ASCII so byte indices and code-unit indices
//! coincide.

#![allow(dead_code)]

use proptest::prelude::*;
use proptest::string::string_regex;

/// Small-alphabet texts that force repeated substrings and deep trees.
pub fn text_strategy() -> impl Strategy<Value = String> {
    string_regex("[ab c]{0,60}").unwrap()
}

/// Slightly wider alphabet for cross-string properties.
pub fn pair_strategy() -> impl Strategy<Value = (String, String)> {
    (
        string_regex("[abcd]{1,50}").unwrap(),
        string_regex("[abcd]{1,50}").unwrap(),
    )
}

/// Every occurrence of `pattern` in `text`, by scanning.
pub fn naive_occurrences(text: &str, pattern: &str) -> Vec<usize> {
    if pattern.is_empty() {
        return (0..text.len()).collect();
    }
    let text = text.as_bytes();
    let pattern = pattern.as_bytes();
    if pattern.len() > text.len() {
        return Vec::new();
    }
    (0..=text.len() - pattern.len())
        .filter(|&start| &text[start..start + pattern.len()] == pattern)
        .collect()
}

/// Length of the longest substring occurring at least twice.
pub fn naive_lrs_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut best = 0;
    for i in 0..bytes.len() {
        for j in i + 1..bytes.len() {
            let mut len = 0;
            while j + len < bytes.len() && bytes[i + len] == bytes[j + len] {
                len += 1;
            }
            best = best.max(len);
        }
    }
    best
}

/// Length of the longest common substring of `a` and `b`.
pub fn naive_lcs_len(a: &str, b: &str) -> usize {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let mut best = 0;
    let mut row = vec![0usize; b.len() + 1];
    for i in 1..=a.len() {
        let mut previous_diagonal = 0;
        for j in 1..=b.len() {
            let current = row[j];
            row[j] = if a[i - 1] == b[j - 1] {
                previous_diagonal + 1
            } else {
                0
            };
            best = best.max(row[j]);
            previous_diagonal = current;
        }
    }
    best
}
