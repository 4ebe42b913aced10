// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The in-memory suffix tree and its query surface.

use crate::error::Result;
use crate::matcher::{self, Anchor, CommonSubstring, CommonSubstrings};
use crate::memory::builder;
use crate::memory::node::{Node, NodeId, ROOT};
use crate::navigate::Navigator;
use crate::queries::{self, Suffixes, VisitedNode};
use crate::text::Text;

/// A suffix tree built online in memory.
///
/// Construction is single-threaded; a finished tree is immutable and all
/// queries are pure, so shared references may be used from any number of
/// threads.
///
/// ```
/// use sylva::SuffixTree;
///
/// let tree = SuffixTree::build("banana");
/// assert!(tree.contains("ana").unwrap());
/// assert_eq!(tree.find_all_occurrences("ana").unwrap(), vec![1, 3]);
/// assert_eq!(tree.longest_repeated_substring().unwrap(), "ana");
/// ```
#[derive(Debug)]
pub struct SuffixTree {
    text: Text,
    nodes: Vec<Node>,
    deepest: NodeId,
    max_depth: u32,
}

impl SuffixTree {
    /// Build the tree for `text` (UTF-16 code units, sentinel appended).
    pub fn build(text: &str) -> Self {
        Self::build_from_text(Text::new(text))
    }

    /// Build from an already-encoded text.
    pub fn build_from_text(text: Text) -> Self {
        let outcome = builder::build(&text);
        Self {
            text,
            nodes: outcome.nodes,
            deepest: outcome.deepest,
            max_depth: outcome.max_depth,
        }
    }

    // ------------------------------------------------------------------
    // Queries (shared engine, see `queries` and `matcher`)
    // ------------------------------------------------------------------

    /// Is `pattern` a substring of the text? The empty pattern is.
    pub fn contains(&self, pattern: &str) -> Result<bool> {
        queries::contains(self, pattern)
    }

    /// Number of occurrences of `pattern`; N for the empty pattern.
    pub fn count_occurrences(&self, pattern: &str) -> Result<usize> {
        queries::count_occurrences(self, pattern)
    }

    /// All occurrence positions of `pattern`, ascending.
    pub fn find_all_occurrences(&self, pattern: &str) -> Result<Vec<usize>> {
        queries::find_all_occurrences(self, pattern)
    }

    /// Longest substring occurring at least twice; empty when none does.
    pub fn longest_repeated_substring(&self) -> Result<String> {
        queries::longest_repeated_substring(self)
    }

    /// Longest common substring with `other`; empty when disjoint.
    pub fn longest_common_substring(&self, other: &str) -> Result<String> {
        matcher::longest_common_substring(self, other)
    }

    /// Longest common substring with one occurrence position on each side.
    pub fn longest_common_substring_info(&self, other: &str) -> Result<Option<CommonSubstring>> {
        matcher::longest_common_substring_info(self, other)
    }

    /// Every maximal-length common substring with all positions.
    pub fn find_all_longest_common_substrings(
        &self,
        other: &str,
    ) -> Result<Option<CommonSubstrings>> {
        matcher::find_all_longest_common_substrings(self, other)
    }

    /// Right-maximal exact matches of `query` of length ≥ `min_length`.
    pub fn find_exact_match_anchors(&self, query: &str, min_length: usize) -> Result<Vec<Anchor>> {
        matcher::find_exact_match_anchors(self, query, min_length)
    }

    /// Lazy lexicographic enumeration of the N proper suffixes.
    pub fn suffixes(&self) -> Suffixes<'_, Self> {
        Suffixes::new(self)
    }

    /// All N proper suffixes, lexicographically sorted.
    pub fn all_suffixes(&self) -> Result<Vec<String>> {
        self.suffixes().collect()
    }

    /// Pre-order traversal, siblings ascending by edge key.
    pub fn traverse<F: FnMut(&VisitedNode)>(&self, visit: F) -> Result<()> {
        queries::traverse(self, visit)
    }

    /// Total number of nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total number of leaves (always N + 1).
    pub fn leaf_count(&self) -> usize {
        self.nodes[ROOT].leaf_count as usize
    }

    /// Total depth of the deepest internal node: the LRS length.
    pub fn max_depth(&self) -> usize {
        self.max_depth as usize
    }

    /// The indexed text.
    pub fn text(&self) -> &Text {
        &self.text
    }
}

impl Navigator for SuffixTree {
    type Node = NodeId;

    fn text(&self) -> &Text {
        &self.text
    }

    fn root(&self) -> NodeId {
        ROOT
    }

    fn is_root(&self, node: NodeId) -> bool {
        node == ROOT
    }

    fn is_leaf(&self, node: NodeId) -> Result<bool> {
        Ok(self.nodes[node].is_leaf())
    }

    fn edge_start(&self, node: NodeId) -> Result<u64> {
        Ok(u64::from(self.nodes[node].start))
    }

    fn edge_end(&self, node: NodeId) -> Result<u64> {
        Ok(u64::from(self.nodes[node].end))
    }

    fn depth(&self, node: NodeId) -> Result<u64> {
        Ok(u64::from(self.nodes[node].depth))
    }

    fn suffix_link(&self, node: NodeId) -> Result<NodeId> {
        Ok(self.nodes[node].suffix_link.unwrap_or(ROOT))
    }

    fn child(&self, node: NodeId, key: u32) -> Result<Option<NodeId>> {
        Ok(self.nodes[node].children.get(&key).copied())
    }

    fn children(&self, node: NodeId) -> Result<Vec<(u32, NodeId)>> {
        Ok(self.nodes[node]
            .children
            .iter()
            .map(|(&key, &child)| (key, child))
            .collect())
    }

    fn leaf_count(&self, node: NodeId) -> Result<u64> {
        Ok(u64::from(self.nodes[node].leaf_count))
    }

    fn deepest_internal(&self) -> NodeId {
        self.deepest
    }
}
