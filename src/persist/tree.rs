// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The persistent tree: loader and reader.
//!
//! A tree built into an mmap-backed storage survives process restart:
//! reopen the file, hand it to [`PersistentTree::load`], and every query
//! works with no rebuild. The loader reads the 72-byte header, sanity
//! checks it, and materializes the text region; from then on navigation
//! decodes node records straight out of storage, deciding compact versus
//! large by comparing each offset against the transition boundary and
//! resolving jump-tagged references through the jump table.

use std::path::Path;

use crate::error::{Error, Result};
use crate::matcher::{self, Anchor, CommonSubstring, CommonSubstrings};
use crate::navigate::Navigator;
use crate::persist::builder;
use crate::persist::header::TreeHeader;
use crate::persist::layout::{
    find_child_entry, layout_at, read_child_entries, read_node, NodeImage, Ref, BOUNDLESS,
};
use crate::queries::{self, Suffixes, VisitedNode};
use crate::storage::{HeapStorage, MmapStorage, Storage};
use crate::text::Text;

/// A suffix tree materialized in a storage provider.
///
/// Queries behave identically to [`crate::SuffixTree`] — both run the same
/// engine through the navigator seam.
///
/// ```
/// use sylva::{HeapStorage, PersistentTree};
///
/// let tree = PersistentTree::build("mississippi", HeapStorage::new()).unwrap();
/// assert!(tree.contains("ssi").unwrap());
/// assert_eq!(tree.longest_repeated_substring().unwrap(), "issi");
/// ```
#[derive(Debug)]
pub struct PersistentTree<S: Storage> {
    storage: S,
    header: TreeHeader,
    text: Text,
}

impl<S: Storage> PersistentTree<S> {
    /// Promotion threshold used by [`PersistentTree::build`]: the largest
    /// limit at which every compact reference still fits its 31 direct
    /// bits.
    pub const DEFAULT_COMPACT_LIMIT: u64 = 0x7FFF_FFFF;

    /// Build a tree for `text` into `storage`, replacing its contents.
    pub fn build(text: &str, storage: S) -> Result<Self> {
        Self::build_with(text, storage, Self::DEFAULT_COMPACT_LIMIT)
    }

    /// Build with an explicit promotion threshold. Small limits force the
    /// hybrid layout early; equivalence with the pure-compact tree is a
    /// tested property, not a hope. Limits above
    /// [`Self::DEFAULT_COMPACT_LIMIT`] are clamped to it.
    pub fn build_with(text: &str, storage: S, compact_limit: u64) -> Result<Self> {
        Self::build_from_text(Text::new(text), storage, compact_limit)
    }

    pub(crate) fn build_from_text(text: Text, storage: S, compact_limit: u64) -> Result<Self> {
        let (storage, header) = builder::build(&text, storage, compact_limit)?;
        Ok(Self {
            storage,
            header,
            text,
        })
    }

    /// Load a previously built tree. No rebuild: the header is validated,
    /// the text region is read, and the node records stay where they are.
    pub fn load(storage: S) -> Result<Self> {
        let header = TreeHeader::read_from(&storage)?;
        let mut text_bytes = vec![0u8; (header.text_len * 2) as usize];
        storage.read_bytes(header.text_offset, &mut text_bytes)?;
        let units = text_bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Ok(Self {
            storage,
            header,
            text: Text::from_units(units),
        })
    }

    /// The parsed header.
    pub fn header(&self) -> &TreeHeader {
        &self.header
    }

    /// Borrow the underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Give the storage back, dropping the tree view.
    pub fn into_storage(self) -> S {
        self.storage
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

    /// Total number of nodes, counted by traversal (the header carries no
    /// node count).
    pub fn node_count(&self) -> Result<usize> {
        Ok(queries::node_count(self)? as usize)
    }

    /// Total number of leaves (always N + 1).
    pub fn leaf_count(&self) -> Result<usize> {
        Ok(Navigator::leaf_count(self, self.header.root)? as usize)
    }

    /// Total depth of the deepest internal node: the LRS length.
    pub fn max_depth(&self) -> Result<usize> {
        Ok(self.total_depth(self.header.deepest)? as usize)
    }

    /// The indexed text.
    pub fn text(&self) -> &Text {
        &self.text
    }

    // ------------------------------------------------------------------
    // Record access
    // ------------------------------------------------------------------

    fn node(&self, offset: u64) -> Result<NodeImage> {
        read_node(
            &self.storage,
            offset,
            layout_at(offset, self.header.transition()),
        )
    }

    /// Follow a reference, resolving jump-table indirection.
    fn resolve(&self, reference: Ref) -> Result<Option<u64>> {
        match reference {
            Ref::Null => Ok(None),
            Ref::Direct(offset) => Ok(Some(offset)),
            Ref::Jump(index) => {
                let entry = self.header.jump_start + 8 * u64::from(index);
                if entry + 8 > self.header.jump_end {
                    return Err(Error::corrupt(format!(
                        "jump index {} outside table [{}, {})",
                        index, self.header.jump_start, self.header.jump_end
                    )));
                }
                Ok(Some(self.storage.read_u64(entry)?))
            }
        }
    }
}

impl PersistentTree<HeapStorage> {
    /// Build into a fresh heap buffer.
    pub fn build_in_heap(text: &str) -> Result<Self> {
        Self::build(text, HeapStorage::new())
    }
}

impl PersistentTree<MmapStorage> {
    /// Build into a memory-mapped file at `path` (created or truncated).
    pub fn build_in_file(text: &str, path: impl AsRef<Path>) -> Result<Self> {
        Self::build(text, MmapStorage::create(path)?)
    }

    /// Open a file produced by an earlier build. No rebuild.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::load(MmapStorage::open(path)?)
    }
}

impl<S: Storage> Navigator for PersistentTree<S> {
    type Node = u64;

    fn text(&self) -> &Text {
        &self.text
    }

    fn root(&self) -> u64 {
        self.header.root
    }

    fn is_root(&self, node: u64) -> bool {
        node == self.header.root
    }

    fn is_leaf(&self, node: u64) -> Result<bool> {
        Ok(self.node(node)?.is_leaf())
    }

    fn edge_start(&self, node: u64) -> Result<u64> {
        Ok(self.node(node)?.start)
    }

    fn edge_end(&self, node: u64) -> Result<u64> {
        let end = self.node(node)?.end;
        if end == BOUNDLESS {
            Ok(self.header.text_len + 1)
        } else {
            Ok(end)
        }
    }

    fn depth(&self, node: u64) -> Result<u64> {
        Ok(u64::from(self.node(node)?.depth))
    }

    fn suffix_link(&self, node: u64) -> Result<u64> {
        let reference = self.node(node)?.suffix;
        Ok(self.resolve(reference)?.unwrap_or(self.header.root))
    }

    fn child(&self, node: u64, key: u32) -> Result<Option<u64>> {
        let children = self.node(node)?.children;
        let Some(array) = self.resolve(children)? else {
            return Ok(None);
        };
        let layout = layout_at(array, self.header.transition());
        match find_child_entry(&self.storage, array, layout, key)? {
            Some((_, reference)) => self.resolve(reference),
            None => Ok(None),
        }
    }

    fn children(&self, node: u64) -> Result<Vec<(u32, u64)>> {
        let children = self.node(node)?.children;
        let Some(array) = self.resolve(children)? else {
            return Ok(Vec::new());
        };
        let layout = layout_at(array, self.header.transition());
        let entries = read_child_entries(&self.storage, array, layout)?;
        let mut resolved = Vec::with_capacity(entries.len());
        for (key, reference) in entries {
            let target = self.resolve(reference)?.ok_or_else(|| {
                Error::corrupt(format!("null child reference under key {}", key))
            })?;
            resolved.push((key, target));
        }
        Ok(resolved)
    }

    fn leaf_count(&self, node: u64) -> Result<u64> {
        Ok(self.node(node)?.leaf_count)
    }

    fn deepest_internal(&self) -> u64 {
        self.header.deepest
    }
}
