// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Hybrid persistent builder.
//!
//! The same online construction as the in-memory builder, but every node
//! and child array materializes straight into storage, addressed by byte
//! offset. Storage is append-only during a build: growing a child array
//! allocates a fresh one and abandons the old (the leak is bounded by the
//! build and is the price of never moving finished bytes).
//!
//! Two things make this the trickiest code in the crate:
//!
//! **Promotion.** Allocations use the 28-byte compact layout while
//! `size + needed` stays within `compact_limit`; the first allocation past
//! it fixes `transition_offset` and switches to the 48-byte large layout
//! for good. A compact field that must reference a large-zone target gets
//! a jump-table index (tag bit 31) instead of an offset; the table itself
//! is accumulated in memory — a >31-bit offset has no representable
//! in-field intermediate state — deduplicated by target, and appended to
//! storage at finalization. Large fields always store offsets directly.
//!
//! **Slot reuse on split.** Splitting an edge rewrites the existing record
//! as the new internal node, so the grandparent's child entry stays
//! valid, and moves the continuation (the original node, edge start
//! advanced) to a fresh slot. A node that moves may carry pending suffix
//! links in either direction, and may be the deepest-node bookmark or the
//! phase's link-pending split; relocation retargets all of them. Suffix
//! links themselves live in a side map until finalization, when each is
//! written with the encoding its source's zone requires.

use std::collections::HashMap;

use crate::error::Result;
use crate::persist::header::{TreeHeader, HEADER_SIZE, VERSION_COMPACT, VERSION_HYBRID};
use crate::persist::layout::{
    array_size, find_child_entry, layout_at, read_child_entries, read_node, write_child_entry,
    write_children_ref, write_leaf_count, write_node, write_suffix_ref, Layout, NodeImage, Ref,
    BOUNDLESS,
};
use crate::storage::Storage;
use crate::text::{edge_key, Symbol, Text};

/// Hard ceiling on `compact_limit`: a direct compact reference has 31
/// bits, bit 31 being the jump tag.
const COMPACT_LIMIT_CEILING: u64 = 0x7FFF_FFFF;

/// Build a persistent tree for `text` into `storage`.
///
/// Returns the storage (finalized and flushed) and its header.
pub(crate) fn build<S: Storage>(
    text: &Text,
    storage: S,
    compact_limit: u64,
) -> Result<(S, TreeHeader)> {
    let compact_limit = compact_limit.min(COMPACT_LIMIT_CEILING);
    let mut builder = HybridBuilder::new(text, storage, compact_limit)?;
    for position in 0..=text.len() {
        builder.extend(position)?;
    }
    builder.finalize()
}

struct HybridBuilder<'t, S: Storage> {
    storage: S,
    text: &'t Text,
    compact_limit: u64,
    promoted: bool,
    transition: u64,

    /// Jump-table targets in assignment order, deduplicated via `jump_index`.
    jump: Vec<u64>,
    jump_index: HashMap<u64, u32>,

    /// Pending suffix links, source offset → target offset.
    links: HashMap<u64, u64>,
    /// Reverse index for relocation: target offset → source offsets.
    links_rev: HashMap<u64, Vec<u64>>,

    root: u64,
    active_node: u64,
    active_edge: usize,
    active_len: u64,
    remainder: u64,
    last_internal: Option<u64>,

    deepest: u64,
    max_depth: u64,
}

impl<'t, S: Storage> HybridBuilder<'t, S> {
    fn new(text: &'t Text, mut storage: S, compact_limit: u64) -> Result<Self> {
        storage.set_size(0)?;
        storage.set_size(HEADER_SIZE)?;
        let mut builder = Self {
            storage,
            text,
            compact_limit,
            promoted: false,
            transition: 0,
            jump: Vec::new(),
            jump_index: HashMap::new(),
            links: HashMap::new(),
            links_rev: HashMap::new(),
            root: 0,
            active_node: 0,
            active_edge: 0,
            active_len: 0,
            remainder: 0,
            last_internal: None,
            deepest: 0,
            max_depth: 0,
        };
        let (root, layout) = builder.alloc_node()?;
        write_node(&mut builder.storage, root, layout, &NodeImage::root())?;
        builder.root = root;
        builder.active_node = root;
        builder.deepest = root;
        Ok(builder)
    }

    // ------------------------------------------------------------------
    // Allocation and references
    // ------------------------------------------------------------------

    fn transition_boundary(&self) -> Option<u64> {
        self.promoted.then_some(self.transition)
    }

    fn layout_of(&self, offset: u64) -> Layout {
        layout_at(offset, self.transition_boundary())
    }

    /// Append-allocate a record, promoting to the large layout when the
    /// compact-sized allocation would cross `compact_limit`.
    fn alloc(&mut self, compact_size: u64, large_size: u64) -> Result<(u64, Layout)> {
        let offset = self.storage.size();
        if !self.promoted && offset + compact_size > self.compact_limit {
            self.promoted = true;
            self.transition = offset;
        }
        let (layout, needed) = if self.promoted {
            (Layout::Large, large_size)
        } else {
            (Layout::Compact, compact_size)
        };
        self.storage.set_size(offset + needed)?;
        Ok((offset, layout))
    }

    fn alloc_node(&mut self) -> Result<(u64, Layout)> {
        self.alloc(Layout::Compact.node_size(), Layout::Large.node_size())
    }

    fn alloc_array(&mut self, count: u64) -> Result<(u64, Layout)> {
        self.alloc(
            array_size(Layout::Compact, count),
            array_size(Layout::Large, count),
        )
    }

    /// Absolute target of a non-null reference.
    fn target_of(&self, reference: Ref) -> Option<u64> {
        match reference {
            Ref::Null => None,
            Ref::Direct(offset) => Some(offset),
            Ref::Jump(index) => Some(self.jump[index as usize]),
        }
    }

    /// Encode `target` for a field in the given layout, minting a jump
    /// entry when a compact field must reach into the large zone.
    fn encode_target(&mut self, field_layout: Layout, target: u64) -> Ref {
        match field_layout {
            Layout::Large => Ref::Direct(target),
            Layout::Compact => {
                if self.promoted && target >= self.transition {
                    Ref::Jump(self.jump_id(target))
                } else {
                    Ref::Direct(target)
                }
            }
        }
    }

    fn jump_id(&mut self, target: u64) -> u32 {
        if let Some(&index) = self.jump_index.get(&target) {
            return index;
        }
        let index = self.jump.len() as u32;
        self.jump.push(target);
        self.jump_index.insert(target, index);
        index
    }

    // ------------------------------------------------------------------
    // Node access during construction
    // ------------------------------------------------------------------

    fn node(&self, offset: u64) -> Result<NodeImage> {
        read_node(&self.storage, offset, self.layout_of(offset))
    }

    fn edge_len_at(&self, node: &NodeImage, position: usize) -> u64 {
        if node.end == BOUNDLESS {
            position as u64 + 1 - node.start
        } else {
            node.end - node.start
        }
    }

    /// Total depth of a node whose edge end is concrete (root or internal).
    fn total_depth(&self, offset: u64) -> Result<u64> {
        let node = self.node(offset)?;
        debug_assert_ne!(node.end, BOUNDLESS);
        Ok(u64::from(node.depth) + (node.end - node.start))
    }

    fn child_of(&self, parent: u64, key: u32) -> Result<Option<u64>> {
        let parent_node = self.node(parent)?;
        let Some(array) = self.target_of(parent_node.children) else {
            return Ok(None);
        };
        let layout = self.layout_of(array);
        match find_child_entry(&self.storage, array, layout, key)? {
            Some((_, reference)) => Ok(self.target_of(reference)),
            None => Ok(None),
        }
    }

    fn children_of(&self, parent: u64) -> Result<Vec<u64>> {
        let parent_node = self.node(parent)?;
        let Some(array) = self.target_of(parent_node.children) else {
            return Ok(Vec::new());
        };
        let layout = self.layout_of(array);
        let entries = read_child_entries(&self.storage, array, layout)?;
        Ok(entries
            .into_iter()
            .filter_map(|(_, reference)| self.target_of(reference))
            .collect())
    }

    /// Insert or update a child entry, reallocating the array on growth.
    fn insert_child(&mut self, parent: u64, key: u32, child: u64) -> Result<()> {
        let parent_layout = self.layout_of(parent);
        let parent_node = self.node(parent)?;

        let Some(array) = self.target_of(parent_node.children) else {
            let (array, layout) = self.alloc_array(1)?;
            self.storage.write_u32(array, 1)?;
            let reference = self.encode_target(layout, child);
            write_child_entry(&mut self.storage, array, 0, layout, key, reference)?;
            let array_ref = self.encode_target(parent_layout, array);
            return write_children_ref(&mut self.storage, parent, parent_layout, array_ref);
        };

        let layout = self.layout_of(array);
        if let Some((index, _)) = find_child_entry(&self.storage, array, layout, key)? {
            let reference = self.encode_target(layout, child);
            return write_child_entry(&mut self.storage, array, index, layout, key, reference);
        }

        // Grow: decode to absolute targets, reallocate, re-encode for the
        // new array's zone.
        let old_entries = read_child_entries(&self.storage, array, layout)?;
        let mut targets: Vec<(u32, u64)> = old_entries
            .into_iter()
            .filter_map(|(entry_key, reference)| {
                self.target_of(reference).map(|target| (entry_key, target))
            })
            .collect();
        let insert_at = targets.partition_point(|&(entry_key, _)| entry_key < key);
        targets.insert(insert_at, (key, child));

        let (new_array, new_layout) = self.alloc_array(targets.len() as u64)?;
        self.storage.write_u32(new_array, targets.len() as u32)?;
        for (index, &(entry_key, target)) in targets.iter().enumerate() {
            let reference = self.encode_target(new_layout, target);
            write_child_entry(
                &mut self.storage,
                new_array,
                index as u32,
                new_layout,
                entry_key,
                reference,
            )?;
        }
        let array_ref = self.encode_target(parent_layout, new_array);
        write_children_ref(&mut self.storage, parent, parent_layout, array_ref)
    }

    fn new_leaf(&mut self, position: usize, depth: u32) -> Result<u64> {
        let (offset, layout) = self.alloc_node()?;
        write_node(
            &mut self.storage,
            offset,
            layout,
            &NodeImage::leaf(position as u64, depth),
        )?;
        Ok(offset)
    }

    // ------------------------------------------------------------------
    // Suffix-link bookkeeping
    // ------------------------------------------------------------------

    fn set_pending_link(&mut self, source: u64, target: u64) {
        if let Some(previous) = self.links.insert(source, target) {
            if let Some(sources) = self.links_rev.get_mut(&previous) {
                sources.retain(|&s| s != source);
            }
        }
        self.links_rev.entry(target).or_default().push(source);
    }

    fn record_link(&mut self, target: u64) {
        if let Some(source) = self.last_internal.take() {
            self.set_pending_link(source, target);
        }
    }

    /// A split moved the node at `old` to `new`; follow it everywhere.
    fn relocate(&mut self, old: u64, new: u64) {
        if let Some(target) = self.links.remove(&old) {
            if let Some(sources) = self.links_rev.get_mut(&target) {
                sources.retain(|&s| s != old);
            }
            self.set_pending_link(new, target);
        }
        if let Some(sources) = self.links_rev.remove(&old) {
            for &source in &sources {
                self.links.insert(source, new);
            }
            self.links_rev.entry(new).or_default().extend(sources);
        }
        if self.deepest == old {
            self.deepest = new;
        }
        if self.last_internal == Some(old) {
            self.last_internal = Some(new);
        }
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// One phase: extend every pending suffix with the symbol at `position`.
    fn extend(&mut self, position: usize) -> Result<()> {
        let c = self.text.sym(position);
        self.remainder += 1;
        self.last_internal = None;

        while self.remainder > 0 {
            if self.active_len == 0 {
                self.active_edge = position;
            }
            let key = edge_key(self.text.sym(self.active_edge));

            match self.child_of(self.active_node, key)? {
                None => {
                    let depth = self.total_depth(self.active_node)? as u32;
                    let leaf = self.new_leaf(position, depth)?;
                    self.insert_child(self.active_node, key, leaf)?;
                    let target = self.active_node;
                    self.record_link(target);
                }
                Some(child) => {
                    let child_node = self.node(child)?;
                    let edge_len = self.edge_len_at(&child_node, position);
                    if self.active_len >= edge_len {
                        self.active_edge += edge_len as usize;
                        self.active_len -= edge_len;
                        self.active_node = child;
                        continue;
                    }
                    let probe = (child_node.start + self.active_len) as usize;
                    if self.text.sym(probe) == c {
                        self.active_len += 1;
                        let target = self.active_node;
                        self.record_link(target);
                        break;
                    }
                    let split = self.split(child, &child_node, position, c)?;
                    self.record_link(split);
                    self.last_internal = Some(split);
                }
            }

            self.remainder -= 1;
            if self.active_node == self.root && self.active_len > 0 {
                self.active_len -= 1;
                self.active_edge = position + 1 - self.remainder as usize;
            } else if self.active_node != self.root {
                self.active_node = self
                    .links
                    .get(&self.active_node)
                    .copied()
                    .unwrap_or(self.root);
            }
        }
        Ok(())
    }

    /// Split `child`'s edge `active_len` symbols in. The split node takes
    /// over `child`'s slot; the continuation moves to a fresh one.
    fn split(
        &mut self,
        child: u64,
        child_node: &NodeImage,
        position: usize,
        c: Symbol,
    ) -> Result<u64> {
        let slot_layout = self.layout_of(child);
        let split_end = child_node.start + self.active_len;
        let split_depth = u64::from(child_node.depth) + self.active_len;

        // Continuation: the original node, edge start advanced, children
        // and pending links carried along.
        let (continuation, cont_layout) = self.alloc_node()?;
        let cont_children = match self.target_of(child_node.children) {
            Some(array) => self.encode_target(cont_layout, array),
            None => Ref::Null,
        };
        write_node(
            &mut self.storage,
            continuation,
            cont_layout,
            &NodeImage {
                start: split_end,
                end: child_node.end,
                depth: split_depth as u32,
                suffix: Ref::Null,
                children: cont_children,
                leaf_count: 0,
                flags: child_node.flags,
            },
        )?;
        self.relocate(child, continuation);

        let leaf = self.new_leaf(position, split_depth as u32)?;

        let continuation_key = edge_key(self.text.sym(split_end as usize));
        let leaf_key = edge_key(c);
        debug_assert_ne!(continuation_key, leaf_key);
        let (array, array_layout) = self.alloc_array(2)?;
        self.storage.write_u32(array, 2)?;
        let mut entries = [(continuation_key, continuation), (leaf_key, leaf)];
        entries.sort_unstable_by_key(|&(entry_key, _)| entry_key);
        for (index, &(entry_key, target)) in entries.iter().enumerate() {
            let reference = self.encode_target(array_layout, target);
            write_child_entry(
                &mut self.storage,
                array,
                index as u32,
                array_layout,
                entry_key,
                reference,
            )?;
        }

        // The split node overwrites the old slot, so the grandparent's
        // child entry keeps pointing at the right place.
        let array_ref = self.encode_target(slot_layout, array);
        write_node(
            &mut self.storage,
            child,
            slot_layout,
            &NodeImage {
                start: child_node.start,
                end: split_end,
                depth: child_node.depth,
                suffix: Ref::Null,
                children: array_ref,
                leaf_count: 0,
                flags: 0,
            },
        )?;

        if split_depth > self.max_depth {
            self.max_depth = split_depth;
            self.deepest = child;
        }
        Ok(child)
    }

    // ------------------------------------------------------------------
    // Finalization
    // ------------------------------------------------------------------

    fn finalize(mut self) -> Result<(S, TreeHeader)> {
        debug_assert_eq!(self.remainder, 0, "sentinel phase left pending suffixes");

        // Suffix links, encoded per the source's zone.
        let pending: Vec<(u64, u64)> = self.links.iter().map(|(&s, &t)| (s, t)).collect();
        for (source, target) in pending {
            let layout = self.layout_of(source);
            let reference = self.encode_target(layout, target);
            write_suffix_ref(&mut self.storage, source, layout, reference)?;
        }

        // Leaf counts, children before parents.
        let mut stack = vec![(self.root, false)];
        while let Some((offset, visited)) = stack.pop() {
            let layout = self.layout_of(offset);
            let node = read_node(&self.storage, offset, layout)?;
            if visited {
                let count = if node.is_leaf() {
                    1
                } else {
                    let mut sum = 0u64;
                    for child in self.children_of(offset)? {
                        sum += self.node(child)?.leaf_count;
                    }
                    sum
                };
                write_leaf_count(&mut self.storage, offset, layout, count)?;
            } else {
                stack.push((offset, true));
                if !node.is_leaf() {
                    for child in self.children_of(offset)? {
                        stack.push((child, false));
                    }
                }
            }
        }

        // Text region.
        let mut text_bytes = Vec::with_capacity(self.text.len() * 2);
        for &unit in self.text.units() {
            text_bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let text_offset = if text_bytes.is_empty() {
            self.storage.size()
        } else {
            self.storage.append_bytes(&text_bytes)?
        };

        // Jump table.
        let (jump_start, jump_end) = if self.promoted {
            let start = self.storage.size();
            for index in 0..self.jump.len() {
                let target = self.jump[index];
                self.storage.append_u64(target)?;
            }
            (start, self.storage.size())
        } else {
            (0, 0)
        };

        let header = TreeHeader {
            version: if self.promoted {
                VERSION_HYBRID
            } else {
                VERSION_COMPACT
            },
            storage_size: self.storage.size(),
            root: self.root,
            text_offset,
            text_len: self.text.len() as u64,
            deepest: self.deepest,
            transition_offset: if self.promoted { self.transition } else { 0 },
            jump_start,
            jump_end,
        };
        header.write_to(&mut self.storage)?;
        self.storage.flush()?;
        Ok((self.storage, header))
    }
}
