// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Layout-independent tree navigation.
//!
//! Every query in the crate — containment, occurrence listing, LCS,
//! anchor extraction, traversal, export — is written once against this
//! trait and monomorphized per tree. The in-memory tree navigates arena
//! indices; the persistent tree navigates byte offsets and decodes node
//! records on the fly. If the two ever disagree on a query, the bug is in
//! a navigator, never in the algorithm.
//!
//! Methods return `Result` because the persistent navigator reads from
//! storage and a damaged file must surface as an error, not a panic. The
//! in-memory navigator never fails.

use crate::error::Result;
use crate::text::{Symbol, Text};

/// Handle-based navigation over a finished suffix tree.
pub trait Navigator {
    /// Stable node handle: an arena index or a storage offset.
    type Node: Copy + PartialEq + Eq + std::fmt::Debug;

    /// The indexed text.
    fn text(&self) -> &Text;

    /// The root node.
    fn root(&self) -> Self::Node;

    /// Is this the root?
    fn is_root(&self, node: Self::Node) -> bool;

    /// Does this node have no children?
    fn is_leaf(&self, node: Self::Node) -> Result<bool>;

    /// Start of the node's incoming edge label (0 for the root).
    fn edge_start(&self, node: Self::Node) -> Result<u64>;

    /// End of the incoming edge label, with boundless leaf edges resolved
    /// to N+1 (0 for the root).
    fn edge_end(&self, node: Self::Node) -> Result<u64>;

    /// Cumulative edge length from the root to the START of this node's
    /// edge.
    fn depth(&self, node: Self::Node) -> Result<u64>;

    /// Suffix link target; the root when the node carries none.
    fn suffix_link(&self, node: Self::Node) -> Result<Self::Node>;

    /// Child under the given edge key, if any.
    fn child(&self, node: Self::Node, key: u32) -> Result<Option<Self::Node>>;

    /// All children in ascending edge-key order.
    fn children(&self, node: Self::Node) -> Result<Vec<(u32, Self::Node)>>;

    /// Number of leaves in this node's subtree.
    fn leaf_count(&self, node: Self::Node) -> Result<u64>;

    /// The internal node of maximum total depth (root when no substring
    /// repeats).
    fn deepest_internal(&self) -> Self::Node;

    // ------------------------------------------------------------------
    // Derived navigation
    // ------------------------------------------------------------------

    /// Length of the incoming edge label.
    fn edge_len(&self, node: Self::Node) -> Result<u64> {
        Ok(self.edge_end(node)? - self.edge_start(node)?)
    }

    /// Depth measured to the node itself (end of its edge).
    fn total_depth(&self, node: Self::Node) -> Result<u64> {
        Ok(self.depth(node)? + self.edge_len(node)?)
    }

    /// Symbol at `offset` into the node's edge label.
    fn edge_symbol(&self, node: Self::Node, offset: u64) -> Result<Symbol> {
        let position = self.edge_start(node)? + offset;
        debug_assert!(position < self.edge_end(node)?);
        Ok(self.text().sym(position as usize))
    }

    /// Text position of the suffix a leaf represents.
    fn leaf_position(&self, node: Self::Node) -> Result<u64> {
        debug_assert!(self.is_leaf(node)?);
        Ok(self.text().len() as u64 + 1 - self.total_depth(node)?)
    }
}
