// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Streaming match of a query against the tree.
//!
//! One walk drives both longest-common-substring search and exact-match
//! anchor extraction. The walk maintains the classical matching-statistics
//! state: the last fully entered node, an optional edge position below it,
//! and the current match length. On a mismatch it follows the node's
//! suffix link (root when absent), drops one symbol from the front of the
//! match, and rescans the retained symbols downward — descending whole
//! edges by length alone, since a previously matched string cannot
//! mismatch on rescan. Total work is O(|text| + |query|).
//!
//! Consumers observe the walk through [`MatchSink`]: an event after every
//! successful extension and after every one-symbol drop. The LCS sink
//! tracks the maximum; the anchor sink tracks peaks over a threshold.

use crate::error::{Error, Result};
use crate::navigate::Navigator;
use crate::queries::{any_leaf_position, collect_leaf_positions};
use crate::text::{edge_key, pattern_symbols, Symbol};

/// The longest common substring with its locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonSubstring {
    pub substring: String,
    /// Start of one occurrence in the indexed text.
    pub position_in_text: usize,
    /// Start of the match in the query string (UTF-16 units).
    pub position_in_other: usize,
}

/// All longest common substrings of maximal length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonSubstrings {
    /// The first maximal match in query order.
    pub substring: String,
    /// Every occurrence start in the indexed text, sorted and deduplicated.
    pub positions_in_text: Vec<usize>,
    /// Every maximal match start in the query, ascending.
    pub positions_in_other: Vec<usize>,
}

/// A right-maximal exact-match anchor between query and text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub position_in_text: usize,
    pub position_in_query: usize,
    pub length: usize,
}

/// Walk events. `locus` is the node whose subtree holds every occurrence
/// of the current match (the edge's child node when mid-edge).
trait MatchSink<H: Copy> {
    /// The symbol at query index `i` extended the match to `len`.
    fn extended(&mut self, i: usize, len: u64, locus: H);
    /// A suffix-link step shrank the match to `len` while retrying index `i`.
    fn dropped(&mut self, i: usize, len: u64) -> Result<()>;
}

struct Walk<'n, N: Navigator> {
    nav: &'n N,
    node: N::Node,
    edge: Option<N::Node>,
    edge_offset: u64,
    match_len: u64,
}

impl<'n, N: Navigator> Walk<'n, N> {
    fn new(nav: &'n N) -> Self {
        Self {
            nav,
            node: nav.root(),
            edge: None,
            edge_offset: 0,
            match_len: 0,
        }
    }

    fn locus(&self) -> N::Node {
        self.edge.unwrap_or(self.node)
    }

    /// Try to extend the current match with `c`; true on success.
    fn try_extend(&mut self, c: Symbol) -> Result<bool> {
        match self.edge {
            Some(edge) => {
                if self.nav.edge_symbol(edge, self.edge_offset)? != c {
                    return Ok(false);
                }
                self.edge_offset += 1;
                self.match_len += 1;
                if self.edge_offset == self.nav.edge_len(edge)? {
                    self.node = edge;
                    self.edge = None;
                    self.edge_offset = 0;
                }
                Ok(true)
            }
            None => {
                let Some(child) = self.nav.child(self.node, edge_key(c))? else {
                    return Ok(false);
                };
                self.match_len += 1;
                if self.nav.edge_len(child)? == 1 {
                    self.node = child;
                } else {
                    self.edge = Some(child);
                    self.edge_offset = 1;
                }
                Ok(true)
            }
        }
    }

    /// Follow the suffix link and rescan the retained match symbols.
    fn shrink(&mut self, query: &[Symbol], i: usize) -> Result<()> {
        self.node = self.nav.suffix_link(self.node)?;
        self.match_len -= 1;
        self.edge = None;
        self.edge_offset = 0;

        let mut remaining = self.match_len - self.nav.total_depth(self.node)?;
        let mut position = i - remaining as usize;
        while remaining > 0 {
            let key = edge_key(query[position]);
            let child = self.nav.child(self.node, key)?.ok_or_else(|| {
                Error::corrupt(format!(
                    "rescan lost a previously matched symbol at query index {}",
                    position
                ))
            })?;
            let edge_len = self.nav.edge_len(child)?;
            if edge_len <= remaining {
                self.node = child;
                position += edge_len as usize;
                remaining -= edge_len;
            } else {
                self.edge = Some(child);
                self.edge_offset = remaining;
                remaining = 0;
            }
        }
        Ok(())
    }

    fn run<K: MatchSink<N::Node>>(&mut self, query: &[Symbol], sink: &mut K) -> Result<()> {
        for (i, &c) in query.iter().enumerate() {
            loop {
                if self.try_extend(c)? {
                    sink.extended(i, self.match_len, self.locus());
                    break;
                }
                if self.match_len == 0 {
                    break;
                }
                self.shrink(query, i)?;
                sink.dropped(i, self.match_len)?;
            }
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------
// LCS
// ----------------------------------------------------------------------

struct LcsSink<H: Copy> {
    best_len: u64,
    /// Maximal candidates as (query end index, locus); cleared whenever a
    /// strictly longer match appears, so the first entry is the winner.
    candidates: Vec<(usize, H)>,
    keep_all: bool,
}

impl<H: Copy> MatchSink<H> for LcsSink<H> {
    fn extended(&mut self, i: usize, len: u64, locus: H) {
        if len > self.best_len {
            self.best_len = len;
            self.candidates.clear();
            self.candidates.push((i, locus));
        } else if self.keep_all && len == self.best_len && len > 0 {
            // A match run touches its final length exactly once per end
            // index, so ends here are distinct.
            self.candidates.push((i, locus));
        }
    }

    fn dropped(&mut self, _i: usize, _len: u64) -> Result<()> {
        Ok(())
    }
}

fn lcs_walk<N: Navigator>(nav: &N, other: &str, keep_all: bool) -> Result<LcsSink<N::Node>> {
    let query = pattern_symbols(other);
    let mut sink = LcsSink {
        best_len: 0,
        candidates: Vec::new(),
        keep_all,
    };
    Walk::new(nav).run(&query, &mut sink)?;
    Ok(sink)
}

fn query_substring(other: &str, start: usize, len: usize) -> String {
    let units: Vec<u16> = other.encode_utf16().collect();
    String::from_utf16_lossy(&units[start..start + len])
}

/// Longest common substring of the tree's text and `other`, with one
/// occurrence position on each side. Ties keep the first maximum in query
/// order. `None` when the strings share nothing.
pub(crate) fn longest_common_substring_info<N: Navigator>(
    nav: &N,
    other: &str,
) -> Result<Option<CommonSubstring>> {
    let sink = lcs_walk(nav, other, false)?;
    let Some(&(end, locus)) = sink.candidates.first() else {
        return Ok(None);
    };
    let len = sink.best_len as usize;
    let start = end + 1 - len;
    Ok(Some(CommonSubstring {
        substring: query_substring(other, start, len),
        position_in_text: any_leaf_position(nav, locus)? as usize,
        position_in_other: start,
    }))
}

pub(crate) fn longest_common_substring<N: Navigator>(nav: &N, other: &str) -> Result<String> {
    Ok(longest_common_substring_info(nav, other)?
        .map(|found| found.substring)
        .unwrap_or_default())
}

/// Every maximal-length common substring: match starts in the query plus
/// the union of occurrence positions in the text.
pub(crate) fn find_all_longest_common_substrings<N: Navigator>(
    nav: &N,
    other: &str,
) -> Result<Option<CommonSubstrings>> {
    let sink = lcs_walk(nav, other, true)?;
    if sink.candidates.is_empty() {
        return Ok(None);
    }
    let len = sink.best_len as usize;

    let mut positions_in_other: Vec<usize> =
        sink.candidates.iter().map(|&(end, _)| end + 1 - len).collect();
    positions_in_other.sort_unstable();
    positions_in_other.dedup();

    let mut positions_in_text = Vec::new();
    let mut seen_loci: Vec<N::Node> = Vec::new();
    for &(_, locus) in &sink.candidates {
        if !seen_loci.contains(&locus) {
            seen_loci.push(locus);
            collect_leaf_positions(nav, locus, &mut positions_in_text)?;
        }
    }
    let mut positions_in_text: Vec<usize> =
        positions_in_text.into_iter().map(|p| p as usize).collect();
    positions_in_text.sort_unstable();
    positions_in_text.dedup();

    let first_end = sink.candidates[0].0;
    Ok(Some(CommonSubstrings {
        substring: query_substring(other, first_end + 1 - len, len),
        positions_in_text,
        positions_in_other,
    }))
}

// ----------------------------------------------------------------------
// Exact-match anchors
// ----------------------------------------------------------------------

struct AnchorSink<'n, N: Navigator> {
    nav: &'n N,
    min_length: u64,
    peak: Option<(u64, usize, N::Node)>,
    anchors: Vec<Anchor>,
}

impl<'n, N: Navigator> AnchorSink<'n, N> {
    fn emit(&mut self) -> Result<()> {
        if let Some((len, end, locus)) = self.peak.take() {
            self.anchors.push(Anchor {
                position_in_text: any_leaf_position(self.nav, locus)? as usize,
                position_in_query: end + 1 - len as usize,
                length: len as usize,
            });
        }
        Ok(())
    }
}

impl<'n, N: Navigator> MatchSink<N::Node> for AnchorSink<'n, N> {
    fn extended(&mut self, i: usize, len: u64, locus: N::Node) {
        if len >= self.min_length && self.peak.map_or(true, |(peak_len, _, _)| len > peak_len) {
            self.peak = Some((len, i, locus));
        }
    }

    fn dropped(&mut self, _i: usize, len: u64) -> Result<()> {
        if len < self.min_length {
            self.emit()?;
        }
        Ok(())
    }
}

/// Right-maximal exact matches of length at least `min_length`, one per
/// local maximum run, ordered by query position.
pub(crate) fn find_exact_match_anchors<N: Navigator>(
    nav: &N,
    query: &str,
    min_length: usize,
) -> Result<Vec<Anchor>> {
    if min_length == 0 {
        return Err(Error::invalid("anchor min_length must be positive"));
    }
    let symbols = pattern_symbols(query);
    let mut sink = AnchorSink {
        nav,
        min_length: min_length as u64,
        peak: None,
        anchors: Vec::new(),
    };
    Walk::new(nav).run(&symbols, &mut sink)?;
    sink.emit()?;
    Ok(sink.anchors)
}
