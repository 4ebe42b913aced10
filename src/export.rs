// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Canonical serialization and the logical hash.
//!
//! The export stream is the tree's *logical* shape, independent of how it
//! is stored: pre-order node records with siblings in ascending edge-key
//! order. Two trees with the same logical shape export byte-identically —
//! in-memory, pure compact, or hybrid, it cannot matter. That is the whole
//! point: the stream is the format you verify and migrate with.
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │ magic "SYLX", version u32                      │
//! ├────────────────────────────────────────────────┤
//! │ text length u64, text units (u16 LE each)      │
//! │ node count u64                                 │
//! │ per node, pre-order:                           │
//! │   edge start u32, edge end u32,                │
//! │   leaf count u32, child count u32,             │
//! │   child edge keys u32 × count, ascending       │
//! ├────────────────────────────────────────────────┤
//! │ FOOTER: crc32 over everything above, "XLYS"    │
//! └────────────────────────────────────────────────┘
//! ```
//!
//! `logical_hash` digests the same content under a domain-separation tag
//! (XXH3, 128 bits). Import validates the stream — footer magic, CRC32,
//! record structure — then rebuilds from the embedded text and refuses to
//! return a tree whose canonical form differs from the stream.

use std::io::{Read, Write};

use crc32fast::Hasher as Crc32Hasher;
use xxhash_rust::xxh3::Xxh3;

use crate::error::{Error, Result};
use crate::navigate::Navigator;
use crate::persist::PersistentTree;
use crate::queries;
use crate::storage::Storage;
use crate::text::{edge_key, Text};

/// Export stream magic: "SYLX" in ASCII.
pub const EXPORT_MAGIC: [u8; 4] = [0x53, 0x59, 0x4C, 0x58];

/// Footer magic: "XLYS" (reversed, marks a complete stream).
pub const EXPORT_FOOTER_MAGIC: [u8; 4] = [0x58, 0x4C, 0x59, 0x53];

/// Current export format version.
pub const EXPORT_VERSION: u32 = 1;

/// Domain-separation tag for [`logical_hash`].
const HASH_DOMAIN: &[u8] = b"sylva:tree:v1";

/// Canonical content: text, node count, pre-order records.
fn canonical_content<N: Navigator>(tree: &N) -> Result<Vec<u8>> {
    let text = tree.text();
    let mut records = Vec::new();
    let mut node_count = 0u64;
    queries::traverse(tree, |node| {
        node_count += 1;
        records.extend_from_slice(&(node.edge_start as u32).to_le_bytes());
        records.extend_from_slice(&(node.edge_end as u32).to_le_bytes());
        records.extend_from_slice(&(node.leaf_count as u32).to_le_bytes());
        records.extend_from_slice(&(node.child_symbols.len() as u32).to_le_bytes());
        for &symbol in &node.child_symbols {
            records.extend_from_slice(&edge_key(symbol).to_le_bytes());
        }
    })?;

    let mut content = Vec::with_capacity(16 + text.len() * 2 + records.len());
    content.extend_from_slice(&(text.len() as u64).to_le_bytes());
    for &unit in text.units() {
        content.extend_from_slice(&unit.to_le_bytes());
    }
    content.extend_from_slice(&node_count.to_le_bytes());
    content.extend_from_slice(&records);
    Ok(content)
}

/// Write the canonical stream for `tree`.
///
/// Byte-deterministic: exporting the same logical tree twice, from any
/// storage layout, produces identical output.
pub fn export<N: Navigator, W: Write>(tree: &N, writer: &mut W) -> Result<()> {
    let mut stream = Vec::new();
    stream.extend_from_slice(&EXPORT_MAGIC);
    stream.extend_from_slice(&EXPORT_VERSION.to_le_bytes());
    stream.extend_from_slice(&canonical_content(tree)?);

    let mut hasher = Crc32Hasher::new();
    hasher.update(&stream);
    stream.extend_from_slice(&hasher.finalize().to_le_bytes());
    stream.extend_from_slice(&EXPORT_FOOTER_MAGIC);

    writer.write_all(&stream)?;
    Ok(())
}

/// 128-bit domain-separated hash of the canonical content.
///
/// Equal for the in-memory, pure-compact, and hybrid materializations of
/// the same text.
pub fn logical_hash<N: Navigator>(tree: &N) -> Result<u128> {
    let mut hasher = Xxh3::new();
    hasher.update(HASH_DOMAIN);
    hasher.update(&canonical_content(tree)?);
    Ok(hasher.digest128())
}

/// Read a canonical stream and rebuild the tree into `storage`.
///
/// The stream is fully validated first (magic, version, CRC32 footer,
/// record structure); the tree is then rebuilt from the embedded text and
/// cross-checked against the stream byte for byte.
pub fn import<R: Read, S: Storage>(reader: &mut R, storage: S) -> Result<PersistentTree<S>> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let min_size = 8 + 16 + 8; // magic+version, text len + node count, footer
    if bytes.len() < min_size {
        return Err(Error::corrupt(format!(
            "stream of {} bytes is shorter than the {}-byte minimum",
            bytes.len(),
            min_size
        )));
    }
    if bytes[0..4] != EXPORT_MAGIC {
        return Err(Error::corrupt(format!(
            "bad stream magic: expected SYLX, got {:?}",
            &bytes[0..4]
        )));
    }
    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != EXPORT_VERSION {
        return Err(Error::corrupt(format!(
            "unsupported stream version {} (expected {})",
            version, EXPORT_VERSION
        )));
    }

    let footer_start = bytes.len() - 8;
    if bytes[footer_start + 4..] != EXPORT_FOOTER_MAGIC {
        return Err(Error::corrupt(
            "stream footer magic missing (truncated export?)".to_string(),
        ));
    }
    let stored_crc = u32::from_le_bytes([
        bytes[footer_start],
        bytes[footer_start + 1],
        bytes[footer_start + 2],
        bytes[footer_start + 3],
    ]);
    let mut hasher = Crc32Hasher::new();
    hasher.update(&bytes[..footer_start]);
    let computed_crc = hasher.finalize();
    if stored_crc != computed_crc {
        return Err(Error::corrupt(format!(
            "stream CRC32 mismatch: stored {:#010x}, computed {:#010x}",
            stored_crc, computed_crc
        )));
    }

    let content = &bytes[8..footer_start];
    let units = validate_content(content)?;

    let tree =
        PersistentTree::build_from_text(Text::from_units(units), storage, PersistentTree::<S>::DEFAULT_COMPACT_LIMIT)?;
    let rebuilt = canonical_content(&tree)?;
    if rebuilt != content {
        return Err(Error::corrupt(
            "stream records do not match the tree its text builds".to_string(),
        ));
    }
    Ok(tree)
}

/// Structural walk of the content section; returns the text units.
fn validate_content(content: &[u8]) -> Result<Vec<u16>> {
    let mut cursor = StreamReader::new(content);
    let text_len = cursor.read_u64()? as usize;
    let mut units = Vec::with_capacity(text_len);
    for _ in 0..text_len {
        units.push(cursor.read_u16()?);
    }
    let node_count = cursor.read_u64()?;
    if node_count == 0 {
        return Err(Error::corrupt("stream claims zero nodes".to_string()));
    }

    // Pre-order shape check: each record consumes one expected slot and
    // pushes its children's.
    let mut expected = vec![1u64];
    let mut records = 0u64;
    let mut leaves = 0u64;
    while let Some(slot) = expected.last_mut() {
        *slot -= 1;
        if *slot == 0 {
            expected.pop();
        }
        records += 1;
        if records > node_count {
            return Err(Error::corrupt(format!(
                "stream describes more records than its claimed {}",
                node_count
            )));
        }

        let _edge_start = cursor.read_u32()?;
        let _edge_end = cursor.read_u32()?;
        let leaf_count = cursor.read_u32()?;
        let child_count = cursor.read_u32()?;
        let mut previous_key = None;
        for _ in 0..child_count {
            let key = cursor.read_u32()?;
            if previous_key.is_some_and(|previous| previous >= key) {
                return Err(Error::corrupt(format!(
                    "child keys out of order in record {}",
                    records
                )));
            }
            previous_key = Some(key);
        }
        if child_count == 0 {
            if leaf_count != 1 {
                return Err(Error::corrupt(format!(
                    "leaf record {} claims {} leaves",
                    records, leaf_count
                )));
            }
            leaves += 1;
        } else {
            expected.push(child_count as u64);
        }
    }

    if records != node_count {
        return Err(Error::corrupt(format!(
            "stream claims {} records but describes {}",
            node_count, records
        )));
    }
    if leaves != text_len as u64 + 1 {
        return Err(Error::corrupt(format!(
            "stream describes {} leaves for a text of {} units",
            leaves, text_len
        )));
    }
    if !cursor.is_empty() {
        return Err(Error::corrupt(format!(
            "{} trailing bytes after the last record",
            cursor.remaining()
        )));
    }
    Ok(units)
}

/// Bounds-checked little-endian reads over a byte slice.
struct StreamReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> StreamReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let slice = self
            .bytes
            .get(self.position..self.position + len)
            .ok_or_else(|| {
                Error::corrupt(format!(
                    "stream truncated at byte {} (wanted {} more)",
                    self.position, len
                ))
            })?;
        self.position += len;
        Ok(slice)
    }

    fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(raw))
    }

    fn is_empty(&self) -> bool {
        self.position == self.bytes.len()
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }
}
