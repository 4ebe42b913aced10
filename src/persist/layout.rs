// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Node codec: the two on-disk record layouts.
//!
//! A node record is a fixed-size run of little-endian fields; a child
//! array is a count-prefixed, key-sorted run of `(key, ref)` pairs. Both
//! come in two widths:
//!
//! ```text
//! compact (28 B)                      large (48 B)
//! offset field         width          offset field         width
//!      0 start         u32                 0 start         u64
//!      4 end           u32                 8 end           u64
//!      8 depth         u32                16 depth         u32
//!     12 suffix link   u32                20 suffix link   u64
//!     16 child array   u32                28 child array   u64
//!     20 leaf count    u32                36 leaf count    u64
//!     24 flags         u32                44 flags         u32
//!
//! child entry: key u32 + ref u32      child entry: key u32 + ref u64
//! ```
//!
//! The layout of a record is decided by its offset alone: at or past the
//! transition offset means large. Compact reference fields are 32-bit and
//! use bit 31 as a tag — set means the low 31 bits index the jump table,
//! clear means the value is the target offset itself. Large fields store
//! offsets directly and never need the tag. A zero reference is null in
//! both layouts, which works because offset 0 is the header magic and can
//! never address a record.
//!
//! An edge end of all-ones means "boundless": the edge runs to the text
//! frontier. Readers resolve it to N+1.

use crate::error::{Error, Result};
use crate::storage::Storage;

/// Jump-table tag bit in compact reference fields.
pub(crate) const JUMP_FLAG: u32 = 0x8000_0000;

/// In-image marker for a boundless edge end.
pub(crate) const BOUNDLESS: u64 = u64::MAX;

/// Node flag: no children.
pub(crate) const FLAG_LEAF: u32 = 1;

/// Node flag: the root record.
pub(crate) const FLAG_ROOT: u32 = 2;

/// Record width selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Layout {
    Compact,
    Large,
}

impl Layout {
    pub fn node_size(self) -> u64 {
        match self {
            Layout::Compact => 28,
            Layout::Large => 48,
        }
    }

    pub fn entry_size(self) -> u64 {
        match self {
            Layout::Compact => 8,
            Layout::Large => 12,
        }
    }

    fn boundless_raw(self) -> u64 {
        match self {
            Layout::Compact => u64::from(u32::MAX),
            Layout::Large => u64::MAX,
        }
    }
}

/// Layout of the record at `offset` given the large-zone boundary.
pub(crate) fn layout_at(offset: u64, transition: Option<u64>) -> Layout {
    match transition {
        Some(boundary) if offset >= boundary => Layout::Large,
        _ => Layout::Compact,
    }
}

/// Byte size of a child array holding `count` entries.
pub(crate) fn array_size(layout: Layout, count: u64) -> u64 {
    4 + count * layout.entry_size()
}

// ----------------------------------------------------------------------
// References
// ----------------------------------------------------------------------

/// A decoded reference field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ref {
    Null,
    /// Direct target offset.
    Direct(u64),
    /// Index into the jump table (compact zone only).
    Jump(u32),
}

impl Ref {
    pub fn decode_compact(raw: u32) -> Self {
        if raw == 0 {
            Ref::Null
        } else if raw & JUMP_FLAG != 0 {
            Ref::Jump(raw & !JUMP_FLAG)
        } else {
            Ref::Direct(u64::from(raw))
        }
    }

    pub fn decode_large(raw: u64) -> Self {
        if raw == 0 {
            Ref::Null
        } else {
            Ref::Direct(raw)
        }
    }

    pub fn encode_compact(self) -> u32 {
        match self {
            Ref::Null => 0,
            Ref::Direct(offset) => {
                debug_assert!(offset < u64::from(JUMP_FLAG), "direct compact ref too wide");
                offset as u32
            }
            Ref::Jump(index) => {
                debug_assert!(index & JUMP_FLAG == 0, "jump index too wide");
                JUMP_FLAG | index
            }
        }
    }

    pub fn encode_large(self) -> u64 {
        match self {
            Ref::Null => 0,
            Ref::Direct(offset) => offset,
            Ref::Jump(_) => unreachable!("large fields store offsets directly"),
        }
    }
}

fn read_ref<S: Storage>(storage: &S, offset: u64, layout: Layout) -> Result<Ref> {
    match layout {
        Layout::Compact => Ok(Ref::decode_compact(storage.read_u32(offset)?)),
        Layout::Large => Ok(Ref::decode_large(storage.read_u64(offset)?)),
    }
}

fn write_ref<S: Storage>(storage: &mut S, offset: u64, layout: Layout, value: Ref) -> Result<()> {
    match layout {
        Layout::Compact => storage.write_u32(offset, value.encode_compact()),
        Layout::Large => storage.write_u64(offset, value.encode_large()),
    }
}

fn read_wide<S: Storage>(storage: &S, offset: u64, layout: Layout) -> Result<u64> {
    match layout {
        Layout::Compact => Ok(u64::from(storage.read_u32(offset)?)),
        Layout::Large => storage.read_u64(offset),
    }
}

fn write_wide<S: Storage>(storage: &mut S, offset: u64, layout: Layout, value: u64) -> Result<()> {
    match layout {
        Layout::Compact => {
            debug_assert!(value <= u64::from(u32::MAX), "value too wide for compact");
            storage.write_u32(offset, value as u32)
        }
        Layout::Large => storage.write_u64(offset, value),
    }
}

// ----------------------------------------------------------------------
// Node records
// ----------------------------------------------------------------------

/// A decoded node record, width-independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NodeImage {
    pub start: u64,
    /// [`BOUNDLESS`] while the edge runs to the frontier.
    pub end: u64,
    pub depth: u32,
    pub suffix: Ref,
    pub children: Ref,
    pub leaf_count: u64,
    pub flags: u32,
}

impl NodeImage {
    pub fn leaf(start: u64, depth: u32) -> Self {
        Self {
            start,
            end: BOUNDLESS,
            depth,
            suffix: Ref::Null,
            children: Ref::Null,
            leaf_count: 0,
            flags: FLAG_LEAF,
        }
    }

    pub fn root() -> Self {
        Self {
            start: 0,
            end: 0,
            depth: 0,
            suffix: Ref::Null,
            children: Ref::Null,
            leaf_count: 0,
            flags: FLAG_ROOT,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.flags & FLAG_LEAF != 0
    }
}

/// Per-layout byte offsets of the node fields.
struct FieldMap {
    start: u64,
    end: u64,
    depth: u64,
    suffix: u64,
    children: u64,
    leaf_count: u64,
    flags: u64,
}

fn fields(layout: Layout) -> FieldMap {
    match layout {
        Layout::Compact => FieldMap {
            start: 0,
            end: 4,
            depth: 8,
            suffix: 12,
            children: 16,
            leaf_count: 20,
            flags: 24,
        },
        Layout::Large => FieldMap {
            start: 0,
            end: 8,
            depth: 16,
            suffix: 20,
            children: 28,
            leaf_count: 36,
            flags: 44,
        },
    }
}

pub(crate) fn read_node<S: Storage>(storage: &S, offset: u64, layout: Layout) -> Result<NodeImage> {
    let map = fields(layout);
    let end_raw = read_wide(storage, offset + map.end, layout)?;
    Ok(NodeImage {
        start: read_wide(storage, offset + map.start, layout)?,
        end: if end_raw == layout.boundless_raw() {
            BOUNDLESS
        } else {
            end_raw
        },
        depth: storage.read_u32(offset + map.depth)?,
        suffix: read_ref(storage, offset + map.suffix, layout)?,
        children: read_ref(storage, offset + map.children, layout)?,
        leaf_count: read_wide(storage, offset + map.leaf_count, layout)?,
        flags: storage.read_u32(offset + map.flags)?,
    })
}

pub(crate) fn write_node<S: Storage>(
    storage: &mut S,
    offset: u64,
    layout: Layout,
    image: &NodeImage,
) -> Result<()> {
    let map = fields(layout);
    let end_raw = if image.end == BOUNDLESS {
        layout.boundless_raw()
    } else {
        image.end
    };
    write_wide(storage, offset + map.start, layout, image.start)?;
    write_wide(storage, offset + map.end, layout, end_raw)?;
    storage.write_u32(offset + map.depth, image.depth)?;
    write_ref(storage, offset + map.suffix, layout, image.suffix)?;
    write_ref(storage, offset + map.children, layout, image.children)?;
    write_wide(storage, offset + map.leaf_count, layout, image.leaf_count)?;
    storage.write_u32(offset + map.flags, image.flags)
}

pub(crate) fn write_suffix_ref<S: Storage>(
    storage: &mut S,
    offset: u64,
    layout: Layout,
    value: Ref,
) -> Result<()> {
    write_ref(storage, offset + fields(layout).suffix, layout, value)
}

pub(crate) fn write_children_ref<S: Storage>(
    storage: &mut S,
    offset: u64,
    layout: Layout,
    value: Ref,
) -> Result<()> {
    write_ref(storage, offset + fields(layout).children, layout, value)
}

pub(crate) fn write_leaf_count<S: Storage>(
    storage: &mut S,
    offset: u64,
    layout: Layout,
    value: u64,
) -> Result<()> {
    write_wide(storage, offset + fields(layout).leaf_count, layout, value)
}

// ----------------------------------------------------------------------
// Child arrays
// ----------------------------------------------------------------------

pub(crate) fn read_child_count<S: Storage>(storage: &S, array: u64) -> Result<u32> {
    storage.read_u32(array)
}

pub(crate) fn read_child_entry<S: Storage>(
    storage: &S,
    array: u64,
    index: u32,
    layout: Layout,
) -> Result<(u32, Ref)> {
    let entry = array + 4 + u64::from(index) * layout.entry_size();
    let key = storage.read_u32(entry)?;
    let reference = read_ref(storage, entry + 4, layout)?;
    Ok((key, reference))
}

pub(crate) fn write_child_entry<S: Storage>(
    storage: &mut S,
    array: u64,
    index: u32,
    layout: Layout,
    key: u32,
    reference: Ref,
) -> Result<()> {
    let entry = array + 4 + u64::from(index) * layout.entry_size();
    storage.write_u32(entry, key)?;
    write_ref(storage, entry + 4, layout, reference)
}

/// Binary search over a sorted child array.
pub(crate) fn find_child_entry<S: Storage>(
    storage: &S,
    array: u64,
    layout: Layout,
    key: u32,
) -> Result<Option<(u32, Ref)>> {
    let count = read_child_count(storage, array)?;
    let mut low = 0u32;
    let mut high = count;
    while low < high {
        let mid = low + (high - low) / 2;
        let (mid_key, reference) = read_child_entry(storage, array, mid, layout)?;
        match mid_key.cmp(&key) {
            std::cmp::Ordering::Equal => return Ok(Some((mid, reference))),
            std::cmp::Ordering::Less => low = mid + 1,
            std::cmp::Ordering::Greater => high = mid,
        }
    }
    Ok(None)
}

/// All `(key, ref)` entries in stored (ascending key) order.
pub(crate) fn read_child_entries<S: Storage>(
    storage: &S,
    array: u64,
    layout: Layout,
) -> Result<Vec<(u32, Ref)>> {
    let count = read_child_count(storage, array)?;
    if count > 0x1_0001 {
        // Key space is the sentinel plus 2^16 code units.
        return Err(Error::corrupt(format!(
            "child array at {} claims {} entries",
            array, count
        )));
    }
    let mut entries = Vec::with_capacity(count as usize);
    for index in 0..count {
        entries.push(read_child_entry(storage, array, index, layout)?);
    }
    Ok(entries)
}
