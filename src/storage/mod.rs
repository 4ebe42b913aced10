// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Storage providers: append-friendly, random-access byte stores.
//!
//! The persistent tree is written through this seam, so everything it
//! needs is here and nothing more: a size, typed little-endian reads and
//! writes at arbitrary offsets, an append family that advances the size,
//! and a flush. Two implementations ship: a heap buffer for in-process
//! trees and a memory-mapped file for trees that outlive the process.
//!
//! Contracts:
//! - reads and writes require `offset + width <= size`, else `OutOfRange`;
//! - `set_size` growth zero-fills and preserves existing bytes;
//! - `append_*` writes at the current size and returns the offset written.

mod heap;
mod mmap;

pub use heap::HeapStorage;
pub use mmap::MmapStorage;

use crate::error::Result;

/// Random-access byte store with typed accessors.
///
/// All multi-byte values are little-endian, matching the on-disk node
/// codec in `persist::layout`.
pub trait Storage {
    /// Current size in bytes.
    fn size(&self) -> u64;

    /// Grow or truncate to `new_size`. Growth preserves existing bytes and
    /// zero-fills the extension.
    fn set_size(&mut self, new_size: u64) -> Result<()>;

    /// Fill `buf` from `offset`.
    fn read_bytes(&self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Write `data` at `offset`. The full range must already be in bounds.
    fn write_bytes(&mut self, offset: u64, data: &[u8]) -> Result<()>;

    /// Persist to the backing store. No-op for heap storage.
    fn flush(&mut self) -> Result<()>;

    // ------------------------------------------------------------------
    // Typed reads
    // ------------------------------------------------------------------

    fn read_u16(&self, offset: u64) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_bytes(offset, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32(&self, offset: u64) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_bytes(offset, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_i32(&self, offset: u64) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.read_bytes(offset, &mut buf)?;
        Ok(i32::from_le_bytes(buf))
    }

    fn read_u64(&self, offset: u64) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_bytes(offset, &mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    // ------------------------------------------------------------------
    // Typed writes
    // ------------------------------------------------------------------

    fn write_u16(&mut self, offset: u64, value: u16) -> Result<()> {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    fn write_u32(&mut self, offset: u64, value: u32) -> Result<()> {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    fn write_i32(&mut self, offset: u64, value: i32) -> Result<()> {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    fn write_u64(&mut self, offset: u64, value: u64) -> Result<()> {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    // ------------------------------------------------------------------
    // Append family: write at the current size, advance, return offset
    // ------------------------------------------------------------------

    fn append_bytes(&mut self, data: &[u8]) -> Result<u64> {
        let offset = self.size();
        self.set_size(offset + data.len() as u64)?;
        self.write_bytes(offset, data)?;
        Ok(offset)
    }

    fn append_u16(&mut self, value: u16) -> Result<u64> {
        self.append_bytes(&value.to_le_bytes())
    }

    fn append_u32(&mut self, value: u32) -> Result<u64> {
        self.append_bytes(&value.to_le_bytes())
    }

    fn append_u64(&mut self, value: u64) -> Result<u64> {
        self.append_bytes(&value.to_le_bytes())
    }
}
