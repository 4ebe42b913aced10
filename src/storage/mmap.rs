// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Memory-mapped file storage.
//!
//! The file is kept larger than the logical size during construction:
//! capacity grows in doubling steps so the remap cost amortizes away. A
//! grow maps the new region first and only then replaces the old mapping
//! (map-then-publish), so an observer sees either the old mapping or the
//! new one, never a torn one. The single-writer discipline does the rest.
//!
//! `flush` truncates the file back to the logical size, remaps, and syncs:
//! a finalized file on disk is exactly as long as its contents.
//!
//! This is the one module in the crate that needs `unsafe`: the two
//! `memmap2` mapping calls. The safety argument is the usual one for
//! file-backed maps: the file handle is owned here, and this process is
//! the only writer while a mapping is live.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use memmap2::MmapMut;

use crate::error::{Error, Result};
use crate::storage::Storage;

/// Minimum file capacity; smaller trees are not worth remapping over.
const MIN_CAPACITY: u64 = 64 * 1024;

/// File-backed storage with geometric growth.
pub struct MmapStorage {
    file: File,
    path: PathBuf,
    map: MmapMut,
    /// Bytes in use; the mapped capacity is `map.len()`.
    len: u64,
}

impl std::fmt::Debug for MmapStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MmapStorage")
            .field("path", &self.path)
            .field("len", &self.len)
            .field("capacity", &self.map.len())
            .finish()
    }
}

impl MmapStorage {
    /// Create (or truncate) a file and map it empty.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        Self::map_file(file, path, 0)
    }

    /// Open an existing file; the logical size is the file length.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let len = file.metadata()?.len();
        Self::map_file(file, path, len)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn map_file(file: File, path: PathBuf, len: u64) -> Result<Self> {
        // A zero-length mapping is an error; freshly created files start at
        // the minimum capacity, existing files are mapped as they are.
        let capacity = if len == 0 { MIN_CAPACITY } else { len };
        if file.metadata()?.len() < capacity {
            file.set_len(capacity)
                .map_err(|_| Error::StorageFull { requested: capacity })?;
        }
        // SAFETY: we own the file handle and are the only writer while the
        // mapping is live (single-writer discipline, see module docs).
        let map = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self {
            file,
            path,
            map,
            len,
        })
    }

    /// Grow the file to at least `required` and publish a fresh mapping.
    fn grow(&mut self, required: u64) -> Result<()> {
        let mut capacity = (self.map.len() as u64).max(MIN_CAPACITY);
        while capacity < required {
            capacity = capacity.saturating_mul(2);
        }
        self.file
            .set_len(capacity)
            .map_err(|_| Error::StorageFull { requested: capacity })?;
        // SAFETY: as in `map_file`; the old mapping is replaced only after
        // the new one exists.
        let new_map = unsafe { MmapMut::map_mut(&self.file)? };
        self.map = new_map;
        Ok(())
    }

    fn check_range(&self, offset: u64, len: usize) -> Result<(usize, usize)> {
        let end = offset.checked_add(len as u64).ok_or(Error::OutOfRange {
            offset,
            len: len as u64,
            size: self.len,
        })?;
        if end > self.len {
            return Err(Error::OutOfRange {
                offset,
                len: len as u64,
                size: self.len,
            });
        }
        Ok((offset as usize, end as usize))
    }
}

impl Storage for MmapStorage {
    fn size(&self) -> u64 {
        self.len
    }

    fn set_size(&mut self, new_size: u64) -> Result<()> {
        if new_size > self.map.len() as u64 {
            self.grow(new_size)?;
        }
        if new_size > self.len {
            // Fresh file regions read as zero already; explicit zeroing
            // covers shrink-then-regrow over previously written bytes.
            let (start, end) = (self.len as usize, new_size as usize);
            self.map[start..end].fill(0);
        }
        self.len = new_size;
        Ok(())
    }

    fn read_bytes(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let (start, end) = self.check_range(offset, buf.len())?;
        buf.copy_from_slice(&self.map[start..end]);
        Ok(())
    }

    fn write_bytes(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let (start, end) = self.check_range(offset, data.len())?;
        self.map[start..end].copy_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.map.flush()?;
        // An empty store keeps its capacity: a zero-length map is an error,
        // and no offset is readable at size 0 anyway.
        if (self.map.len() as u64) != self.len && self.len > 0 {
            self.file
                .set_len(self.len)
                .map_err(|_| Error::StorageFull { requested: self.len })?;
            // SAFETY: as in `map_file`.
            self.map = unsafe { MmapMut::map_mut(&self.file)? };
        }
        self.file.sync_all()?;
        Ok(())
    }
}
