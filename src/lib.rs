// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Persistent generalized suffix trees with online construction.
//!
//! This crate builds suffix trees with Ukkonen's online algorithm and can
//! materialize them either in memory or into a byte-addressable storage
//! region (heap buffer or memory-mapped file), so a tree is constructed
//! once and then loaded and queried without rebuilding.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌───────────────────────┐
//! │ text.rs  │──▶│  memory/      │──▶│ queries.rs/matcher.rs │
//! │ (Text,   │   │  (SuffixTree, │   │ (one query engine,    │
//! │ sentinel)│   │   Ukkonen)    │   │  both trees)          │
//! └──────────┘   └───────────────┘   └───────────────────────┘
//!       │        ┌───────────────┐             ▲
//!       └───────▶│  persist/     │─────────────┘
//!                │  (node codec, │   via navigate.rs
//!  ┌──────────┐  │   hybrid      │
//!  │ storage/ │─▶│   builder,    │   export.rs: canonical
//!  │ heap,mmap│  │   loader)     │   stream + logical hash
//!  └──────────┘  └───────────────┘
//! ```
//!
//! The persistent format uses a hybrid node layout: 28-byte records with
//! 32-bit references while storage stays under a promotion threshold,
//! 48-byte records with 64-bit references past it. Compact-zone fields
//! that must reach into the large zone go through a jump table (bit 31
//! tags the index). Readers decode transparently; the logical tree is
//! identical either way, and the canonical exporter proves it byte for
//! byte.
//!
//! # Usage
//!
//! ```
//! use sylva::{PersistentTree, SuffixTree};
//!
//! let tree = SuffixTree::build("banana");
//! assert_eq!(tree.count_occurrences("an").unwrap(), 2);
//!
//! # let dir = tempfile::tempdir().unwrap();
//! # let path = dir.path().join("banana.sylva");
//! let built = PersistentTree::build_in_file("banana", &path).unwrap();
//! drop(built);
//! let reopened = PersistentTree::open(&path).unwrap();
//! assert!(reopened.contains("nana").unwrap());
//! ```
//!
//! # Concurrency
//!
//! Construction is single-threaded. A finished tree is immutable; every
//! query is a pure function of immutable state, safe for any number of
//! parallel readers without synchronization.

// Module declarations
mod error;
mod export;
mod matcher;
mod memory;
mod navigate;
mod persist;
mod queries;
mod storage;
mod text;

// Re-exports for public API
pub use error::{Error, Result};
pub use export::{
    export, import, logical_hash, EXPORT_FOOTER_MAGIC, EXPORT_MAGIC, EXPORT_VERSION,
};
pub use matcher::{Anchor, CommonSubstring, CommonSubstrings};
pub use memory::SuffixTree;
pub use navigate::Navigator;
pub use persist::{
    PersistentTree, TreeHeader, HEADER_SIZE, MAGIC, VERSION_COMPACT, VERSION_HYBRID,
};
pub use queries::{Suffixes, VisitedNode};
pub use storage::{HeapStorage, MmapStorage, Storage};
pub use text::{edge_key, key_symbol, Symbol, Text, SENTINEL};
