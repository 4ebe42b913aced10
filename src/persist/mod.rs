// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Persistent suffix tree: node codec, hybrid builder, loader.
//!
//! File layout (see `header` for the exact field offsets):
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ HEADER (72 bytes): magic, version, offsets               │
//! ├──────────────────────────────────────────────────────────┤
//! │ node records and child arrays, append order,             │
//! │ compact (28 B) below the transition offset,              │
//! │ large (48 B) at and above it                             │
//! ├──────────────────────────────────────────────────────────┤
//! │ TEXT region: N code units, u16 LE                        │
//! ├──────────────────────────────────────────────────────────┤
//! │ JUMP TABLE (v5 only): u64 targets for tagged compact refs│
//! └──────────────────────────────────────────────────────────┘
//! ```

mod builder;
mod header;
mod layout;
mod tree;

pub use header::{TreeHeader, HEADER_SIZE, MAGIC, VERSION_COMPACT, VERSION_HYBRID};
pub use tree::PersistentTree;
