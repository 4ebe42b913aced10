// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! In-memory suffix tree: arena nodes plus the online Ukkonen builder.

mod builder;
mod node;
mod tree;

pub use tree::SuffixTree;
