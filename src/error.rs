// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Crate-wide error type.
//!
//! Every failure carries the context you need to act on it: the offending
//! offset, the size it collided with, the symbol index that was out of
//! bounds. A bare "invalid input" helps nobody at 2am.
//!
//! Builders fail fast and never leave a partially valid tree observable.
//! Queries never mutate state, so a query error is always safe to retry
//! after fixing the input.

use std::fmt;
use std::io;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for tree construction, storage access, and queries.
#[derive(Debug)]
pub enum Error {
    /// Input violates an API contract: malformed pattern, negative length,
    /// non-positive anchor threshold, malformed stream on import.
    InvalidInput {
        /// What was wrong with the input.
        detail: String,
    },
    /// Storage access past the current size (or a text index past N).
    OutOfRange {
        /// Offset of the attempted access.
        offset: u64,
        /// Width of the attempted access in bytes (or units).
        len: u64,
        /// Current size of the accessed region.
        size: u64,
    },
    /// Underlying storage failure (disk I/O, mapping failure).
    Io(io::Error),
    /// The filesystem refused to grow the backing file.
    StorageFull {
        /// Size the growth attempted to reach.
        requested: u64,
    },
    /// Persistent data that cannot be trusted: magic mismatch, unknown
    /// version, checksum failure, or structural inconsistency.
    Corrupt {
        /// What was detected, with expected-vs-got where meaningful.
        detail: String,
    },
}

impl Error {
    /// Shorthand for an [`Error::InvalidInput`] with a formatted detail.
    pub(crate) fn invalid(detail: impl Into<String>) -> Self {
        Error::InvalidInput {
            detail: detail.into(),
        }
    }

    /// Shorthand for an [`Error::Corrupt`] with a formatted detail.
    pub(crate) fn corrupt(detail: impl Into<String>) -> Self {
        Error::Corrupt {
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidInput { detail } => {
                write!(f, "invalid input: {}", detail)
            }
            Error::OutOfRange { offset, len, size } => {
                write!(
                    f,
                    "access of {} bytes at offset {} exceeds size {}",
                    len, offset, size
                )
            }
            Error::Io(err) => write!(f, "storage i/o error: {}", err),
            Error::StorageFull { requested } => {
                write!(f, "filesystem refused growth to {} bytes", requested)
            }
            Error::Corrupt { detail } => write!(f, "corrupt tree data: {}", detail),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}
