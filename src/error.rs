// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Error types for the block-file B-tree index.
//!
//! Provides structured error handling with detailed context for debugging.

use std::fmt;

/// Standard Result type for all index operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// Error types returned by the block-file B-tree engine and its collaborators.
#[derive(Debug)]
pub enum IndexError {
    /// Underlying file read/write/seek failure.
    Io { operation: String, reason: String },

    /// `open` was called on a path that does not exist.
    NotFound { path: String },

    /// The header's first 8 bytes did not match the expected magic tag.
    BadMagic { found: [u8; 8] },

    /// A decoded block violated a static invariant (`key_count > 19`, a
    /// self-referential child id).
    Corrupt { block_id: u64, reason: String },

    /// A data operation was invoked with no file currently open.
    NoFileOpen,

    /// `insert` was called with a key that is already present.
    DuplicateKey { key: u64 },

    /// User-supplied input was not a valid non-negative integer, or a
    /// configuration file could not be parsed.
    InvalidInput { reason: String },

    /// `create` was invoked on a path that already exists without overwrite
    /// confirmation.
    Exists { path: String },
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { operation, reason } => {
                write!(f, "I/O error during '{}': {}", operation, reason)
            }
            Self::NotFound { path } => {
                write!(f, "File not found: {}", path)
            }
            Self::BadMagic { found } => {
                write!(
                    f,
                    "Invalid file format: expected magic '4337PRJ3', found {:?}",
                    found
                )
            }
            Self::Corrupt { block_id, reason } => {
                write!(f, "Block {} is corrupt: {}", block_id, reason)
            }
            Self::NoFileOpen => {
                write!(f, "No index file is currently open")
            }
            Self::DuplicateKey { key } => {
                write!(f, "Key {} already exists", key)
            }
            Self::InvalidInput { reason } => {
                write!(f, "Invalid input: {}", reason)
            }
            Self::Exists { path } => {
                write!(f, "File already exists: {}", path)
            }
        }
    }
}

impl std::error::Error for IndexError {}

impl From<std::io::Error> for IndexError {
    fn from(err: std::io::Error) -> Self {
        IndexError::Io {
            operation: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}
