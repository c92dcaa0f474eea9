// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! The block file: a single OS file organized as a sequence of fixed-size 512-byte blocks.
//!
//! Block 0 is the header (magic tag, root block id, next free block id); blocks `1..` each hold
//! one encoded node (see [`crate::node`]). All multi-byte integers are big-endian.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use fs2::FileExt;
use log::{info, trace, warn};

use crate::error::{IndexError, IndexResult};

/// Size in bytes of every block, including the header block.
pub const BLOCK_SIZE: usize = 512;

/// 8-byte ASCII tag identifying a valid index file.
pub const MAGIC: [u8; 8] = *b"4337PRJ3";

const OFF_MAGIC: u64 = 0;
const OFF_ROOT_BLOCK_ID: u64 = 8;
const OFF_NEXT_BLOCK_ID: u64 = 16;

/// A single 512-byte block image.
pub type BlockBuf = [u8; BLOCK_SIZE];

/// Owns the underlying file handle and the header fields (`root_block_id`, `next_block_id`).
///
/// Reads and writes operate at block granularity; the header lives in block 0 and is kept in
/// memory, re-synced to disk via [`BlockFile::write_header_field`].
#[derive(Debug)]
pub struct BlockFile {
    file: File,
    root_block_id: u64,
    next_block_id: u64,
}

impl BlockFile {
    /// Creates a new index file at `path`, writing a fresh header.
    ///
    /// ## Input/Output
    /// `overwrite` must be `true` if `path` already exists; callers own the confirmation prompt.
    ///
    /// ## Error Conditions
    /// - `Exists`: `path` exists and `overwrite` is `false`.
    /// - `Io`: the file could not be created, truncated, or written.
    pub fn create(path: &Path, overwrite: bool) -> IndexResult<Self> {
        if path.exists() && !overwrite {
            return Err(IndexError::Exists {
                path: path.display().to_string(),
            });
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| io_err("create", path, e))?;

        if let Err(e) = file.try_lock_exclusive() {
            warn!("could not acquire advisory lock on {}: {}", path.display(), e);
        }

        let root_block_id: u64 = 0;
        let next_block_id: u64 = 1;
        let mut header = [0u8; BLOCK_SIZE];
        header[..8].copy_from_slice(&MAGIC);
        header[8..16].copy_from_slice(&root_block_id.to_be_bytes());
        header[16..24].copy_from_slice(&next_block_id.to_be_bytes());

        file.write_all(&header).map_err(|e| io_err("create", path, e))?;
        file.flush().map_err(|e| io_err("create", path, e))?;

        info!(
            "created index file {} (root_block_id=0, next_block_id=1)",
            path.display()
        );

        Ok(Self {
            file,
            root_block_id,
            next_block_id,
        })
    }

    /// Opens an existing index file at `path`, validating and loading its header.
    ///
    /// ## Error Conditions
    /// - `NotFound`: `path` does not exist.
    /// - `BadMagic`: the first 8 bytes are not `4337PRJ3`.
    /// - `Io`: the file could not be opened or the header could not be fully read.
    pub fn open(path: &Path) -> IndexResult<Self> {
        if !path.exists() {
            return Err(IndexError::NotFound {
                path: path.display().to_string(),
            });
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| io_err("open", path, e))?;

        if let Err(e) = file.try_lock_exclusive() {
            warn!("could not acquire advisory lock on {}: {}", path.display(), e);
        }

        let mut header = [0u8; BLOCK_SIZE];
        file.read_exact(&mut header).map_err(|e| io_err("open", path, e))?;

        if header[..8] != MAGIC {
            let mut found = [0u8; 8];
            found.copy_from_slice(&header[..8]);
            return Err(IndexError::BadMagic { found });
        }

        let root_block_id = read_u64(&header, OFF_ROOT_BLOCK_ID as usize);
        let next_block_id = read_u64(&header, OFF_NEXT_BLOCK_ID as usize);

        info!(
            "opened index file {} (root_block_id={}, next_block_id={})",
            path.display(),
            root_block_id,
            next_block_id
        );

        Ok(Self {
            file,
            root_block_id,
            next_block_id,
        })
    }

    /// Current root block id; `0` means the tree is empty.
    pub fn root_block_id(&self) -> u64 {
        self.root_block_id
    }

    /// Smallest unallocated block id.
    pub fn next_block_id(&self) -> u64 {
        self.next_block_id
    }

    /// Allocates and returns a fresh block id, without writing anything.
    ///
    /// The header is not updated until the caller writes a block at the returned id; see
    /// [`BlockFile::write_block`].
    pub fn allocate_block_id(&self) -> u64 {
        self.next_block_id
    }

    /// Persists a new root block id to the header.
    pub fn set_root_block_id(&mut self, root_block_id: u64) -> IndexResult<()> {
        self.root_block_id = root_block_id;
        self.write_header_field(OFF_ROOT_BLOCK_ID, root_block_id)
    }

    /// Reads the 512-byte image at `block_id`.
    ///
    /// ## Error Conditions
    /// - `Io`: the seek or read failed, including reading past end of file.
    pub fn read_block(&mut self, block_id: u64) -> IndexResult<BlockBuf> {
        trace!("read_block({})", block_id);
        let offset = block_id * BLOCK_SIZE as u64;
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| self.wrap("read_block:seek", e))?;

        let mut buf = [0u8; BLOCK_SIZE];
        self.file
            .read_exact(&mut buf)
            .map_err(|e| self.wrap("read_block:read", e))?;
        Ok(buf)
    }

    /// Writes `data` at `block_id`, advancing and persisting `next_block_id` if `block_id` was
    /// not yet allocated.
    ///
    /// ## Error Conditions
    /// - `Io`: the seek or write failed.
    pub fn write_block(&mut self, block_id: u64, data: &BlockBuf) -> IndexResult<()> {
        trace!("write_block({})", block_id);
        let offset = block_id * BLOCK_SIZE as u64;
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| self.wrap("write_block:seek", e))?;
        self.file
            .write_all(data)
            .map_err(|e| self.wrap("write_block:write", e))?;

        if block_id >= self.next_block_id {
            self.next_block_id = block_id + 1;
            self.write_header_field(OFF_NEXT_BLOCK_ID, self.next_block_id)?;
        }

        Ok(())
    }

    /// Updates an 8-byte big-endian header field at `offset` (must be `8` or `16`) without
    /// rewriting the rest of block 0.
    fn write_header_field(&mut self, offset: u64, value: u64) -> IndexResult<()> {
        debug_assert!(offset == OFF_ROOT_BLOCK_ID || offset == OFF_NEXT_BLOCK_ID);
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| self.wrap("write_header_field:seek", e))?;
        self.file
            .write_all(&value.to_be_bytes())
            .map_err(|e| self.wrap("write_header_field:write", e))?;
        Ok(())
    }

    /// Flushes the OS-level write buffer. Best-effort durability hook; never called implicitly.
    pub fn sync(&self) -> IndexResult<()> {
        self.file.sync_data().map_err(|e| IndexError::Io {
            operation: "sync".to_string(),
            reason: e.to_string(),
        })
    }

    fn wrap(&self, operation: &str, err: std::io::Error) -> IndexError {
        IndexError::Io {
            operation: operation.to_string(),
            reason: err.to_string(),
        }
    }
}

impl Drop for BlockFile {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn io_err(operation: &str, path: &Path, err: std::io::Error) -> IndexError {
    IndexError::Io {
        operation: format!("{} {}", operation, path.display()),
        reason: err.to_string(),
    }
}

fn read_u64(buf: &[u8; BLOCK_SIZE], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[offset..offset + 8]);
    u64::from_be_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_writes_a_well_formed_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.idx");

        let bf = BlockFile::create(&path, false).unwrap();
        assert_eq!(bf.root_block_id(), 0);
        assert_eq!(bf.next_block_id(), 1);
    }

    #[test]
    fn create_refuses_to_overwrite_without_confirmation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.idx");
        BlockFile::create(&path, false).unwrap();

        let err = BlockFile::create(&path, false).unwrap_err();
        assert!(matches!(err, IndexError::Exists { .. }));
    }

    #[test]
    fn open_rejects_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.idx");

        let err = BlockFile::open(&path).unwrap_err();
        assert!(matches!(err, IndexError::NotFound { .. }));
    }

    #[test]
    fn open_rejects_bad_magic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bogus.idx");
        std::fs::write(&path, [0u8; BLOCK_SIZE]).unwrap();

        let err = BlockFile::open(&path).unwrap_err();
        assert!(matches!(err, IndexError::BadMagic { .. }));
    }

    #[test]
    fn write_block_advances_next_block_id() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.idx");
        let mut bf = BlockFile::create(&path, false).unwrap();

        let block = [7u8; BLOCK_SIZE];
        bf.write_block(1, &block).unwrap();
        assert_eq!(bf.next_block_id(), 2);

        let read_back = bf.read_block(1).unwrap();
        assert_eq!(read_back, block);
    }

    #[test]
    fn header_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.idx");
        {
            let mut bf = BlockFile::create(&path, false).unwrap();
            bf.write_block(1, &[1u8; BLOCK_SIZE]).unwrap();
            bf.set_root_block_id(1).unwrap();
        }

        let bf = BlockFile::open(&path).unwrap();
        assert_eq!(bf.root_block_id(), 1);
        assert_eq!(bf.next_block_id(), 2);
    }
}
