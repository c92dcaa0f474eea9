// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! The index manager facade: the single entry point library callers and the CLI use.
//!
//! Owns the [`BlockFile`] and [`NodeCache`] for exactly one open index file and keeps the
//! header's `root_block_id` consistent with every successful mutation.

use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::block::BlockFile;
use crate::cache::NodeCache;
use crate::error::{IndexError, IndexResult};
use crate::metrics::{self, MetricsSnapshot};
use crate::tree;

/// Owning handle to one open block-file B-tree index.
#[derive(Debug)]
pub struct IndexManager {
    block_file: BlockFile,
    cache: NodeCache,
    path: PathBuf,
}

impl IndexManager {
    /// Creates a fresh index file at `path`.
    ///
    /// ## Error Conditions
    /// - `Exists`: `path` already exists and `overwrite` is `false`.
    /// - `Io`: the file could not be created.
    pub fn create(path: impl AsRef<Path>, overwrite: bool) -> IndexResult<Self> {
        let path = path.as_ref();
        debug!("create(path={})", path.display());

        let block_file = BlockFile::create(path, overwrite).map_err(|e| {
            warn!("create failed: {}", e);
            e
        })?;

        Ok(Self {
            block_file,
            cache: NodeCache::new(),
            path: path.to_path_buf(),
        })
    }

    /// Opens an existing index file at `path`.
    ///
    /// ## Error Conditions
    /// - `NotFound`, `BadMagic`, `Io`.
    pub fn open(path: impl AsRef<Path>) -> IndexResult<Self> {
        let path = path.as_ref();
        debug!("open(path={})", path.display());

        let block_file = BlockFile::open(path).map_err(|e| {
            warn!("open failed: {}", e);
            e
        })?;

        Ok(Self {
            block_file,
            cache: NodeCache::new(),
            path: path.to_path_buf(),
        })
    }

    /// Path of the currently open file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Inserts `(key, value)`.
    ///
    /// ## Error Conditions
    /// - `DuplicateKey`: `key` is already present; no state is mutated.
    pub fn insert(&mut self, key: u64, value: u64) -> IndexResult<()> {
        debug!("insert(key={})", key);
        let root = self.block_file.root_block_id();

        let new_root = tree::insert(&mut self.block_file, &mut self.cache, root, key, value)
            .map_err(|e| {
                warn!("insert(key={}) failed: {}", key, e);
                e
            })?;

        if new_root != root {
            self.block_file.set_root_block_id(new_root)?;
        }
        Ok(())
    }

    /// Looks up `key`.
    pub fn search(&mut self, key: u64) -> IndexResult<Option<u64>> {
        debug!("search(key={})", key);
        let root = self.block_file.root_block_id();
        tree::search(&mut self.block_file, &mut self.cache, root, key).map_err(|e| {
            warn!("search(key={}) failed: {}", key, e);
            e
        })
    }

    /// Returns every `(key, value)` pair in ascending key order.
    pub fn traverse(&mut self) -> IndexResult<Vec<(u64, u64)>> {
        debug!("traverse()");
        let root = self.block_file.root_block_id();
        tree::traverse(&mut self.block_file, &mut self.cache, root).map_err(|e| {
            warn!("traverse() failed: {}", e);
            e
        })
    }

    /// Flushes pending writes, releases the advisory lock, and drops the node cache.
    pub fn close(self) -> IndexResult<()> {
        debug!("close()");
        self.block_file.sync()
    }

    /// A snapshot of the process-wide operation counters.
    pub fn stats(&self) -> MetricsSnapshot {
        metrics::snapshot()
    }
}

impl Drop for IndexManager {
    fn drop(&mut self) {
        if let Err(e) = self.block_file.sync() {
            warn!("sync on drop failed for {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_open_round_trip_on_empty_tree() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.idx");

        {
            let mgr = IndexManager::create(&path, false).unwrap();
            mgr.close().unwrap();
        }

        let mut mgr = IndexManager::open(&path).unwrap();
        assert_eq!(mgr.traverse().unwrap(), Vec::new());
    }

    #[test]
    fn insert_then_search() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.idx");
        let mut mgr = IndexManager::create(&path, false).unwrap();

        mgr.insert(42, 1000).unwrap();
        assert_eq!(mgr.search(42).unwrap(), Some(1000));
        assert_eq!(mgr.search(41).unwrap(), None);
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.idx");
        let mut mgr = IndexManager::create(&path, false).unwrap();

        mgr.insert(1, 1).unwrap();
        let err = mgr.insert(1, 2).unwrap_err();
        assert!(matches!(err, IndexError::DuplicateKey { key: 1 }));
    }

    #[test]
    fn state_survives_close_and_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.idx");

        {
            let mut mgr = IndexManager::create(&path, false).unwrap();
            for k in 0..50u64 {
                mgr.insert(k, k * 2).unwrap();
            }
            mgr.close().unwrap();
        }

        let mut mgr = IndexManager::open(&path).unwrap();
        let pairs = mgr.traverse().unwrap();
        assert_eq!(pairs.len(), 50);
        assert_eq!(mgr.search(25).unwrap(), Some(50));
    }

    #[test]
    fn create_without_overwrite_on_existing_path_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.idx");
        IndexManager::create(&path, false).unwrap();

        let err = IndexManager::create(&path, false).unwrap_err();
        assert!(matches!(err, IndexError::Exists { .. }));
    }
}
