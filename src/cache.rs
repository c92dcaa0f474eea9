// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! In-memory node cache scoped to a single open index file.
//!
//! Write-through: every write is encoded and persisted to the block file before the cache entry
//! is updated, so the cache can never diverge from disk state after a successful call. Reads
//! that miss decode from disk and populate the cache. The cache is advisory — tree correctness
//! never depends on its hit rate, only on the block file underneath it.

use std::collections::HashMap;

use crate::block::BlockFile;
use crate::error::IndexResult;
use crate::metrics;
use crate::node::Node;

/// Maps block id to the most recently read or written node for the open file.
#[derive(Debug, Default)]
pub struct NodeCache {
    entries: HashMap<u64, Node>,
}

impl NodeCache {
    /// An empty cache, as used right after `create`/`open`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the node at `block_id`, reading through to the block file on a miss.
    pub fn read_node(&mut self, block_file: &mut BlockFile, block_id: u64) -> IndexResult<Node> {
        if let Some(node) = self.entries.get(&block_id) {
            metrics::record_cache_hit();
            return Ok(node.clone());
        }

        metrics::record_cache_miss();
        let block = block_file.read_block(block_id)?;
        metrics::record_node_read();
        let node = Node::decode(&block)?;
        self.entries.insert(block_id, node.clone());
        Ok(node)
    }

    /// Encodes and persists `node`, then updates the cache entry.
    pub fn write_node(&mut self, block_file: &mut BlockFile, node: &Node) -> IndexResult<()> {
        let encoded = node.encode();
        block_file.write_block(node.block_id, &encoded)?;
        metrics::record_node_write();
        self.entries.insert(node.block_id, node.clone());
        Ok(())
    }

    /// Drops every cached entry. Called on `create`/`open` to scope the cache to the newly
    /// opened file.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
