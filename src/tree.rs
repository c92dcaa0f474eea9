// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! The B-tree engine: search, pre-emptive split-on-descent insertion, and in-order traversal.
//!
//! Operates on top of a [`BlockFile`] and [`NodeCache`]; holds no state of its own beyond the
//! root block id, which the caller (the index manager) owns and persists in the file header.

use log::debug;

use crate::block::BlockFile;
use crate::cache::NodeCache;
use crate::error::{IndexError, IndexResult};
use crate::metrics;
use crate::node::{Node, MINIMUM_DEGREE};

/// Looks up `key`, returning its paired value if present.
///
/// ## Performance
/// O(log n) block reads: one per level of the tree, descending to a single leaf. Internal-node
/// keys are not checked for equality during descent — only the final leaf is — which is correct
/// because every key is reachable through exactly one leaf (I3 + I6).
pub fn search(
    block_file: &mut BlockFile,
    cache: &mut NodeCache,
    root_block_id: u64,
    key: u64,
) -> IndexResult<Option<u64>> {
    metrics::record_search();
    lookup(block_file, cache, root_block_id, key)
}

/// Same descent as [`search`], without touching the `searches` counter. Used internally by
/// `insert`'s duplicate check, which is not itself a caller-facing search.
fn lookup(
    block_file: &mut BlockFile,
    cache: &mut NodeCache,
    root_block_id: u64,
    key: u64,
) -> IndexResult<Option<u64>> {
    if root_block_id == 0 {
        return Ok(None);
    }

    let mut node = cache.read_node(block_file, root_block_id)?;
    loop {
        if node.is_leaf() {
            let found = node
                .keys
                .iter()
                .position(|&k| k == key)
                .map(|i| node.values[i]);
            return Ok(found);
        }

        let i = node.descent_index(key);
        let child_id = node.children[i];
        node = cache.read_node(block_file, child_id)?;
    }
}

/// Inserts `(key, value)`, splitting any full node encountered on the way down.
///
/// Returns the (possibly new) root block id.
///
/// ## Error Conditions
/// - `DuplicateKey`: `key` is already present. No block or header field is written.
pub fn insert(
    block_file: &mut BlockFile,
    cache: &mut NodeCache,
    root_block_id: u64,
    key: u64,
    value: u64,
) -> IndexResult<u64> {
    metrics::record_insert();
    debug!("insert(key={})", key);

    if root_block_id == 0 {
        let new_id = block_file.allocate_block_id();
        let mut root = Node::new_leaf(new_id, 0);
        root.keys.push(key);
        root.values.push(value);
        cache.write_node(block_file, &root)?;
        return Ok(new_id);
    }

    if contains_key(block_file, cache, root_block_id, key)? {
        return Err(IndexError::DuplicateKey { key });
    }

    let root = cache.read_node(block_file, root_block_id)?;
    let root_block_id = if root.is_full() {
        // Two fresh ids are needed here (new root, new sibling) and no write happens between
        // them, so `allocate_block_id` alone would hand out the same id twice. Reserve both
        // explicitly before any write.
        let new_root_id = block_file.allocate_block_id();
        let z_id = new_root_id + 1;

        let mut new_root = Node::new_leaf(new_root_id, 0);
        new_root.children.push(root.block_id);

        let mut old_root = root;
        split_child(block_file, cache, &mut new_root, 0, &mut old_root, z_id)?;

        cache.write_node(block_file, &new_root)?;
        new_root_id
    } else {
        root.block_id
    };

    insert_non_full(block_file, cache, root_block_id, key, value)?;
    Ok(root_block_id)
}

/// Descends from `node_id` (known not full) inserting `(key, value)`, splitting any full child
/// encountered along the way.
fn insert_non_full(
    block_file: &mut BlockFile,
    cache: &mut NodeCache,
    node_id: u64,
    key: u64,
    value: u64,
) -> IndexResult<()> {
    let mut node = cache.read_node(block_file, node_id)?;

    if node.is_leaf() {
        let i = node.descent_index(key);
        node.keys.insert(i, key);
        node.values.insert(i, value);
        cache.write_node(block_file, &node)?;
        return Ok(());
    }

    let mut i = node.descent_index(key);
    let mut child = cache.read_node(block_file, node.children[i])?;

    if child.is_full() {
        let z_id = block_file.allocate_block_id();
        split_child(block_file, cache, &mut node, i, &mut child, z_id)?;
        cache.write_node(block_file, &node)?;
        if key > node.keys[i] {
            i += 1;
        }
    }

    let child_id = node.children[i];
    insert_non_full(block_file, cache, child_id, key, value)
}

/// Splits `y = parent.children[index]` (a full node) into `y` and a new sibling `z`, promoting
/// the median key/value into `parent` at `index`.
///
/// `y` keeps its block id; `z` receives `z_id`, which the caller must have reserved as a fresh,
/// provably-distinct block id (see callers). Writes `y` and `z`; the caller is responsible for
/// writing `parent`.
fn split_child(
    block_file: &mut BlockFile,
    cache: &mut NodeCache,
    parent: &mut Node,
    index: usize,
    y: &mut Node,
    z_id: u64,
) -> IndexResult<()> {
    let t = MINIMUM_DEGREE;
    metrics::record_split();

    let mut z = Node::new_leaf(z_id, parent.block_id);

    z.keys = y.keys.split_off(t);
    z.values = y.values.split_off(t);

    let median_key = y.keys.pop().expect("full node has a median key");
    let median_value = y.values.pop().expect("full node has a median value");

    if !y.children.is_empty() {
        z.children = y.children.split_off(t);
    }

    y.parent_block_id = parent.block_id;

    parent.keys.insert(index, median_key);
    parent.values.insert(index, median_value);
    parent.children.insert(index + 1, z.block_id);

    cache.write_node(block_file, y)?;
    cache.write_node(block_file, &z)?;

    Ok(())
}

fn contains_key(
    block_file: &mut BlockFile,
    cache: &mut NodeCache,
    root_block_id: u64,
    key: u64,
) -> IndexResult<bool> {
    Ok(lookup(block_file, cache, root_block_id, key)?.is_some())
}

/// Yields `(key, value)` pairs in ascending key order via a full in-order traversal.
pub fn traverse(
    block_file: &mut BlockFile,
    cache: &mut NodeCache,
    root_block_id: u64,
) -> IndexResult<Vec<(u64, u64)>> {
    let mut out = Vec::new();
    if root_block_id != 0 {
        traverse_node(block_file, cache, root_block_id, &mut out)?;
    }
    Ok(out)
}

fn traverse_node(
    block_file: &mut BlockFile,
    cache: &mut NodeCache,
    node_id: u64,
    out: &mut Vec<(u64, u64)>,
) -> IndexResult<()> {
    let node = cache.read_node(block_file, node_id)?;

    if node.is_leaf() {
        out.extend(node.keys.iter().copied().zip(node.values.iter().copied()));
        return Ok(());
    }

    for i in 0..node.key_count() {
        traverse_node(block_file, cache, node.children[i], out)?;
        out.push((node.keys[i], node.values[i]));
    }
    traverse_node(block_file, cache, node.children[node.key_count()], out)
}
