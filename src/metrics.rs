// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Process-wide operational counters.
//!
//! A lightweight debugging aid for the CLI and tests, not a production telemetry pipeline:
//! counters only, no percentiles, no decay, no persistence. Reset only by process restart.

use std::sync::{Mutex, OnceLock};

/// A point-in-time snapshot of every counter, suitable for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub inserts: u64,
    pub searches: u64,
    pub splits: u64,
    pub node_reads: u64,
    pub node_writes: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

#[derive(Default)]
struct Counters {
    inserts: u64,
    searches: u64,
    splits: u64,
    node_reads: u64,
    node_writes: u64,
    cache_hits: u64,
    cache_misses: u64,
}

fn collector() -> &'static Mutex<Counters> {
    static COLLECTOR: OnceLock<Mutex<Counters>> = OnceLock::new();
    COLLECTOR.get_or_init(|| Mutex::new(Counters::default()))
}

/// Increments the `inserts` counter.
pub fn record_insert() {
    collector().lock().unwrap().inserts += 1;
}

/// Increments the `searches` counter.
pub fn record_search() {
    collector().lock().unwrap().searches += 1;
}

/// Increments the `splits` counter.
pub fn record_split() {
    collector().lock().unwrap().splits += 1;
}

/// Increments the `node_reads` counter.
pub fn record_node_read() {
    collector().lock().unwrap().node_reads += 1;
}

/// Increments the `node_writes` counter.
pub fn record_node_write() {
    collector().lock().unwrap().node_writes += 1;
}

/// Increments the `cache_hits` counter.
pub fn record_cache_hit() {
    collector().lock().unwrap().cache_hits += 1;
}

/// Increments the `cache_misses` counter.
pub fn record_cache_miss() {
    collector().lock().unwrap().cache_misses += 1;
}

/// Returns a copy of every counter's current value.
pub fn snapshot() -> MetricsSnapshot {
    let c = collector().lock().unwrap();
    MetricsSnapshot {
        inserts: c.inserts,
        searches: c.searches,
        splits: c.splits,
        node_reads: c.node_reads,
        node_writes: c.node_writes,
        cache_hits: c.cache_hits,
        cache_misses: c.cache_misses,
    }
}
