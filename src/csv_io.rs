// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Bulk CSV import/export, built on the public [`IndexManager`] API.
//!
//! These helpers hold no tree invariants of their own; they exist only to feed `insert` from a
//! file and drain `traverse` back out. No header row is expected in either direction.

use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use log::warn;

use crate::error::{IndexError, IndexResult};
use crate::manager::IndexManager;

/// Reads `key,value` pairs from `path` and inserts each into `manager`.
///
/// A row that is not exactly two fields, or whose fields do not parse as `u64`, is skipped and
/// counted as an error rather than aborting the load. A `DuplicateKey` result from `insert` is
/// also counted as an error.
///
/// Returns `(success_count, error_count)`.
pub fn load_csv(manager: &mut IndexManager, path: impl AsRef<Path>) -> IndexResult<(u64, u64)> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| IndexError::Io {
            operation: format!("load_csv {}", path.display()),
            reason: e.to_string(),
        })?;

    let mut success_count = 0u64;
    let mut error_count = 0u64;

    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                warn!("load_csv: unreadable row: {}", e);
                error_count += 1;
                continue;
            }
        };

        if record.len() != 2 {
            warn!("load_csv: expected 2 fields, found {}", record.len());
            error_count += 1;
            continue;
        }

        let parsed = record
            .get(0)
            .and_then(|s| s.trim().parse::<u64>().ok())
            .zip(record.get(1).and_then(|s| s.trim().parse::<u64>().ok()));

        let (key, value) = match parsed {
            Some(pair) => pair,
            None => {
                warn!("load_csv: non-integer row: {:?}", record);
                error_count += 1;
                continue;
            }
        };

        match manager.insert(key, value) {
            Ok(()) => success_count += 1,
            Err(e) => {
                warn!("load_csv: insert(key={}) failed: {}", key, e);
                error_count += 1;
            }
        }
    }

    Ok((success_count, error_count))
}

/// Drains `manager.traverse()` into `path` as one `key,value` line per pair, in ascending key
/// order. Returns the number of pairs written.
pub fn extract_csv(manager: &mut IndexManager, path: impl AsRef<Path>) -> IndexResult<u64> {
    let path = path.as_ref();
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| IndexError::Io {
            operation: format!("extract_csv {}", path.display()),
            reason: e.to_string(),
        })?;

    let pairs = manager.traverse()?;
    let count = pairs.len() as u64;

    for (key, value) in pairs {
        writer
            .write_record([key.to_string(), value.to_string()])
            .map_err(|e| IndexError::Io {
                operation: format!("extract_csv {}", path.display()),
                reason: e.to_string(),
            })?;
    }
    writer.flush().map_err(|e| IndexError::Io {
        operation: format!("extract_csv {}", path.display()),
        reason: e.to_string(),
    })?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_skips_malformed_rows_and_counts_them() {
        let dir = tempdir().unwrap();
        let idx_path = dir.path().join("t.idx");
        let csv_path = dir.path().join("in.csv");
        std::fs::write(&csv_path, "1,100\n2,200\nbad,row,shape\nnotanumber,5\n3,300\n").unwrap();

        let mut mgr = IndexManager::create(&idx_path, false).unwrap();
        let (success, errors) = load_csv(&mut mgr, &csv_path).unwrap();

        assert_eq!(success, 3);
        assert_eq!(errors, 2);
        assert_eq!(mgr.search(2).unwrap(), Some(200));
    }

    #[test]
    fn load_counts_duplicate_key_as_an_error() {
        let dir = tempdir().unwrap();
        let idx_path = dir.path().join("t.idx");
        let csv_path = dir.path().join("in.csv");
        std::fs::write(&csv_path, "1,100\n1,999\n").unwrap();

        let mut mgr = IndexManager::create(&idx_path, false).unwrap();
        let (success, errors) = load_csv(&mut mgr, &csv_path).unwrap();

        assert_eq!(success, 1);
        assert_eq!(errors, 1);
        assert_eq!(mgr.search(1).unwrap(), Some(100));
    }

    #[test]
    fn extract_round_trips_through_load() {
        let dir = tempdir().unwrap();
        let idx_path = dir.path().join("t.idx");
        let out_path = dir.path().join("out.csv");

        let mut mgr = IndexManager::create(&idx_path, false).unwrap();
        for k in [5u64, 1, 3, 2, 4] {
            mgr.insert(k, k * 100).unwrap();
        }

        let count = extract_csv(&mut mgr, &out_path).unwrap();
        assert_eq!(count, 5);

        let contents = std::fs::read_to_string(&out_path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec!["1,100", "2,200", "3,300", "4,400", "5,500"]);
    }
}
