// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Process-local storage for in-memory databases

use super::traits::{RecordScan, RecordWrite, StorageDriver, StorageTree};
use super::types::{StorageResult, StorageType};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

type Records = Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>;

#[derive(Default)]
pub struct MemoryStorageDriver {
    trees: RwLock<HashMap<String, Records>>,
}

/// Trees opened under the same name share their records
pub struct MemoryTree {
    records: Records,
}

impl MemoryStorageDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageTree for MemoryTree {
    fn apply(&self, writes: Vec<RecordWrite>) -> StorageResult<()> {
        let mut records = self.records.write();
        for (key, record) in writes {
            match record {
                Some(record) => records.insert(key, record),
                None => records.remove(&key),
            };
        }
        Ok(())
    }

    fn scan(&self) -> StorageResult<RecordScan<'_>> {
        // Snapshot so the lock is not held by the caller's iteration
        let snapshot: Vec<_> = self
            .records
            .read()
            .iter()
            .map(|(k, v)| Ok((k.clone(), v.clone())))
            .collect();
        Ok(Box::new(snapshot.into_iter()))
    }
}

impl StorageDriver for MemoryStorageDriver {
    type Tree = Box<dyn StorageTree>;

    fn open<P: AsRef<Path>>(_path: P) -> StorageResult<Self> {
        Ok(Self::new())
    }

    fn open_tree(&self, name: &str) -> StorageResult<Self::Tree> {
        let records = Arc::clone(self.trees.write().entry(name.to_string()).or_default());
        Ok(Box::new(MemoryTree { records }))
    }

    fn flush(&self) -> StorageResult<()> {
        Ok(())
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Memory
    }

    fn shutdown(&mut self) -> StorageResult<()> {
        self.trees.write().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(tree: &dyn StorageTree) -> Vec<Vec<u8>> {
        tree.scan().unwrap().map(|r| r.unwrap().0).collect()
    }

    #[test]
    fn test_trees_with_same_name_share_records() {
        let driver = MemoryStorageDriver::new();
        let a = driver.open_tree("nodes").unwrap();
        let b = driver.open_tree("nodes").unwrap();
        a.apply(vec![(b"k".to_vec(), Some(b"v".to_vec()))]).unwrap();
        assert_eq!(keys(b.as_ref()), vec![b"k".to_vec()]);
        assert!(keys(driver.open_tree("other").unwrap().as_ref()).is_empty());
    }

    #[test]
    fn test_scan_is_key_ordered_and_deletes_apply() {
        let driver = MemoryStorageDriver::new();
        let tree = driver.open_tree("t").unwrap();
        tree.apply(vec![
            (vec![3], Some(b"c".to_vec())),
            (vec![1], Some(b"a".to_vec())),
            (vec![2], Some(b"b".to_vec())),
        ])
        .unwrap();
        tree.apply(vec![(vec![3], None), (vec![9], None)]).unwrap();
        assert_eq!(keys(tree.as_ref()), vec![vec![1], vec![2]]);
    }

    #[test]
    fn test_shutdown_drops_records() {
        let mut driver = MemoryStorageDriver::new();
        let tree = driver.open_tree("t").unwrap();
        tree.apply(vec![(vec![1], Some(vec![1]))]).unwrap();
        driver.shutdown().unwrap();
        assert!(keys(driver.open_tree("t").unwrap().as_ref()).is_empty());
    }
}
