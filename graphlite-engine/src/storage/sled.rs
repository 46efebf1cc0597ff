// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Sled-backed storage

use super::traits::{RecordScan, RecordWrite, StorageDriver, StorageTree};
use super::types::{StorageDriverError, StorageResult, StorageType};
use std::path::Path;

fn sled_error(e: sled::Error) -> StorageDriverError {
    StorageDriverError::Backend(e.to_string())
}

/// Holds the sled directory lock until dropped
pub struct SledDriver {
    db: sled::Db,
}

pub struct SledTree {
    tree: sled::Tree,
}

impl StorageTree for SledTree {
    fn apply(&self, writes: Vec<RecordWrite>) -> StorageResult<()> {
        let mut batch = sled::Batch::default();
        for (key, record) in writes {
            match record {
                Some(record) => batch.insert(key, record),
                None => batch.remove(key),
            }
        }
        self.tree.apply_batch(batch).map_err(sled_error)
    }

    fn scan(&self) -> StorageResult<RecordScan<'_>> {
        Ok(Box::new(self.tree.iter().map(|entry| {
            entry
                .map(|(key, record)| (key.to_vec(), record.to_vec()))
                .map_err(sled_error)
        })))
    }
}

impl StorageDriver for SledDriver {
    type Tree = Box<dyn StorageTree>;

    fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let db = sled::open(path.as_ref()).map_err(sled_error)?;
        log::debug!("opened sled storage at {}", path.as_ref().display());
        Ok(SledDriver { db })
    }

    fn open_tree(&self, name: &str) -> StorageResult<Self::Tree> {
        let tree = self.db.open_tree(name).map_err(sled_error)?;
        Ok(Box::new(SledTree { tree }))
    }

    fn flush(&self) -> StorageResult<()> {
        self.db.flush().map_err(sled_error).map(|_| ())
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Sled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn keys(tree: &dyn StorageTree) -> Vec<Vec<u8>> {
        tree.scan().unwrap().map(|r| r.unwrap().0).collect()
    }

    #[test]
    fn test_batch_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let driver = SledDriver::open(temp_dir.path()).unwrap();
            let tree = driver.open_tree("nodes").unwrap();
            tree.apply(vec![
                (vec![2], Some(b"b".to_vec())),
                (vec![1], Some(b"a".to_vec())),
            ])
            .unwrap();
            tree.apply(vec![(vec![2], None)]).unwrap();
            driver.flush().unwrap();
        }
        let driver = SledDriver::open(temp_dir.path()).unwrap();
        let tree = driver.open_tree("nodes").unwrap();
        assert_eq!(keys(tree.as_ref()), vec![vec![1]]);
    }
}
