// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Backend construction

use super::memory::MemoryStorageDriver;
use super::traits::{StorageDriver, StorageTree};
use super::types::{StorageResult, StorageType};
use std::path::Path;

pub type BoxedStorageDriver = Box<dyn StorageDriver<Tree = Box<dyn StorageTree>>>;

/// Build the backend for `storage_type`; `root` is ignored for memory
pub fn create_storage_driver<P: AsRef<Path>>(
    storage_type: StorageType,
    root: P,
) -> StorageResult<BoxedStorageDriver> {
    let driver: BoxedStorageDriver = match storage_type {
        StorageType::Memory => Box::new(MemoryStorageDriver::new()),
        #[cfg(feature = "sled-backend")]
        StorageType::Sled => Box::new(super::sled::SledDriver::open(root)?),
        #[cfg(not(feature = "sled-backend"))]
        StorageType::Sled => {
            return Err(super::types::StorageDriverError::Backend(format!(
                "cannot open {}: built without the sled-backend feature",
                root.as_ref().display()
            )))
        }
    };
    Ok(driver)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend_ignores_root() {
        let driver = create_storage_driver(StorageType::Memory, "/does/not/exist").unwrap();
        assert_eq!(driver.storage_type(), StorageType::Memory);
    }

    #[cfg(feature = "sled-backend")]
    #[test]
    fn test_sled_backend_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("graph");
        let driver = create_storage_driver(StorageType::Sled, &root).unwrap();
        assert_eq!(driver.storage_type(), StorageType::Sled);
        assert!(root.exists());
    }
}
