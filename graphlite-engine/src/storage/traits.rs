// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Storage driver traits
//!
//! Graph persistence only needs two things from a backend: apply the
//! record writes of one commit atomically, and scan a tree back at open.

use super::types::{StorageResult, StorageType};
use std::path::Path;

/// Keyed record write; `None` deletes the key
pub type RecordWrite = (Vec<u8>, Option<Vec<u8>>);

/// Records of a tree in key order
pub type RecordScan<'a> = Box<dyn Iterator<Item = StorageResult<(Vec<u8>, Vec<u8>)>> + 'a>;

/// A named, key-ordered collection of records
pub trait StorageTree: Send + Sync {
    /// Apply all writes or none of them
    fn apply(&self, writes: Vec<RecordWrite>) -> StorageResult<()>;

    fn scan(&self) -> StorageResult<RecordScan<'_>>;
}

pub trait StorageDriver: Send + Sync {
    type Tree: StorageTree;

    fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self>
    where
        Self: Sized;

    /// Open a named tree, creating it when missing
    fn open_tree(&self, name: &str) -> StorageResult<Self::Tree>;

    /// Make applied writes durable
    fn flush(&self) -> StorageResult<()>;

    fn storage_type(&self) -> StorageType;

    fn shutdown(&mut self) -> StorageResult<()> {
        self.flush()
    }
}

impl StorageTree for Box<dyn StorageTree> {
    fn apply(&self, writes: Vec<RecordWrite>) -> StorageResult<()> {
        (**self).apply(writes)
    }

    fn scan(&self) -> StorageResult<RecordScan<'_>> {
        (**self).scan()
    }
}
