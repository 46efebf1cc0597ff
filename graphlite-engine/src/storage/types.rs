// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Backend selection and storage errors

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a database keeps its committed graph
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum StorageType {
    /// sled directory on disk
    #[default]
    Sled,
    /// process memory, gone after shutdown
    Memory,
}

impl FromStr for StorageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sled" | "file" => Ok(StorageType::Sled),
            "memory" | "mem" => Ok(StorageType::Memory),
            other => Err(format!("unknown storage backend '{}' (use sled or memory)", other)),
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StorageType::Sled => "sled",
            StorageType::Memory => "memory",
        })
    }
}

#[derive(Debug)]
pub enum StorageDriverError {
    Io(std::io::Error),
    /// A record could not be encoded
    Encoding(String),
    /// A stored record failed its checksum or could not be decoded
    CorruptRecord(String),
    /// Error raised by the backend itself
    Backend(String),
}

impl fmt::Display for StorageDriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageDriverError::Io(e) => write!(f, "storage I/O failed: {}", e),
            StorageDriverError::Encoding(msg) => write!(f, "cannot encode record: {}", msg),
            StorageDriverError::CorruptRecord(msg) => write!(f, "corrupt record: {}", msg),
            StorageDriverError::Backend(msg) => write!(f, "storage backend: {}", msg),
        }
    }
}

impl std::error::Error for StorageDriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let StorageDriverError::Io(e) = self {
            Some(e)
        } else {
            None
        }
    }
}

impl From<std::io::Error> for StorageDriverError {
    fn from(e: std::io::Error) -> Self {
        StorageDriverError::Io(e)
    }
}

impl From<bincode::Error> for StorageDriverError {
    fn from(e: bincode::Error) -> Self {
        StorageDriverError::Encoding(e.to_string())
    }
}

pub type StorageResult<T> = Result<T, StorageDriverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_type_names() {
        assert_eq!(" SLED".parse::<StorageType>().unwrap(), StorageType::Sled);
        assert_eq!("mem".parse::<StorageType>().unwrap(), StorageType::Memory);
        assert!("rocksdb".parse::<StorageType>().is_err());
        for kind in [StorageType::Sled, StorageType::Memory] {
            assert_eq!(kind.to_string().parse::<StorageType>().unwrap(), kind);
        }
    }

    #[test]
    fn test_error_messages() {
        let err = StorageDriverError::CorruptRecord("checksum mismatch".to_string());
        assert_eq!(err.to_string(), "corrupt record: checksum mismatch");
        let io: StorageDriverError = std::io::Error::other("disk gone").into();
        assert!(std::error::Error::source(&io).is_some());
    }
}
