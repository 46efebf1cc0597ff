// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Persistent storage backends
//!
//! Trait-based key-value drivers (sled, memory) and the layer that maps
//! committed graph state onto them.
//!
//! ```text
//! GraphPersistence (nodes / relationships records)
//!     ↓
//! StorageDriver (key-value abstraction)
//!     ↓
//! Concrete Implementations (Sled, Memory)
//! ```

pub mod factory;
pub mod records;
pub mod traits;
pub mod types;

pub mod memory;
#[cfg(feature = "sled-backend")]
pub mod sled;

pub use factory::{create_storage_driver, BoxedStorageDriver};
pub use records::GraphPersistence;
pub use traits::{StorageDriver, StorageTree};
pub use types::{StorageDriverError, StorageResult, StorageType};
