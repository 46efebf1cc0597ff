// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Engine error types

use crate::query::ParseError;
use crate::storage::StorageDriverError;
use thiserror::Error;

/// Errors raised by the graph engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// The query text could not be parsed
    #[error("{0}")]
    Syntax(#[from] ParseError),

    /// The query parsed but failed while running
    #[error("{0}")]
    Execution(String),

    /// Invalid transaction lifecycle operation
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Persistence layer failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// The database (or session) was shut down
    #[error("Database is not available: {0}")]
    DatabaseClosed(String),
}

impl From<StorageDriverError> for EngineError {
    fn from(error: StorageDriverError) -> Self {
        EngineError::Storage(error.to_string())
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
