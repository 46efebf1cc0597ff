// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for GraphLite DBC

use graphlite_engine::EngineError;
use thiserror::Error;

/// Result type alias for connection, statement and cursor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for GraphLite DBC operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Operation attempted on a closed connection, statement or cursor
    #[error("Closed resource: {0}")]
    ClosedResource(String),

    /// Operation not valid in the current state
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// Requested cursor shape, isolation level or holdability is not supported
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// Column index out of range or unknown column label
    #[error("Invalid column: {0}")]
    InvalidColumn(String),

    /// Stored value cannot be converted to the requested type
    #[error("Type conversion error: {0}")]
    Coercion(String),

    /// The engine rejected or failed the query; the message is the engine's
    #[error("{0}")]
    EngineExecution(String),

    /// Malformed connection URL or connection property
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl Error {
    /// Engine message for execution errors, the display text otherwise
    pub fn message(&self) -> String {
        match self {
            Error::ClosedResource(m)
            | Error::IllegalState(m)
            | Error::UnsupportedFeature(m)
            | Error::InvalidColumn(m)
            | Error::Coercion(m)
            | Error::EngineExecution(m)
            | Error::InvalidUrl(m) => m.clone(),
        }
    }
}

impl From<EngineError> for Error {
    fn from(error: EngineError) -> Self {
        Error::EngineExecution(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphlite_engine::query::parse_query;

    #[test]
    fn test_engine_messages_are_verbatim() {
        let parse_error = parse_query("AZERTYUIOP").unwrap_err();
        let error: Error = EngineError::from(parse_error.clone()).into();
        assert_eq!(error.to_string(), parse_error.to_string());
        assert!(error.to_string().starts_with("Invalid input"));
    }

    #[test]
    fn test_message_strips_kind_prefix() {
        let error = Error::IllegalState("The transaction is null".to_string());
        assert_eq!(error.message(), "The transaction is null");
        assert!(error.to_string().contains("Illegal state"));
    }
}
