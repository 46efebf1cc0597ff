// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Connection configuration
//!
//! Built from URL properties merged with caller-supplied properties; the
//! caller's value wins for a key present in both.

use crate::error::{Error, Result};
use crate::shape::Holdability;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Which engine surface a connection talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackendKind {
    /// Explicit transactions on the shared database
    #[default]
    Embedded,
    /// One engine session per connection
    Session,
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "embedded" => Ok(BackendKind::Embedded),
            "session" => Ok(BackendKind::Session),
            _ => Err(Error::InvalidUrl(format!(
                "Invalid backend '{}'. Valid options: embedded, session",
                s
            ))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Embedded => write!(f, "embedded"),
            BackendKind::Session => write!(f, "session"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub auto_commit: bool,
    pub read_only: bool,
    pub holdability: Holdability,
    pub backend: BackendKind,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            auto_commit: true,
            read_only: false,
            holdability: Holdability::CloseAtCommit,
            backend: BackendKind::Embedded,
        }
    }
}

impl ConnectionConfig {
    pub fn from_properties(
        url_properties: &HashMap<String, String>,
        caller_properties: &HashMap<String, String>,
    ) -> Result<Self> {
        let mut merged: HashMap<String, &str> = HashMap::new();
        for (key, value) in url_properties.iter().chain(caller_properties.iter()) {
            merged.insert(key.to_lowercase(), value.as_str());
        }

        let mut config = Self::default();
        for (key, value) in merged {
            match key.as_str() {
                "autocommit" => config.auto_commit = parse_bool(&key, value)?,
                "readonly" => config.read_only = parse_bool(&key, value)?,
                "holdability" => config.holdability = value.parse()?,
                "backend" => config.backend = value.parse()?,
                _ => log::debug!("ignoring unknown connection property '{}'", key),
            }
        }
        Ok(config)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(Error::InvalidUrl(format!(
            "Invalid value '{}' for '{}'. Valid options: true, false",
            value, key
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = ConnectionConfig::from_properties(&HashMap::new(), &HashMap::new()).unwrap();
        assert_eq!(config, ConnectionConfig::default());
        assert!(config.auto_commit);
        assert_eq!(config.backend, BackendKind::Embedded);
    }

    #[test]
    fn test_caller_properties_win() {
        let config = ConnectionConfig::from_properties(
            &props(&[("autocommit", "false"), ("readonly", "true")]),
            &props(&[("autocommit", "true"), ("holdability", "hold"), ("backend", "session")]),
        )
        .unwrap();
        assert!(config.auto_commit);
        assert!(config.read_only);
        assert_eq!(config.holdability, Holdability::HoldOverCommit);
        assert_eq!(config.backend, BackendKind::Session);
    }

    #[test]
    fn test_invalid_and_unknown_properties() {
        assert!(matches!(
            ConnectionConfig::from_properties(&props(&[("autocommit", "maybe")]), &HashMap::new()),
            Err(Error::InvalidUrl(_))
        ));
        assert!(ConnectionConfig::from_properties(&props(&[("backend", "remote")]), &HashMap::new())
            .is_err());
        assert!(ConnectionConfig::from_properties(&props(&[("user", "neo4j")]), &HashMap::new())
            .is_ok());
    }
}
