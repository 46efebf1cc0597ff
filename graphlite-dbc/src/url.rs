// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Connection URLs
//!
//! ```text
//! graphlite:mem                    private in-memory database
//! graphlite:mem:<name>             shared in-memory database
//! graphlite:file:<path>            sled-backed database directory
//! ...?autocommit=false&readonly=true
//! ```

use crate::error::{Error, Result};
use crate::registry::DatabaseId;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

pub const URL_PREFIX: &str = "graphlite:";

/// Database a URL points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    File(PathBuf),
    /// `None` is a private database nobody else can connect to
    Memory(Option<String>),
}

impl DatabaseTarget {
    /// Registry key, if the database can be shared
    pub fn database_id(&self) -> Option<DatabaseId> {
        match self {
            DatabaseTarget::File(path) => Some(DatabaseId::File(path.clone())),
            DatabaseTarget::Memory(Some(name)) => Some(DatabaseId::Memory(name.clone())),
            DatabaseTarget::Memory(None) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionUrl {
    pub target: DatabaseTarget,
    pub properties: HashMap<String, String>,
}

impl ConnectionUrl {
    /// Whether the URL uses the `graphlite:` scheme
    pub fn accepts(url: &str) -> bool {
        url.starts_with(URL_PREFIX)
    }

    pub fn parse(url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix(URL_PREFIX)
            .ok_or_else(|| Error::InvalidUrl(format!("'{}' does not start with {}", url, URL_PREFIX)))?;

        let (location, query) = match rest.split_once('?') {
            Some((location, query)) => (location, Some(query)),
            None => (rest, None),
        };

        let (variant, name) = match location.split_once(':') {
            Some((variant, name)) => (variant, Some(name)),
            None => (location, None),
        };

        let target = match variant.to_lowercase().as_str() {
            "mem" | "memory" => match name {
                None => DatabaseTarget::Memory(None),
                Some("") => {
                    return Err(Error::InvalidUrl(format!(
                        "empty in-memory database name in '{}'",
                        url
                    )))
                }
                Some(name) => DatabaseTarget::Memory(Some(name.to_string())),
            },
            "file" => match name {
                Some(path) if !path.is_empty() => DatabaseTarget::File(PathBuf::from(path)),
                _ => {
                    return Err(Error::InvalidUrl(format!(
                        "a path is required for file databases in '{}'",
                        url
                    )))
                }
            },
            other => {
                return Err(Error::InvalidUrl(format!(
                    "unknown database variant '{}'. Valid options: mem, file",
                    other
                )))
            }
        };

        let properties = match query {
            Some(query) => parse_properties(query)?,
            None => HashMap::new(),
        };

        Ok(Self { target, properties })
    }
}

fn parse_properties(query: &str) -> Result<HashMap<String, String>> {
    let mut properties = HashMap::new();
    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| Error::InvalidUrl(format!("property '{}' has no value", pair)))?;
        if key.is_empty() {
            return Err(Error::InvalidUrl(format!("property '{}' has no name", pair)));
        }
        properties.insert(key.to_lowercase(), value.to_string());
    }
    Ok(properties)
}

impl fmt::Display for ConnectionUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", URL_PREFIX)?;
        match &self.target {
            DatabaseTarget::File(path) => write!(f, "file:{}", path.display())?,
            DatabaseTarget::Memory(Some(name)) => write!(f, "mem:{}", name)?,
            DatabaseTarget::Memory(None) => write!(f, "mem")?,
        }
        let mut keys: Vec<&String> = self.properties.keys().collect();
        keys.sort();
        for (i, key) in keys.into_iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, key, self.properties[key])?;
        }
        Ok(())
    }
}
