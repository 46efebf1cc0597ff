// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Driver: turns a URL into a connection
//!
//! # Examples
//!
//! ```no_run
//! use graphlite_dbc::Driver;
//! use std::collections::HashMap;
//!
//! # fn main() -> graphlite_dbc::Result<()> {
//! let driver = Driver::new();
//! let conn = driver
//!     .connect("graphlite:mem:example", &HashMap::new())?
//!     .expect("graphlite URL");
//! let mut stmt = conn.create_statement()?;
//! stmt.execute_update("CREATE (n:User {name: 'test'})")?;
//! let cursor = stmt.execute_query("MATCH (n:User) RETURN n.name")?;
//! while cursor.next()? {
//!     println!("{:?}", cursor.get_string("n.name")?);
//! }
//! conn.close()?;
//! # Ok(())
//! # }
//! ```

use crate::config::{BackendKind, ConnectionConfig};
use crate::connection::Connection;
use crate::embedded::EmbeddedEngine;
use crate::error::{Error, Result};
use crate::registry::{DatabaseHandle, DatabaseRegistry};
use crate::session::SessionEngine;
use crate::url::{ConnectionUrl, DatabaseTarget};
use graphlite_engine::GraphDatabase;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Driver {
    registry: Arc<DatabaseRegistry>,
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver {
    /// Driver backed by the process-wide registry
    pub fn new() -> Self {
        Self::with_registry(DatabaseRegistry::global())
    }

    pub fn with_registry(registry: Arc<DatabaseRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<DatabaseRegistry> {
        &self.registry
    }

    pub fn accepts_url(&self, url: &str) -> bool {
        ConnectionUrl::accepts(url)
    }

    /// Connect with the embedded backend; `None` when the URL is not ours
    pub fn connect(
        &self,
        url: &str,
        properties: &HashMap<String, String>,
    ) -> Result<Option<Connection<EmbeddedEngine>>> {
        if !self.accepts_url(url) {
            return Ok(None);
        }
        let (parsed, config) = Self::configure(url, properties)?;
        if config.backend == BackendKind::Session {
            return Err(Error::InvalidUrl(
                "backend=session requires Driver::connect_session".to_string(),
            ));
        }
        let handle = self.open(&parsed.target)?;
        Connection::new(Arc::new(EmbeddedEngine::new(handle)), url, &config).map(Some)
    }

    /// Connect with one engine session per connection
    pub fn connect_session(
        &self,
        url: &str,
        properties: &HashMap<String, String>,
    ) -> Result<Connection<SessionEngine>> {
        let (parsed, config) = Self::configure(url, properties)?;
        let handle = self.open(&parsed.target)?;
        Connection::new(Arc::new(SessionEngine::new(handle)?), url, &config)
    }

    fn configure(
        url: &str,
        properties: &HashMap<String, String>,
    ) -> Result<(ConnectionUrl, ConnectionConfig)> {
        let parsed = ConnectionUrl::parse(url)?;
        let config = ConnectionConfig::from_properties(&parsed.properties, properties)?;
        Ok((parsed, config))
    }

    fn open(&self, target: &DatabaseTarget) -> Result<DatabaseHandle> {
        match target.database_id() {
            Some(id) => self.registry.acquire(id),
            None => Ok(DatabaseHandle::detached(GraphDatabase::open_in_memory()?)),
        }
    }
}
