// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Database registry
//!
//! Maps a database identifier to the one engine instance serving it.
//! Connections hold a [`DatabaseHandle`] lease. In-memory databases are shut
//! down when their last lease goes away; file-backed databases stay open
//! until [`DatabaseRegistry::shutdown_all`].

use crate::error::Result;
use graphlite_engine::GraphDatabase;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::{Arc, Weak};

static GLOBAL_REGISTRY: Lazy<Arc<DatabaseRegistry>> = Lazy::new(|| Arc::new(DatabaseRegistry::new()));

/// Logical identity of a database
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DatabaseId {
    File(PathBuf),
    Memory(String),
}

impl fmt::Display for DatabaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseId::File(path) => write!(f, "file:{}", path.display()),
            DatabaseId::Memory(name) => write!(f, "mem:{}", name),
        }
    }
}

struct Entry {
    db: GraphDatabase,
    leases: usize,
}

#[derive(Default)]
pub struct DatabaseRegistry {
    entries: Mutex<HashMap<DatabaseId, Entry>>,
}

impl DatabaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry used by [`Driver::new`](crate::Driver::new)
    pub fn global() -> Arc<DatabaseRegistry> {
        Arc::clone(&GLOBAL_REGISTRY)
    }

    /// Lease the database for `id`, opening it on first use
    pub fn acquire(self: &Arc<Self>, id: DatabaseId) -> Result<DatabaseHandle> {
        let mut entries = self.entries.lock();

        if let Some(entry) = entries.get_mut(&id) {
            if !entry.db.is_shutdown() {
                entry.leases += 1;
                return Ok(DatabaseHandle::leased(entry.db.clone(), id, self));
            }
            log::debug!("reopening database {} after shutdown", id);
            entries.remove(&id);
        }

        let db = match &id {
            DatabaseId::File(path) => GraphDatabase::open(path)?,
            DatabaseId::Memory(_) => GraphDatabase::open_in_memory()?,
        };
        log::debug!("registered database {}", id);
        entries.insert(
            id.clone(),
            Entry {
                db: db.clone(),
                leases: 1,
            },
        );
        Ok(DatabaseHandle::leased(db, id, self))
    }

    fn release(&self, id: &DatabaseId) {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(id) else {
            return;
        };
        entry.leases = entry.leases.saturating_sub(1);
        if entry.leases > 0 || !matches!(id, DatabaseId::Memory(_)) {
            return;
        }
        if let Some(entry) = entries.remove(id) {
            if let Err(e) = entry.db.shutdown() {
                log::warn!("failed to shut down database {}: {}", id, e);
            }
            log::debug!("evicted database {}", id);
        }
    }

    /// Shut down every registered database and forget them all
    ///
    /// Every database is shut down even when one fails; the first failure
    /// is returned.
    pub fn shutdown_all(&self) -> Result<()> {
        let drained: Vec<(DatabaseId, Entry)> = self.entries.lock().drain().collect();
        let mut first_error = None;
        for (id, entry) in drained {
            if let Err(e) = entry.db.shutdown() {
                log::warn!("failed to shut down database {}: {}", id, e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn contains(&self, id: &DatabaseId) -> bool {
        self.entries.lock().contains_key(id)
    }
}

impl fmt::Debug for DatabaseRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseRegistry")
            .field("databases", &self.len())
            .finish()
    }
}

/// A lease on a database; dereferences to the shared [`GraphDatabase`]
pub struct DatabaseHandle {
    db: GraphDatabase,
    lease: Option<(DatabaseId, Weak<DatabaseRegistry>)>,
}

impl DatabaseHandle {
    fn leased(db: GraphDatabase, id: DatabaseId, registry: &Arc<DatabaseRegistry>) -> Self {
        Self {
            db,
            lease: Some((id, Arc::downgrade(registry))),
        }
    }

    /// A handle outside any registry, e.g. for a private in-memory database
    pub fn detached(db: GraphDatabase) -> Self {
        Self { db, lease: None }
    }

    pub fn id(&self) -> Option<&DatabaseId> {
        self.lease.as_ref().map(|(id, _)| id)
    }
}

impl Deref for DatabaseHandle {
    type Target = GraphDatabase;

    fn deref(&self) -> &GraphDatabase {
        &self.db
    }
}

impl Drop for DatabaseHandle {
    fn drop(&mut self) {
        match self.lease.take() {
            Some((id, registry)) => {
                if let Some(registry) = registry.upgrade() {
                    registry.release(&id);
                }
            }
            None => {
                // Private databases end with their only handle
                if self.db.location().is_none() {
                    if let Err(e) = self.db.shutdown() {
                        log::warn!("failed to shut down private database: {}", e);
                    }
                }
            }
        }
    }
}

impl fmt::Debug for DatabaseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseHandle")
            .field("db", &self.db)
            .field("id", &self.id())
            .finish()
    }
}
