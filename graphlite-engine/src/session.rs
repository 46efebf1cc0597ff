// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Sessions
//!
//! A session is a closable unit of work against one database. Closing a
//! session does not touch the database itself; transactions already begun
//! from the session stay usable until they are finalized.

use crate::database::DatabaseCore;
use crate::error::{EngineError, EngineResult};
use crate::exec::QueryResult;
use crate::txn::Transaction;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

pub struct Session {
    id: Uuid,
    core: Arc<DatabaseCore>,
    open: AtomicBool,
}

impl Session {
    pub(crate) fn new(core: Arc<DatabaseCore>) -> Self {
        let id = Uuid::new_v4();
        log::debug!("opened session {}", id);
        Self {
            id,
            core,
            open: AtomicBool::new(true),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn ensure_open(&self) -> EngineResult<()> {
        if !self.is_open() {
            return Err(EngineError::DatabaseClosed(format!(
                "session {} is closed",
                self.id
            )));
        }
        self.core.ensure_open()
    }

    /// Start an explicit transaction in this session
    pub fn begin_transaction(&self) -> EngineResult<Transaction> {
        self.ensure_open()?;
        self.core.begin()
    }

    /// Run a single statement in its own committed transaction
    pub fn run(&self, query: &str) -> EngineResult<QueryResult> {
        self.ensure_open()?;
        self.core.execute(query)
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Close the session; closing twice is a no-op
    pub fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            log::debug!("closed session {}", self.id);
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use crate::{EngineError, GraphDatabase};

    #[test]
    fn test_session_lifecycle() {
        let db = GraphDatabase::open_in_memory().unwrap();
        let session = db.session().unwrap();
        assert!(session.is_open());
        session.run("CREATE (:S)").unwrap();

        let tx = session.begin_transaction().unwrap();
        session.close();
        session.close();
        assert!(!session.is_open());
        assert!(matches!(
            session.run("RETURN 1"),
            Err(EngineError::DatabaseClosed(_))
        ));

        // Transactions outlive their session
        tx.rollback().unwrap();
        assert_eq!(db.node_count(), 1);
    }
}
