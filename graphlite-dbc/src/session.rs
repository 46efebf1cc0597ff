// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Session backend: every connection owns one engine session
//!
//! Transactions are begun from the session, the probe runs through it, and
//! closing the connection closes the session.

use crate::backend::GraphEngine;
use crate::embedded::EmbeddedTransaction;
use crate::error::{Error, Result};
use crate::registry::DatabaseHandle;
use graphlite_engine::{GraphDatabase, Session, Value, PROBE_QUERY};

pub struct SessionEngine {
    session: Session,
    handle: DatabaseHandle,
}

impl SessionEngine {
    pub fn new(handle: DatabaseHandle) -> Result<Self> {
        let session = handle.session()?;
        Ok(Self { session, handle })
    }

    pub fn database(&self) -> &GraphDatabase {
        &self.handle
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

impl GraphEngine for SessionEngine {
    type Transaction = EmbeddedTransaction;

    fn begin(&self) -> Result<EmbeddedTransaction> {
        Ok(EmbeddedTransaction::new(self.session.begin_transaction()?))
    }

    fn probe(&self) -> Result<()> {
        let result = self.session.run(PROBE_QUERY)?;
        match result.rows.first().and_then(|row| row.get_value_at_position(0)) {
            Some(Value::Integer(1)) => Ok(()),
            other => Err(Error::EngineExecution(format!(
                "probe query returned an unexpected value: {:?}",
                other
            ))),
        }
    }

    fn release(&self) {
        self.session.close();
    }
}

impl std::fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEngine")
            .field("session", &self.session.id())
            .field("open", &self.session.is_open())
            .field("db", &*self.handle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::EngineTransaction;

    #[test]
    fn test_release_closes_session() {
        let db = GraphDatabase::open_in_memory().unwrap();
        let engine = SessionEngine::new(DatabaseHandle::detached(db)).unwrap();
        engine.probe().unwrap();

        let mut tx = engine.begin().unwrap();
        tx.run("CREATE (:S)").unwrap();
        tx.success();
        tx.finalize().unwrap();
        assert_eq!(engine.database().node_count(), 1);

        engine.release();
        assert!(!engine.session().is_open());
        assert!(engine.probe().is_err());
        assert!(engine.begin().is_err());
    }
}
