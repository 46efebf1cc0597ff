// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Embedded backend: connections share one database and run explicit
//! engine transactions against it

use crate::backend::{EngineTransaction, GraphEngine, QueryOutput};
use crate::error::Result;
use crate::registry::DatabaseHandle;
use graphlite_engine::{GraphDatabase, Transaction};

#[derive(Debug)]
pub struct EmbeddedEngine {
    handle: DatabaseHandle,
}

impl EmbeddedEngine {
    pub fn new(handle: DatabaseHandle) -> Self {
        Self { handle }
    }

    /// Engine over a database that belongs to no registry
    pub fn detached(db: GraphDatabase) -> Self {
        Self::new(DatabaseHandle::detached(db))
    }

    pub fn database(&self) -> &GraphDatabase {
        &self.handle
    }
}

impl GraphEngine for EmbeddedEngine {
    type Transaction = EmbeddedTransaction;

    fn begin(&self) -> Result<EmbeddedTransaction> {
        Ok(EmbeddedTransaction::new(self.handle.begin_transaction()?))
    }

    fn probe(&self) -> Result<()> {
        Ok(self.handle.probe()?)
    }
}

#[derive(Debug)]
pub struct EmbeddedTransaction {
    inner: Transaction,
}

impl EmbeddedTransaction {
    pub(crate) fn new(inner: Transaction) -> Self {
        Self { inner }
    }
}

impl EngineTransaction for EmbeddedTransaction {
    fn run(&mut self, query: &str) -> Result<QueryOutput> {
        Ok(self.inner.execute(query)?.into())
    }

    fn success(&mut self) {
        self.inner.success();
    }

    fn failure(&mut self) {
        self.inner.failure();
    }

    fn finalize(self) -> Result<()> {
        let status = self.inner.finalize()?;
        log::debug!("embedded transaction finished as {}", status);
        Ok(())
    }
}
