// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Read-committed transactions backed by a mutation log
//!
//! Every statement runs against a private view: the committed graph as of the
//! moment the statement starts, with the transaction's own log replayed on
//! top. Only statements that succeed append to the log. Finalizing replays the
//! log onto the committed graph when the transaction was marked successful.

use super::state::{TransactionId, TransactionStatus};
use crate::database::DatabaseCore;
use crate::error::{EngineError, EngineResult};
use crate::exec::{execute_query, QueryResult};
use crate::graph::Mutation;
use crate::query::parse_query;
use std::sync::Arc;

pub struct Transaction {
    id: TransactionId,
    core: Arc<DatabaseCore>,
    log: Vec<Mutation>,
    status: TransactionStatus,
    marked_success: bool,
    marked_failure: bool,
}

impl Transaction {
    pub(crate) fn new(core: Arc<DatabaseCore>) -> Self {
        let id = TransactionId::next();
        log::debug!("began transaction {}", id);
        Self {
            id,
            core,
            log: Vec::new(),
            status: TransactionStatus::Active,
            marked_success: false,
            marked_failure: false,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Number of changes this transaction would apply on commit
    pub fn pending_changes(&self) -> usize {
        self.log.len()
    }

    /// Run one statement inside the transaction
    pub fn execute(&mut self, query: &str) -> EngineResult<QueryResult> {
        if self.status != TransactionStatus::Active {
            return Err(EngineError::Transaction(format!(
                "Transaction {} is {}",
                self.id, self.status
            )));
        }
        self.core.ensure_open()?;

        let parsed = parse_query(query)?;
        let mut view = self.core.snapshot();
        view.apply_all(&self.log);
        let (result, mutations) = execute_query(&parsed, &mut view, self.core.ids())?;
        log::debug!(
            "{}: statement produced {} row(s) and {} change(s)",
            self.id,
            result.rows.len(),
            mutations.len()
        );
        self.log.extend(mutations);
        Ok(result)
    }

    /// Mark the transaction to be committed on finalize
    pub fn success(&mut self) {
        self.marked_success = true;
    }

    /// Mark the transaction to be rolled back on finalize; overrides `success`
    pub fn failure(&mut self) {
        self.marked_failure = true;
    }

    /// Commit if marked successful and not failed, otherwise discard
    pub fn finalize(mut self) -> EngineResult<TransactionStatus> {
        if self.marked_success && !self.marked_failure {
            let mutations = std::mem::take(&mut self.log);
            // A failed commit leaves the transaction rolled back
            self.status = TransactionStatus::RolledBack;
            self.core.commit(&mutations)?;
            self.status = TransactionStatus::Committed;
            log::debug!("committed {} ({} change(s))", self.id, mutations.len());
        } else {
            self.discard();
        }
        Ok(self.status)
    }

    /// Mark successful and finalize
    pub fn commit(mut self) -> EngineResult<()> {
        self.success();
        match self.finalize()? {
            TransactionStatus::Committed => Ok(()),
            status => Err(EngineError::Transaction(format!(
                "Transaction could not be committed, it was {}",
                status
            ))),
        }
    }

    /// Mark failed and finalize
    pub fn rollback(mut self) -> EngineResult<()> {
        self.failure();
        self.finalize().map(|_| ())
    }

    fn discard(&mut self) {
        log::debug!("rolled back {} ({} change(s) discarded)", self.id, self.log.len());
        self.log.clear();
        self.status = TransactionStatus::RolledBack;
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.status == TransactionStatus::Active {
            if !self.log.is_empty() {
                log::warn!(
                    "Transaction {} dropped with {} uncommitted change(s); rolling back",
                    self.id,
                    self.log.len()
                );
            }
            self.discard();
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("pending_changes", &self.log.len())
            .finish()
    }
}
