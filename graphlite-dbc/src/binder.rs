// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction binding for one connection context
//!
//! A context owns at most one engine transaction. In manual-commit mode that
//! slot is always filled while the connection is open: commit and rollback
//! finalize the current transaction and immediately begin the next one. In
//! autocommit mode every statement finalizes its transaction before
//! returning. The autocommit flag is shared by every context of a connection
//! and is read only while the slot is locked.

use crate::backend::{EngineTransaction, GraphEngine};
use crate::cursor::ResultWrapper;
use crate::error::{Error, Result};
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

pub(crate) struct TransactionBinder<E: GraphEngine> {
    engine: Arc<E>,
    slot: Mutex<Option<E::Transaction>>,
    /// Set when the open manual-mode transaction holds changes
    dirty: AtomicBool,
    /// Shared by every context of one connection
    begun: Arc<AtomicU64>,
    auto_commit: Arc<AtomicBool>,
    /// Set once the connection closed this context
    retired: AtomicBool,
}

impl<E: GraphEngine> TransactionBinder<E> {
    /// Create a binder; a manual-commit binder begins its transaction eagerly
    pub(crate) fn new(
        engine: Arc<E>,
        begun: Arc<AtomicU64>,
        auto_commit: Arc<AtomicBool>,
    ) -> Result<Self> {
        let manual = !auto_commit.load(Ordering::SeqCst);
        let binder = Self {
            engine,
            slot: Mutex::new(None),
            dirty: AtomicBool::new(false),
            begun,
            auto_commit,
            retired: AtomicBool::new(false),
        };
        if manual {
            let tx = binder.begin()?;
            *binder.slot.lock() = Some(tx);
        }
        Ok(binder)
    }

    fn begin(&self) -> Result<E::Transaction> {
        let tx = self.engine.begin()?;
        let count = self.begun.fetch_add(1, Ordering::SeqCst) + 1;
        log::debug!("began transaction #{}", count);
        Ok(tx)
    }

    /// Begin the next transaction into an emptied slot
    fn roll(&self, slot: &mut Option<E::Transaction>) -> Result<()> {
        *slot = Some(self.begin()?);
        Ok(())
    }

    pub(crate) fn has_uncommitted_work(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Lock the transaction slot; connection-wide changes hold every slot
    pub(crate) fn lock_slot(&self) -> MutexGuard<'_, Option<E::Transaction>> {
        self.slot.lock()
    }

    fn ensure_active(&self) -> Result<()> {
        if self.retired.load(Ordering::SeqCst) {
            return Err(Error::ClosedResource("Connection is closed".to_string()));
        }
        Ok(())
    }

    /// Apply an autocommit flag change to a locked slot
    ///
    /// The caller filters out no-op changes. Enabling commits pending work,
    /// disabling discards the idle autocommit transaction.
    pub(crate) fn switch_auto_commit(
        &self,
        slot: &mut Option<E::Transaction>,
        enable: bool,
    ) -> Result<()> {
        let finalized = match slot.take() {
            Some(mut tx) if enable => {
                tx.success();
                tx.finalize()
            }
            Some(tx) => tx.finalize(),
            None => Ok(()),
        };
        self.dirty.store(false, Ordering::SeqCst);
        self.roll(slot)?;
        finalized
    }

    pub(crate) fn commit(&self) -> Result<()> {
        self.finish(true)
    }

    pub(crate) fn rollback(&self) -> Result<()> {
        self.finish(false)
    }

    fn finish(&self, commit: bool) -> Result<()> {
        let mut slot = self.slot.lock();
        self.ensure_active()?;
        if self.auto_commit.load(Ordering::SeqCst) {
            return Err(Error::IllegalState(format!(
                "Cannot {} when in autocommit",
                if commit { "commit" } else { "rollback" }
            )));
        }
        let mut tx = slot
            .take()
            .ok_or_else(|| Error::IllegalState("The transaction is null".to_string()))?;
        if commit {
            tx.success();
        } else {
            tx.failure();
        }
        let finalized = tx.finalize();
        self.dirty.store(false, Ordering::SeqCst);
        log::debug!(
            "{} transaction",
            if commit { "committed" } else { "rolled back" }
        );
        self.roll(&mut slot)?;
        finalized
    }

    /// Run one statement inside this context's transaction
    ///
    /// Output is materialized before the transaction can be finalized.
    pub(crate) fn execute(&self, query: &str, max_rows: usize) -> Result<ResultWrapper> {
        let mut slot = self.slot.lock();
        self.ensure_active()?;
        let auto_commit = self.auto_commit.load(Ordering::SeqCst);
        let mut tx = match slot.take() {
            Some(tx) => tx,
            None => self.begin()?,
        };

        log::debug!("executing query: {}", query);
        let outcome = tx
            .run(query)
            .map(|output| ResultWrapper::materialize(output, max_rows));

        if !auto_commit {
            if matches!(&outcome, Ok(wrapper) if wrapper.statistics.contains_updates()) {
                self.dirty.store(true, Ordering::SeqCst);
            }
            *slot = Some(tx);
            return outcome;
        }

        match &outcome {
            Ok(_) => tx.success(),
            Err(_) => tx.failure(),
        }
        let finalized = tx.finalize();
        if let Err(e) = self.roll(&mut slot) {
            log::warn!("could not begin the next transaction: {}", e);
        }
        let wrapper = outcome?;
        finalized?;
        Ok(wrapper)
    }

    /// Release the transaction of a locked slot and refuse further work
    ///
    /// The caller checks for uncommitted work first.
    pub(crate) fn retire(&self, slot: &mut Option<E::Transaction>) {
        self.retired.store(true, Ordering::SeqCst);
        if let Some(tx) = slot.take() {
            if let Err(e) = tx.finalize() {
                log::warn!("failed to release transaction on close: {}", e);
            }
        }
        self.dirty.store(false, Ordering::SeqCst);
    }
}

impl<E: GraphEngine> Drop for TransactionBinder<E> {
    fn drop(&mut self) {
        if self.has_uncommitted_work() {
            log::warn!("connection dropped with uncommitted work; changes are discarded");
        }
    }
}
