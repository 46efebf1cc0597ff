// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Connections
//!
//! A [`Connection`] is one logical session against one engine. Mode flags
//! (autocommit, read-only, holdability, closed) are shared by every context
//! of the connection; each context created with [`Connection::new_context`]
//! owns its own transaction. Cloning a connection keeps the same context.
//! Switching autocommit and closing act on every live context.

use crate::backend::GraphEngine;
use crate::binder::TransactionBinder;
use crate::config::ConnectionConfig;
use crate::cursor::ResultWrapper;
use crate::error::{Error, Result};
use crate::prober;
use crate::shape::{CursorShape, Holdability, IsolationLevel};
use crate::statement::Statement;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

struct Shared<E: GraphEngine> {
    engine: Arc<E>,
    url: String,
    auto_commit: Arc<AtomicBool>,
    read_only: AtomicBool,
    holdability: Mutex<Holdability>,
    closed: AtomicBool,
    /// Serializes autocommit switches, context creation and close
    mode_lock: Mutex<()>,
    transactions_begun: Arc<AtomicU64>,
    contexts: Mutex<Vec<Weak<TransactionBinder<E>>>>,
}

impl<E: GraphEngine> Shared<E> {
    /// Contexts still held by some handle; dropped ones are forgotten
    fn live_contexts(&self) -> Vec<Arc<TransactionBinder<E>>> {
        let mut contexts = self.contexts.lock();
        contexts.retain(|context| context.strong_count() > 0);
        contexts.iter().filter_map(Weak::upgrade).collect()
    }
}

impl<E: GraphEngine> Drop for Shared<E> {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::SeqCst) {
            log::debug!("connection to {} dropped without close", self.url);
            self.engine.release();
        }
    }
}

/// Connection to a graph engine
pub struct Connection<E: GraphEngine> {
    shared: Arc<Shared<E>>,
    binder: Arc<TransactionBinder<E>>,
}

impl<E: GraphEngine> Clone for Connection<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            binder: Arc::clone(&self.binder),
        }
    }
}

impl<E: GraphEngine> Connection<E> {
    /// Open a connection over `engine`
    ///
    /// A connection configured for manual commit begins its first
    /// transaction right away.
    pub fn new(engine: Arc<E>, url: impl Into<String>, config: &ConnectionConfig) -> Result<Self> {
        let transactions_begun = Arc::new(AtomicU64::new(0));
        let auto_commit = Arc::new(AtomicBool::new(config.auto_commit));
        let binder = Arc::new(TransactionBinder::new(
            Arc::clone(&engine),
            Arc::clone(&transactions_begun),
            Arc::clone(&auto_commit),
        )?);
        let url = url.into();
        log::debug!("opened connection to {}", url);
        Ok(Self {
            shared: Arc::new(Shared {
                engine,
                url,
                auto_commit,
                read_only: AtomicBool::new(config.read_only),
                holdability: Mutex::new(config.holdability),
                closed: AtomicBool::new(false),
                mode_lock: Mutex::new(()),
                transactions_begun,
                contexts: Mutex::new(vec![Arc::downgrade(&binder)]),
            }),
            binder,
        })
    }

    /// A new context sharing this connection's flags with its own transaction
    pub fn new_context(&self) -> Result<Self> {
        let _mode = self.shared.mode_lock.lock();
        self.ensure_open()?;
        let binder = Arc::new(TransactionBinder::new(
            Arc::clone(&self.shared.engine),
            Arc::clone(&self.shared.transactions_begun),
            Arc::clone(&self.shared.auto_commit),
        )?);
        self.shared.contexts.lock().push(Arc::downgrade(&binder));
        Ok(Self {
            shared: Arc::clone(&self.shared),
            binder,
        })
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.shared.engine
    }

    pub fn url(&self) -> &str {
        &self.shared.url
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ClosedResource("Connection is closed".to_string()));
        }
        Ok(())
    }

    /// Run a statement in this context's transaction
    pub(crate) fn execute(&self, query: &str, max_rows: usize) -> Result<ResultWrapper> {
        self.ensure_open()?;
        self.binder.execute(query, max_rows)
    }

    /// Statement with a forward-only, read-only cursor shape
    pub fn create_statement(&self) -> Result<Statement<E>> {
        self.ensure_open()?;
        let shape = CursorShape::new(self.get_holdability()?);
        Ok(Statement::new(self.clone(), shape))
    }

    /// Statement with explicit cursor shape codes
    pub fn create_statement_with(
        &self,
        result_set_type: i32,
        concurrency: i32,
        holdability: i32,
    ) -> Result<Statement<E>> {
        self.ensure_open()?;
        let shape = CursorShape::from_codes(result_set_type, concurrency, holdability)?;
        Ok(Statement::new(self.clone(), shape))
    }

    pub fn get_auto_commit(&self) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.shared.auto_commit.load(Ordering::SeqCst))
    }

    /// Switch autocommit on or off for every context
    ///
    /// Turning it on commits pending work of each context. Turning it off
    /// discards the idle autocommit transactions and begins manual ones. The
    /// first failure is returned after every context has switched.
    pub fn set_auto_commit(&self, enable: bool) -> Result<()> {
        let _mode = self.shared.mode_lock.lock();
        self.ensure_open()?;
        if self.shared.auto_commit.load(Ordering::SeqCst) == enable {
            return Ok(());
        }
        let contexts = self.shared.live_contexts();
        let mut slots: Vec<_> = contexts.iter().map(|binder| binder.lock_slot()).collect();
        self.shared.auto_commit.store(enable, Ordering::SeqCst);

        let mut switched = Ok(());
        for (binder, slot) in contexts.iter().zip(slots.iter_mut()) {
            if let Err(e) = binder.switch_auto_commit(slot, enable) {
                log::warn!("context failed to switch autocommit: {}", e);
                if switched.is_ok() {
                    switched = Err(e);
                }
            }
        }
        log::debug!(
            "autocommit {} for {} context(s)",
            if enable { "enabled" } else { "disabled" },
            contexts.len()
        );
        switched
    }

    pub fn commit(&self) -> Result<()> {
        self.ensure_open()?;
        self.binder.commit()
    }

    pub fn rollback(&self) -> Result<()> {
        self.ensure_open()?;
        self.binder.rollback()
    }

    /// Close the connection; closing twice is a no-op
    ///
    /// Refused while any context has uncommitted manual-mode work.
    pub fn close(&self) -> Result<()> {
        let _mode = self.shared.mode_lock.lock();
        if self.is_closed() {
            return Ok(());
        }
        let contexts = self.shared.live_contexts();
        let mut slots: Vec<_> = contexts.iter().map(|binder| binder.lock_slot()).collect();
        if !self.shared.auto_commit.load(Ordering::SeqCst)
            && contexts.iter().any(|binder| binder.has_uncommitted_work())
        {
            return Err(Error::IllegalState(
                "Connection has uncommitted work; commit or roll back before closing".to_string(),
            ));
        }
        for (binder, slot) in contexts.iter().zip(slots.iter_mut()) {
            binder.retire(slot);
        }
        if !self.shared.closed.swap(true, Ordering::SeqCst) {
            self.shared.engine.release();
            log::debug!("closed connection to {}", self.shared.url);
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Probe the engine within `timeout_secs`; `0` waits without a deadline
    pub fn is_valid(&self, timeout_secs: i64) -> Result<bool> {
        prober::is_valid(&self.shared.engine, self.is_closed(), timeout_secs)
    }

    pub fn get_transaction_isolation(&self) -> Result<IsolationLevel> {
        self.ensure_open()?;
        Ok(IsolationLevel::ReadCommitted)
    }

    /// Only read-committed is supported
    pub fn set_transaction_isolation(&self, level: i32) -> Result<()> {
        self.ensure_open()?;
        match IsolationLevel::try_from(level)? {
            IsolationLevel::ReadCommitted => Ok(()),
            other => Err(Error::UnsupportedFeature(format!(
                "Transaction isolation level {:?} is not supported",
                other
            ))),
        }
    }

    /// Advisory only; writes are not blocked
    pub fn set_read_only(&self, read_only: bool) -> Result<()> {
        self.ensure_open()?;
        self.shared.read_only.store(read_only, Ordering::SeqCst);
        Ok(())
    }

    pub fn is_read_only(&self) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.shared.read_only.load(Ordering::SeqCst))
    }

    pub fn set_holdability(&self, holdability: i32) -> Result<()> {
        self.ensure_open()?;
        *self.shared.holdability.lock() = Holdability::try_from(holdability)?;
        Ok(())
    }

    pub fn get_holdability(&self) -> Result<Holdability> {
        self.ensure_open()?;
        Ok(*self.shared.holdability.lock())
    }

    /// Catalogs do not exist in a graph database; the value is ignored
    pub fn set_catalog(&self, _catalog: &str) -> Result<()> {
        self.ensure_open()
    }

    pub fn get_catalog(&self) -> Result<Option<String>> {
        self.ensure_open()?;
        Ok(None)
    }

    /// Transactions begun by every context of this connection
    pub fn transactions_begun(&self) -> u64 {
        self.shared.transactions_begun.load(Ordering::SeqCst)
    }

    /// Whether this context holds manual-mode changes not yet committed
    ///
    /// Other contexts of the connection are not consulted.
    pub fn has_uncommitted_work(&self) -> bool {
        self.binder.has_uncommitted_work()
    }
}

impl<E: GraphEngine> std::fmt::Debug for Connection<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("url", &self.shared.url)
            .field("auto_commit", &self.shared.auto_commit.load(Ordering::SeqCst))
            .field("closed", &self.is_closed())
            .finish()
    }
}
