// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Database handle and lifecycle
//!
//! A [`GraphDatabase`] owns the committed graph, the id counters and the
//! storage driver. Handles are cheap to clone and all clones share one
//! instance.

use crate::error::{EngineError, EngineResult};
use crate::exec::QueryResult;
use crate::graph::{GraphStore, IdAllocator, Mutation};
use crate::session::Session;
use crate::storage::{create_storage_driver, GraphPersistence, StorageType};
use crate::txn::Transaction;
use crate::value::Value;
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Query used to check that a database answers
pub const PROBE_QUERY: &str = "RETURN 1";

/// Shared state behind every handle, session and transaction of one database
pub(crate) struct DatabaseCore {
    instance_id: Uuid,
    location: Option<PathBuf>,
    graph: RwLock<GraphStore>,
    ids: IdAllocator,
    /// Held for the whole commit so replay and persistence stay in log order
    persistence: Mutex<GraphPersistence>,
    shutdown: AtomicBool,
    transactions_begun: AtomicU64,
}

impl DatabaseCore {
    pub(crate) fn ensure_open(&self) -> EngineResult<()> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(EngineError::DatabaseClosed(format!(
                "database {} has been shut down",
                self.instance_id
            )));
        }
        Ok(())
    }

    /// Copy of the committed graph as of now
    pub(crate) fn snapshot(&self) -> GraphStore {
        self.graph.read().clone()
    }

    pub(crate) fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    pub(crate) fn commit(&self, mutations: &[Mutation]) -> EngineResult<()> {
        self.ensure_open()?;
        if mutations.is_empty() {
            return Ok(());
        }
        let persistence = self.persistence.lock();
        let mut graph = self.graph.write();
        // Readers see the new state only once it is durable
        let mut next = graph.clone();
        next.replay(mutations).map_err(EngineError::Transaction)?;
        persistence.persist(&next, mutations)?;
        *graph = next;
        Ok(())
    }

    pub(crate) fn begin(self: &Arc<Self>) -> EngineResult<Transaction> {
        self.ensure_open()?;
        self.transactions_begun.fetch_add(1, Ordering::SeqCst);
        Ok(Transaction::new(Arc::clone(self)))
    }

    /// Run one statement in its own transaction and commit it
    pub(crate) fn execute(self: &Arc<Self>, query: &str) -> EngineResult<QueryResult> {
        let mut tx = self.begin()?;
        let result = tx.execute(query)?;
        tx.commit()?;
        Ok(result)
    }
}

/// Embedded transactional graph database
///
/// # Examples
///
/// ```no_run
/// use graphlite_engine::GraphDatabase;
///
/// # fn main() -> Result<(), graphlite_engine::EngineError> {
/// let db = GraphDatabase::open_in_memory()?;
/// db.execute("CREATE (n:User {name: 'test'})")?;
///
/// let mut tx = db.begin_transaction()?;
/// let result = tx.execute("MATCH (n:User) RETURN n.name")?;
/// assert_eq!(result.rows.len(), 1);
/// tx.commit()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct GraphDatabase {
    core: Arc<DatabaseCore>,
}

impl GraphDatabase {
    /// Open (or create) a sled-backed database in the directory `path`
    ///
    /// The persisted graph is loaded eagerly and id allocation continues after
    /// the highest stored ids.
    pub fn open<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        Self::open_with(StorageType::Sled, Some(path.as_ref()))
    }

    /// Create a database that lives only as long as its handles
    pub fn open_in_memory() -> EngineResult<Self> {
        Self::open_with(StorageType::Memory, None)
    }

    /// Open a database on an explicit storage backend
    pub fn open_with(storage_type: StorageType, path: Option<&Path>) -> EngineResult<Self> {
        let location = path.map(Path::to_path_buf);
        if storage_type == StorageType::Sled && location.is_none() {
            return Err(EngineError::Storage(
                "a path is required for sled storage".to_string(),
            ));
        }

        let driver = create_storage_driver(
            storage_type,
            location.as_deref().unwrap_or_else(|| Path::new("")),
        )?;
        Self::with_persistence(GraphPersistence::new(driver)?, location)
    }

    /// Open a database over an already constructed persistence layer
    pub(crate) fn with_persistence(
        persistence: GraphPersistence,
        location: Option<PathBuf>,
    ) -> EngineResult<Self> {
        let storage_type = persistence.storage_type();
        let graph = persistence.load()?;
        let ids = IdAllocator::starting_after(&graph);

        let instance_id = Uuid::new_v4();
        match &location {
            Some(path) => log::info!(
                "opened {} database {} at {}",
                storage_type,
                instance_id,
                path.display()
            ),
            None => log::info!("opened {} database {}", storage_type, instance_id),
        }

        Ok(Self {
            core: Arc::new(DatabaseCore {
                instance_id,
                location,
                graph: RwLock::new(graph),
                ids,
                persistence: Mutex::new(persistence),
                shutdown: AtomicBool::new(false),
                transactions_begun: AtomicU64::new(0),
            }),
        })
    }

    /// Unique id of this database instance
    pub fn instance_id(&self) -> Uuid {
        self.core.instance_id
    }

    /// Directory of a file-backed database
    pub fn location(&self) -> Option<&Path> {
        self.core.location.as_deref()
    }

    /// Whether both handles point to the same instance
    pub fn same_instance(&self, other: &GraphDatabase) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }

    /// Start an explicit transaction
    pub fn begin_transaction(&self) -> EngineResult<Transaction> {
        self.core.begin()
    }

    /// Run a single statement in its own committed transaction
    pub fn execute(&self, query: &str) -> EngineResult<QueryResult> {
        self.core.execute(query)
    }

    /// Open a session on this database
    pub fn session(&self) -> EngineResult<Session> {
        self.core.ensure_open()?;
        Ok(Session::new(Arc::clone(&self.core)))
    }

    /// Run the side-effect-free probe query and check its answer
    pub fn probe(&self) -> EngineResult<()> {
        let mut tx = self.core.begin()?;
        let result = tx.execute(PROBE_QUERY)?;
        tx.rollback()?;
        match result.rows.first().and_then(|row| row.get_value_at_position(0)) {
            Some(Value::Integer(1)) => Ok(()),
            other => Err(EngineError::Execution(format!(
                "probe query returned an unexpected value: {:?}",
                other
            ))),
        }
    }

    /// Number of transactions begun since the database was opened
    pub fn transactions_begun(&self) -> u64 {
        self.core.transactions_begun.load(Ordering::SeqCst)
    }

    /// Committed node count
    pub fn node_count(&self) -> usize {
        self.core.graph.read().node_count()
    }

    /// Committed relationship count
    pub fn relationship_count(&self) -> usize {
        self.core.graph.read().relationship_count()
    }

    pub fn is_shutdown(&self) -> bool {
        self.core.shutdown.load(Ordering::SeqCst)
    }

    /// Flush storage and refuse further work. Calling it again is a no-op.
    pub fn shutdown(&self) -> EngineResult<()> {
        if self.core.shutdown.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut persistence = self.core.persistence.lock();
        persistence.shutdown()?;
        log::info!("shut down database {}", self.core.instance_id);
        Ok(())
    }
}

impl std::fmt::Debug for GraphDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphDatabase")
            .field("instance_id", &self.core.instance_id)
            .field("location", &self.core.location)
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_commits() {
        let db = GraphDatabase::open_in_memory().unwrap();
        let result = db.execute("CREATE (n:User {name: 'a'})").unwrap();
        assert_eq!(result.statistics.nodes_created, 1);
        assert_eq!(db.node_count(), 1);
        assert_eq!(db.transactions_begun(), 1);
    }

    #[test]
    fn test_uncommitted_work_is_invisible_to_others() {
        let db = GraphDatabase::open_in_memory().unwrap();
        let mut writer = db.begin_transaction().unwrap();
        writer.execute("CREATE (:Temp)").unwrap();

        let seen = db.execute("MATCH (n:Temp) RETURN n").unwrap();
        assert!(seen.rows.is_empty());

        // The writer sees its own change
        let own = writer.execute("MATCH (n:Temp) RETURN n").unwrap();
        assert_eq!(own.rows.len(), 1);

        writer.commit().unwrap();
        let seen = db.execute("MATCH (n:Temp) RETURN n").unwrap();
        assert_eq!(seen.rows.len(), 1);
    }

    #[test]
    fn test_finalize_without_success_discards() {
        let db = GraphDatabase::open_in_memory().unwrap();
        let mut tx = db.begin_transaction().unwrap();
        tx.execute("CREATE (:Temp)").unwrap();
        assert_eq!(tx.finalize().unwrap(), crate::TransactionStatus::RolledBack);
        assert_eq!(db.node_count(), 0);
    }

    #[test]
    fn test_failure_overrides_success() {
        let db = GraphDatabase::open_in_memory().unwrap();
        let mut tx = db.begin_transaction().unwrap();
        tx.execute("CREATE (:Temp)").unwrap();
        tx.success();
        tx.failure();
        assert_eq!(tx.finalize().unwrap(), crate::TransactionStatus::RolledBack);
        assert_eq!(db.node_count(), 0);
    }

    #[test]
    fn test_failed_statement_is_not_logged() {
        let db = GraphDatabase::open_in_memory().unwrap();
        db.execute("CREATE (:P)-[:R]->(:P)").unwrap();

        let mut tx = db.begin_transaction().unwrap();
        assert!(tx.execute("MATCH (n) DELETE n").is_err());
        assert_eq!(tx.pending_changes(), 0);
        tx.execute("CREATE (:Q)").unwrap();
        tx.commit().unwrap();
        assert_eq!(db.node_count(), 3);
    }

    #[test]
    fn test_dropped_transaction_rolls_back() {
        let db = GraphDatabase::open_in_memory().unwrap();
        {
            let mut tx = db.begin_transaction().unwrap();
            tx.execute("CREATE (:Temp)").unwrap();
        }
        assert_eq!(db.node_count(), 0);
    }

    #[test]
    fn test_probe_and_shutdown() {
        let db = GraphDatabase::open_in_memory().unwrap();
        db.probe().unwrap();

        db.shutdown().unwrap();
        db.shutdown().unwrap();
        assert!(db.is_shutdown());
        assert!(matches!(db.probe(), Err(EngineError::DatabaseClosed(_))));
        assert!(matches!(
            db.execute("RETURN 1"),
            Err(EngineError::DatabaseClosed(_))
        ));
    }

    #[test]
    fn test_clones_share_instance() {
        let db = GraphDatabase::open_in_memory().unwrap();
        let other = GraphDatabase::open_in_memory().unwrap();
        assert!(db.same_instance(&db.clone()));
        assert!(!db.same_instance(&other));
        assert_ne!(db.instance_id(), other.instance_id());
    }

    #[test]
    fn test_delete_conflicting_with_new_relationship_fails() {
        let db = GraphDatabase::open_in_memory().unwrap();
        db.execute("CREATE (:A)").unwrap();

        let mut deleter = db.begin_transaction().unwrap();
        deleter.execute("MATCH (a:A) DELETE a").unwrap();
        db.execute("MATCH (a:A) CREATE (a)-[:R]->(:B)").unwrap();

        assert!(matches!(deleter.commit(), Err(EngineError::Transaction(_))));
        assert_eq!(db.node_count(), 2);
        assert_eq!(db.relationship_count(), 1);
    }

    #[test]
    fn test_relationship_to_deleted_node_fails() {
        let db = GraphDatabase::open_in_memory().unwrap();
        db.execute("CREATE (:A)").unwrap();

        let mut linker = db.begin_transaction().unwrap();
        linker.execute("MATCH (a:A) CREATE (a)-[:R]->(:B)").unwrap();
        db.execute("MATCH (a:A) DELETE a").unwrap();

        assert!(matches!(linker.commit(), Err(EngineError::Transaction(_))));
        assert_eq!(db.node_count(), 0);
        assert_eq!(db.relationship_count(), 0);
    }

    mod failing_storage {
        use super::*;
        use crate::storage::memory::MemoryStorageDriver;
        use crate::storage::traits::{RecordScan, RecordWrite};
        use crate::storage::{StorageDriver, StorageDriverError, StorageResult, StorageTree};

        /// Memory storage whose writes fail while `broken` is set
        pub(super) struct BreakableDriver {
            pub(super) inner: MemoryStorageDriver,
            pub(super) broken: Arc<AtomicBool>,
        }

        struct BreakableTree {
            inner: Box<dyn StorageTree>,
            broken: Arc<AtomicBool>,
        }

        impl StorageTree for BreakableTree {
            fn apply(&self, writes: Vec<RecordWrite>) -> StorageResult<()> {
                if self.broken.load(Ordering::SeqCst) {
                    return Err(StorageDriverError::Backend("disk full".to_string()));
                }
                self.inner.apply(writes)
            }

            fn scan(&self) -> StorageResult<RecordScan<'_>> {
                self.inner.scan()
            }
        }

        impl StorageDriver for BreakableDriver {
            type Tree = Box<dyn StorageTree>;

            fn open<P: AsRef<Path>>(_path: P) -> StorageResult<Self> {
                Ok(Self {
                    inner: MemoryStorageDriver::new(),
                    broken: Arc::new(AtomicBool::new(false)),
                })
            }

            fn open_tree(&self, name: &str) -> StorageResult<Self::Tree> {
                Ok(Box::new(BreakableTree {
                    inner: self.inner.open_tree(name)?,
                    broken: Arc::clone(&self.broken),
                }))
            }

            fn flush(&self) -> StorageResult<()> {
                self.inner.flush()
            }

            fn storage_type(&self) -> StorageType {
                StorageType::Memory
            }
        }
    }

    #[test]
    fn test_persist_failure_leaves_committed_graph_unchanged() {
        let broken = Arc::new(AtomicBool::new(false));
        let driver = failing_storage::BreakableDriver {
            inner: crate::storage::memory::MemoryStorageDriver::new(),
            broken: Arc::clone(&broken),
        };
        let persistence = GraphPersistence::new(Box::new(driver)).unwrap();
        let db = GraphDatabase::with_persistence(persistence, None).unwrap();
        db.execute("CREATE (:Kept)").unwrap();

        broken.store(true, Ordering::SeqCst);
        let mut tx = db.begin_transaction().unwrap();
        tx.execute("CREATE (:Lost)").unwrap();
        assert!(matches!(tx.commit(), Err(EngineError::Storage(_))));

        broken.store(false, Ordering::SeqCst);
        assert_eq!(db.node_count(), 1);
        let lost = db.execute("MATCH (n:Lost) RETURN n").unwrap();
        assert!(lost.rows.is_empty());
    }
}
