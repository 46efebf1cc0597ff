// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Statements
//!
//! A statement runs query text inside its connection context and keeps the
//! outcome of the last execution: either a cursor or an update count.

use crate::backend::GraphEngine;
use crate::classify;
use crate::connection::Connection;
use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::shape::{Concurrency, CursorShape, Holdability, ResultSetType};

/// Update count reported while the last outcome is a cursor
pub const NO_UPDATE_COUNT: i64 = -1;

pub struct Statement<E: GraphEngine> {
    connection: Connection<E>,
    shape: CursorShape,
    current_result: Option<Cursor>,
    update_count: i64,
    batch: Vec<String>,
    max_rows: usize,
    closed: bool,
}

impl<E: GraphEngine> Statement<E> {
    pub(crate) fn new(connection: Connection<E>, shape: CursorShape) -> Self {
        Self {
            connection,
            shape,
            current_result: None,
            update_count: NO_UPDATE_COUNT,
            batch: Vec::new(),
            max_rows: 0,
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::ClosedResource("Statement is closed".to_string()));
        }
        self.connection.ensure_open()
    }

    fn close_current_result(&mut self) -> Result<()> {
        if let Some(mut cursor) = self.current_result.take() {
            if !cursor.is_closed() {
                cursor.close()?;
            }
        }
        Ok(())
    }

    /// Run a query that produces rows and return its cursor
    pub fn execute_query(&mut self, query: &str) -> Result<&mut Cursor> {
        self.ensure_open()?;
        let wrapper = self.connection.execute(query, self.max_rows)?;
        self.close_current_result()?;
        self.update_count = NO_UPDATE_COUNT;
        Ok(self
            .current_result
            .insert(Cursor::new(wrapper, self.shape)))
    }

    /// Run an update and return the number of nodes and relationships
    /// created or deleted
    pub fn execute_update(&mut self, query: &str) -> Result<i64> {
        self.ensure_open()?;
        let wrapper = self.connection.execute(query, self.max_rows)?;
        self.close_current_result()?;
        self.update_count = wrapper.statistics.update_count();
        Ok(self.update_count)
    }

    /// Run any query; `true` when the outcome is a cursor
    ///
    /// The outcome is decided from the query text before it runs: queries
    /// containing a `RETURN` clause produce a cursor.
    pub fn execute(&mut self, query: &str) -> Result<bool> {
        if classify::returns_rows(query) {
            self.execute_query(query)?;
            Ok(true)
        } else {
            self.execute_update(query)?;
            Ok(false)
        }
    }

    /// Cursor produced by the last execution, if any
    pub fn get_result_set(&mut self) -> Result<Option<&mut Cursor>> {
        self.ensure_open()?;
        Ok(self.current_result.as_mut())
    }

    pub fn get_update_count(&self) -> Result<i64> {
        self.ensure_open()?;
        Ok(self.update_count)
    }

    /// Single-result statements have nothing more; closes the current cursor
    pub fn get_more_results(&mut self) -> Result<bool> {
        self.ensure_open()?;
        self.close_current_result()?;
        self.update_count = NO_UPDATE_COUNT;
        Ok(false)
    }

    pub fn add_batch(&mut self, query: impl Into<String>) -> Result<()> {
        self.ensure_open()?;
        self.batch.push(query.into());
        Ok(())
    }

    pub fn clear_batch(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.batch.clear();
        Ok(())
    }

    /// Run every batched query as an update; the batch is emptied either way
    pub fn execute_batch(&mut self) -> Result<Vec<i64>> {
        self.ensure_open()?;
        let batch = std::mem::take(&mut self.batch);
        let mut counts = Vec::with_capacity(batch.len());
        for query in &batch {
            counts.push(self.execute_update(query)?);
        }
        Ok(counts)
    }

    /// Limit materialized rows; `0` means unlimited
    pub fn set_max_rows(&mut self, max_rows: usize) -> Result<()> {
        self.ensure_open()?;
        self.max_rows = max_rows;
        Ok(())
    }

    pub fn get_max_rows(&self) -> Result<usize> {
        self.ensure_open()?;
        Ok(self.max_rows)
    }

    /// Close the statement and its open cursor; closing twice is a no-op
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.close_current_result()?;
        self.batch.clear();
        self.closed = true;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn get_connection(&self) -> Result<&Connection<E>> {
        self.ensure_open()?;
        Ok(&self.connection)
    }

    pub fn get_result_set_type(&self) -> Result<ResultSetType> {
        self.ensure_open()?;
        Ok(self.shape.result_set_type)
    }

    pub fn get_result_set_concurrency(&self) -> Result<Concurrency> {
        self.ensure_open()?;
        Ok(self.shape.concurrency)
    }

    pub fn get_result_set_holdability(&self) -> Result<Holdability> {
        self.ensure_open()?;
        Ok(self.shape.holdability)
    }
}

impl<E: GraphEngine> std::fmt::Debug for Statement<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("shape", &self.shape)
            .field("update_count", &self.update_count)
            .field("batch", &self.batch.len())
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionConfig;
    use crate::EmbeddedEngine;
    use graphlite_engine::GraphDatabase;
    use std::sync::Arc;

    fn connection() -> Connection<EmbeddedEngine> {
        let db = GraphDatabase::open_in_memory().unwrap();
        Connection::new(
            Arc::new(EmbeddedEngine::detached(db)),
            "graphlite:mem",
            &ConnectionConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_update_counts() {
        let conn = connection();
        let mut stmt = conn.create_statement().unwrap();
        assert_eq!(stmt.execute_update("CREATE (n:Temp)").unwrap(), 1);
        assert_eq!(stmt.execute_update("CREATE (n:Temp) DELETE n").unwrap(), 2);
        assert_eq!(stmt.execute_update("MATCH (n:Temp) SET n.x = 1").unwrap(), 0);
        assert_eq!(stmt.get_update_count().unwrap(), 0);
        assert!(stmt.get_result_set().unwrap().is_none());
    }

    #[test]
    fn test_execute_classifies() {
        let conn = connection();
        let mut stmt = conn.create_statement().unwrap();
        assert!(!stmt.execute("CREATE (n:User {name: 'a'})").unwrap());
        assert_eq!(stmt.get_update_count().unwrap(), 1);

        assert!(stmt.execute("MATCH (n:User) RETURN n.name").unwrap());
        assert_eq!(stmt.get_update_count().unwrap(), NO_UPDATE_COUNT);
        let cursor = stmt.get_result_set().unwrap().unwrap();
        assert!(cursor.next().unwrap());
        assert_eq!(cursor.get_string("n.name").unwrap(), Some("a".to_string()));
    }

    #[test]
    fn test_failure_keeps_previous_outcome() {
        let conn = connection();
        let mut stmt = conn.create_statement().unwrap();
        stmt.execute_update("CREATE (n:Temp)").unwrap();
        let err = stmt.execute_update("AZERTYUIOP").unwrap_err();
        assert!(matches!(err, Error::EngineExecution(_)));
        assert!(err.to_string().starts_with("Invalid input"));
        assert_eq!(stmt.get_update_count().unwrap(), 1);
    }

    #[test]
    fn test_new_execution_closes_previous_cursor() {
        let conn = connection();
        let mut stmt = conn.create_statement().unwrap();
        stmt.execute_query("RETURN 1").unwrap();
        stmt.execute_query("RETURN 2 AS two").unwrap();
        let cursor = stmt.get_result_set().unwrap().unwrap();
        assert_eq!(cursor.column_labels().unwrap(), ["two".to_string()]);

        assert!(!stmt.get_more_results().unwrap());
        assert!(stmt.get_result_set().unwrap().is_none());
        assert_eq!(stmt.get_update_count().unwrap(), NO_UPDATE_COUNT);
    }

    #[test]
    fn test_batch() {
        let conn = connection();
        let mut stmt = conn.create_statement().unwrap();
        stmt.add_batch("CREATE (:A)").unwrap();
        stmt.add_batch("CREATE (:A)-[:R]->(:B)").unwrap();
        assert_eq!(stmt.execute_batch().unwrap(), vec![1, 3]);
        assert!(stmt.execute_batch().unwrap().is_empty());

        stmt.add_batch("CREATE (:A)").unwrap();
        stmt.add_batch("NOT A QUERY").unwrap();
        assert!(stmt.execute_batch().is_err());
        assert!(stmt.execute_batch().unwrap().is_empty());

        stmt.add_batch("CREATE (:A)").unwrap();
        stmt.clear_batch().unwrap();
        assert!(stmt.execute_batch().unwrap().is_empty());
    }

    #[test]
    fn test_max_rows() {
        let conn = connection();
        let mut stmt = conn.create_statement().unwrap();
        stmt.execute_update("CREATE (:N), (:N), (:N)").unwrap();
        stmt.set_max_rows(2).unwrap();
        assert_eq!(stmt.get_max_rows().unwrap(), 2);
        let cursor = stmt.execute_query("MATCH (n:N) RETURN n").unwrap();
        assert!(cursor.next().unwrap());
        assert!(cursor.next().unwrap());
        assert!(!cursor.next().unwrap());
    }

    #[test]
    fn test_close() {
        let conn = connection();
        let mut stmt = conn.create_statement().unwrap();
        stmt.execute_query("RETURN 1").unwrap();
        stmt.close().unwrap();
        stmt.close().unwrap();
        assert!(stmt.is_closed());
        assert!(matches!(stmt.execute("RETURN 1"), Err(Error::ClosedResource(_))));
        assert!(matches!(stmt.get_connection(), Err(Error::ClosedResource(_))));
    }

    #[test]
    fn test_shapes() {
        let conn = connection();
        let stmt = conn.create_statement_with(1004, 1008, 1).unwrap();
        assert_eq!(stmt.get_result_set_type().unwrap(), ResultSetType::ScrollInsensitive);
        assert_eq!(stmt.get_result_set_concurrency().unwrap(), Concurrency::Updatable);
        assert_eq!(stmt.get_result_set_holdability().unwrap(), Holdability::HoldOverCommit);
        assert!(matches!(
            conn.create_statement_with(42, 1007, 2),
            Err(Error::UnsupportedFeature(_))
        ));

        let stmt = conn.create_statement().unwrap();
        assert_eq!(stmt.get_result_set_type().unwrap(), ResultSetType::ForwardOnly);
        assert_eq!(stmt.get_result_set_holdability().unwrap(), Holdability::CloseAtCommit);
    }
}
