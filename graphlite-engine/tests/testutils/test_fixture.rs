//! Test fixture for engine integration tests
//!
//! Provides isolated database instances using only the public engine API.

#![allow(dead_code)]

use graphlite_engine::{GraphDatabase, QueryResult, Value};
use std::path::PathBuf;

/// Test fixture with an isolated on-disk database
pub struct TestFixture {
    db: GraphDatabase,
    path: PathBuf,
    _temp_dir: tempfile::TempDir,
}

impl TestFixture {
    /// Create a fixture backed by a fresh sled directory
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir
            .path()
            .join(format!("graphlite_test_{}", fastrand::u64(..)));
        let db = GraphDatabase::open(&path)?;
        Ok(Self {
            db,
            path,
            _temp_dir: temp_dir,
        })
    }

    /// Create a fixture with a small social graph
    pub fn with_simple_data() -> Result<Self, Box<dyn std::error::Error>> {
        let fixture = Self::new()?;
        fixture.query(
            "CREATE (a:Person {name: 'Alice', age: 30})-[:KNOWS {since: 2019}]->(b:Person {name: 'Bob', age: 25}), \
             (c:Person {name: 'Carol', age: 35})",
        )?;
        fixture.query(
            "MATCH (b:Person {name: 'Bob'}), (c:Person {name: 'Carol'}) CREATE (b)-[:KNOWS {since: 2021}]->(c)",
        )?;
        Ok(fixture)
    }

    pub fn db(&self) -> &GraphDatabase {
        &self.db
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Run an autocommitted statement
    pub fn query(&self, query: &str) -> Result<QueryResult, Box<dyn std::error::Error>> {
        Ok(self.db.execute(query)?)
    }

    /// Run a query and return the first column of every row
    pub fn column(&self, query: &str) -> Vec<Value> {
        self.query(query)
            .expect("query should succeed")
            .rows
            .into_iter()
            .map(|row| row.positional_values[0].clone())
            .collect()
    }

    /// Shut the database down and open the same directory again
    pub fn reopen(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.db.shutdown()?;
        // sled releases its file lock once the last handle drops
        self.db = GraphDatabase::open_in_memory()?;
        self.db = GraphDatabase::open(&self.path)?;
        Ok(())
    }
}
