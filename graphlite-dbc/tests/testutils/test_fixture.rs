//! Test fixture for connection-level integration tests
//!
//! Every fixture owns a private registry so tests never share databases
//! unless they ask for the global one.

#![allow(dead_code)]

use graphlite_dbc::{Connection, DatabaseRegistry, Driver, EmbeddedEngine};
use std::collections::HashMap;
use std::sync::Arc;

pub struct TestFixture {
    driver: Driver,
    url: String,
    _temp_dir: Option<tempfile::TempDir>,
}

impl TestFixture {
    /// Fixture over a uniquely named in-memory database
    pub fn new() -> Self {
        Self {
            driver: Driver::with_registry(Arc::new(DatabaseRegistry::new())),
            url: format!("graphlite:mem:test_{}", fastrand::u64(..)),
            _temp_dir: None,
        }
    }

    /// Fixture over a sled database in a temporary directory
    pub fn on_disk() -> Result<Self, Box<dyn std::error::Error>> {
        let temp_dir = tempfile::tempdir()?;
        let url = format!("graphlite:file:{}", temp_dir.path().join("db").display());
        Ok(Self {
            driver: Driver::with_registry(Arc::new(DatabaseRegistry::new())),
            url,
            _temp_dir: Some(temp_dir),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    pub fn registry(&self) -> &Arc<DatabaseRegistry> {
        self.driver.registry()
    }

    /// Autocommit connection
    pub fn connect(&self) -> Connection<EmbeddedEngine> {
        self.connect_with(&[])
    }

    /// Connection opened with manual commit
    pub fn connect_manual(&self) -> Connection<EmbeddedEngine> {
        self.connect_with(&[("autocommit", "false")])
    }

    pub fn connect_with(&self, properties: &[(&str, &str)]) -> Connection<EmbeddedEngine> {
        let properties: HashMap<String, String> = properties
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.driver
            .connect(&self.url, &properties)
            .expect("Failed to connect")
            .expect("URL should be accepted")
    }

    /// Number of rows a query returns on `conn`
    pub fn count_rows(conn: &Connection<EmbeddedEngine>, query: &str) -> usize {
        let mut stmt = conn.create_statement().expect("Failed to create statement");
        let cursor = stmt.execute_query(query).expect("Query should succeed");
        let mut rows = 0;
        while cursor.next().expect("next should succeed") {
            rows += 1;
        }
        rows
    }
}
