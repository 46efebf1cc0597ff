// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! GraphLite Engine
//!
//! An embedded, transactional property-graph database with a Cypher-style
//! query language. Transactions run at READ_COMMITTED isolation on top of a
//! mutation log and commit through a pluggable key-value storage driver
//! (sled on disk, or process memory).
//!
//! # Example
//!
//! ```no_run
//! use graphlite_engine::GraphDatabase;
//!
//! # fn main() -> Result<(), graphlite_engine::EngineError> {
//! let db = GraphDatabase::open("./mydb")?;
//! let mut tx = db.begin_transaction()?;
//! tx.execute("CREATE (p:Person {name: 'Alice'})")?;
//! tx.commit()?;
//!
//! let result = db.execute("MATCH (p:Person) RETURN p.name")?;
//! for row in &result.rows {
//!     println!("{:?}", row.get_value("p.name"));
//! }
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod error;
pub mod exec;
pub mod graph;
pub mod query;
pub mod session;
pub mod storage;
pub mod txn;
pub mod value;

pub use database::{GraphDatabase, PROBE_QUERY};
pub use error::{EngineError, EngineResult};
pub use exec::{QueryResult, QueryStatistics, Row};
pub use graph::{Node, NodeId, Path, Relationship, RelationshipId};
pub use query::ParseError;
pub use session::Session;
pub use storage::StorageType;
pub use txn::{Transaction, TransactionId, TransactionStatus};
pub use value::Value;
