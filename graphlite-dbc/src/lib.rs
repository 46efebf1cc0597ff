// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! GraphLite DBC - relational-style connections over the GraphLite engine
//!
//! Clients that think in connections, statements and row cursors (with
//! commit/rollback boundaries and an autocommit switch) can talk to the
//! embedded graph engine through this crate.
//!
//! # Quick Start
//!
//! ```no_run
//! use graphlite_dbc::{Driver, Error};
//! use std::collections::HashMap;
//!
//! # fn main() -> Result<(), Error> {
//! let driver = Driver::new();
//! let conn = driver
//!     .connect("graphlite:file:./mydb?autocommit=false", &HashMap::new())?
//!     .expect("graphlite URL");
//!
//! let mut stmt = conn.create_statement()?;
//! let created = stmt.execute_update("CREATE (p:Person {name: 'Alice'})")?;
//! assert_eq!(created, 1);
//! conn.commit()?;
//!
//! let cursor = stmt.execute_query("MATCH (p:Person) RETURN p.name AS name")?;
//! while cursor.next()? {
//!     println!("{:?}", cursor.get_string("name")?);
//! }
//! conn.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Driver ──> DatabaseRegistry ──> GraphDatabase (graphlite-engine)
//!   │
//!   ▼
//! Connection ──> TransactionBinder ──> GraphEngine / EngineTransaction
//!   │
//!   ▼
//! Statement ──> ResultWrapper ──> Cursor
//! ```
//!
//! Query output is materialized before a transaction is finalized, so
//! cursors stay readable after commit. Under autocommit every statement is
//! its own transaction.

pub mod backend;
mod binder;
pub mod classify;
pub mod config;
pub mod connection;
pub mod cursor;
pub mod driver;
pub mod embedded;
pub mod error;
mod prober;
pub mod registry;
pub mod session;
pub mod shape;
pub mod statement;
pub mod url;

pub use backend::{EngineTransaction, GraphEngine, QueryOutput, Record, UpdateStatistics};
pub use config::{BackendKind, ConnectionConfig};
pub use connection::Connection;
pub use cursor::{ColumnIndex, Cursor, ResultWrapper};
pub use driver::Driver;
pub use embedded::{EmbeddedEngine, EmbeddedTransaction};
pub use error::{Error, Result};
pub use registry::{DatabaseHandle, DatabaseId, DatabaseRegistry};
pub use session::SessionEngine;
pub use shape::{Concurrency, CursorShape, Holdability, IsolationLevel, ResultSetType};
pub use statement::{Statement, NO_UPDATE_COUNT};
pub use url::{ConnectionUrl, DatabaseTarget};

// Engine value type, re-exported for cursor consumers
pub use graphlite_engine::Value;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
