// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Engine capability traits
//!
//! The adapter only needs an engine that can begin transactions and answer a
//! probe, and transactions that can run a query and be marked and finalized.
//! [`EmbeddedEngine`](crate::EmbeddedEngine) and
//! [`SessionEngine`](crate::SessionEngine) implement these over the bundled
//! engine; tests plug in their own.

use crate::error::Result;
use graphlite_engine::{QueryResult, QueryStatistics, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One output record, keyed by column label
pub type Record = HashMap<String, Value>;

/// A graph engine a connection can run against
pub trait GraphEngine: Send + Sync + 'static {
    type Transaction: EngineTransaction;

    /// Begin a new transaction
    fn begin(&self) -> Result<Self::Transaction>;

    /// Run the engine's trivial side-effect-free query
    fn probe(&self) -> Result<()>;

    /// Called once when a connection using this engine is closed
    fn release(&self) {}
}

/// A transaction handle owned by a connection context
pub trait EngineTransaction: Send {
    fn run(&mut self, query: &str) -> Result<QueryOutput>;

    /// Mark the transaction to be committed on finalize
    fn success(&mut self);

    /// Mark the transaction to be rolled back on finalize
    fn failure(&mut self);

    /// Commit if marked successful (and not failed), otherwise roll back
    fn finalize(self) -> Result<()>
    where
        Self: Sized;
}

/// Raw output of one query
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub records: Box<dyn Iterator<Item = Record> + Send>,
    pub statistics: UpdateStatistics,
}

impl QueryOutput {
    /// Output of a statement that returns no rows
    pub fn empty(statistics: UpdateStatistics) -> Self {
        Self {
            columns: Vec::new(),
            records: Box::new(std::iter::empty()),
            statistics,
        }
    }
}

impl std::fmt::Debug for QueryOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryOutput")
            .field("columns", &self.columns)
            .field("statistics", &self.statistics)
            .finish_non_exhaustive()
    }
}

impl From<QueryResult> for QueryOutput {
    fn from(result: QueryResult) -> Self {
        Self {
            columns: result.variables,
            records: Box::new(result.rows.into_iter().map(|row| row.values)),
            statistics: result.statistics.into(),
        }
    }
}

/// Mutation counters reported for one statement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStatistics {
    pub nodes_created: usize,
    pub nodes_deleted: usize,
    pub relationships_created: usize,
    pub relationships_deleted: usize,
    pub properties_set: usize,
    pub labels_added: usize,
    pub labels_removed: usize,
}

impl UpdateStatistics {
    /// Row count reported for an update: nodes and relationships created or
    /// deleted. Property and label changes do not count.
    pub fn update_count(&self) -> i64 {
        (self.nodes_created
            + self.nodes_deleted
            + self.relationships_created
            + self.relationships_deleted) as i64
    }

    pub fn contains_updates(&self) -> bool {
        self.update_count() > 0
            || self.properties_set > 0
            || self.labels_added > 0
            || self.labels_removed > 0
    }
}

impl From<QueryStatistics> for UpdateStatistics {
    fn from(stats: QueryStatistics) -> Self {
        Self {
            nodes_created: stats.nodes_created,
            nodes_deleted: stats.nodes_deleted,
            relationships_created: stats.relationships_created,
            relationships_deleted: stats.relationships_deleted,
            properties_set: stats.properties_set,
            labels_added: stats.labels_added,
            labels_removed: stats.labels_removed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_count_ignores_properties() {
        let stats = UpdateStatistics {
            nodes_created: 1,
            nodes_deleted: 1,
            properties_set: 5,
            ..Default::default()
        };
        assert_eq!(stats.update_count(), 2);

        let props_only = UpdateStatistics {
            properties_set: 1,
            ..Default::default()
        };
        assert_eq!(props_only.update_count(), 0);
        assert!(props_only.contains_updates());
    }
}
