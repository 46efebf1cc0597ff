// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query execution results

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Counters describing what a statement changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryStatistics {
    pub nodes_created: usize,
    pub nodes_deleted: usize,
    pub relationships_created: usize,
    pub relationships_deleted: usize,
    pub properties_set: usize,
    pub labels_added: usize,
    pub labels_removed: usize,
}

impl QueryStatistics {
    /// Whether the statement changed anything at all
    pub fn contains_updates(&self) -> bool {
        self.nodes_created > 0
            || self.nodes_deleted > 0
            || self.relationships_created > 0
            || self.relationships_deleted > 0
            || self.properties_set > 0
            || self.labels_added > 0
            || self.labels_removed > 0
    }
}

/// Query execution result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    /// Column names in projection order (e.g., ["p.name", "p.age"])
    pub variables: Vec<String>,
    pub execution_time_ms: u64,
    pub statistics: QueryStatistics,
}

impl QueryResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Single result row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Values keyed by column name
    pub values: HashMap<String, Value>,
    /// The same values in column order
    pub positional_values: Vec<Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a row from values listed in column order
    pub fn from_positional(values: Vec<Value>, variables: &[String]) -> Self {
        let named = variables
            .iter()
            .cloned()
            .zip(values.iter().cloned())
            .collect();
        Self {
            values: named,
            positional_values: values,
        }
    }

    pub fn get_value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_value_at_position(&self, position: usize) -> Option<&Value> {
        self.positional_values.get(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_contains_updates() {
        let mut stats = QueryStatistics::default();
        assert!(!stats.contains_updates());
        stats.labels_removed = 1;
        assert!(stats.contains_updates());
    }

    #[test]
    fn test_row_from_positional() {
        let columns = vec!["a".to_string(), "b".to_string()];
        let row = Row::from_positional(vec![Value::Integer(1), Value::Null], &columns);
        assert_eq!(row.get_value("a"), Some(&Value::Integer(1)));
        assert_eq!(row.get_value_at_position(1), Some(&Value::Null));
    }
}
