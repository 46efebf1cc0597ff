// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Result formatting for CLI output

use super::commands::OutputFormat;
use colored::*;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use graphlite_dbc::{Cursor, GraphEngine, Statement, Value};

/// Rows drained from a cursor, in column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tabular {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Tabular {
    pub fn drain(cursor: &mut Cursor) -> graphlite_dbc::Result<Self> {
        let columns = cursor.column_labels()?.to_vec();
        let mut rows = Vec::new();
        while cursor.next()? {
            let mut row = Vec::with_capacity(columns.len());
            for index in 1..=columns.len() {
                row.push(cursor.get_object(index)?.unwrap_or(Value::Null));
            }
            rows.push(row);
        }
        Ok(Self { columns, rows })
    }
}

/// What one executed statement produced
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Rows(Tabular),
    Updated(i64),
}

impl Outcome {
    /// Execute `query` and capture its outcome
    pub fn run<E: GraphEngine>(
        stmt: &mut Statement<E>,
        query: &str,
    ) -> graphlite_dbc::Result<Self> {
        if stmt.execute(query)? {
            match stmt.get_result_set()? {
                Some(cursor) => Ok(Outcome::Rows(Tabular::drain(cursor)?)),
                None => Ok(Outcome::Rows(Tabular::default())),
            }
        } else {
            Ok(Outcome::Updated(stmt.get_update_count()?))
        }
    }
}

/// Result formatter for different output formats
pub struct ResultFormatter;

impl ResultFormatter {
    pub fn format(outcome: &Outcome, format: OutputFormat) -> String {
        match (outcome, format) {
            (Outcome::Rows(rows), OutputFormat::Table) => Self::format_table(rows),
            (Outcome::Rows(rows), OutputFormat::Json) => Self::format_json(rows),
            (Outcome::Rows(rows), OutputFormat::Csv) => Self::format_csv(rows),
            (Outcome::Updated(count), OutputFormat::Json) => {
                serde_json::json!({ "status": "success", "rows_affected": count }).to_string()
            }
            (Outcome::Updated(count), _) => Self::rows_affected(*count),
        }
    }

    pub fn rows_affected(count: i64) -> String {
        let noun = if count == 1 { "row" } else { "rows" };
        format!("{} {} affected", count, noun)
    }

    fn format_table(result: &Tabular) -> String {
        if result.rows.is_empty() {
            return format!("{}\n", "No results found".yellow());
        }

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(
            result
                .columns
                .iter()
                .map(|col| Cell::new(col).fg(Color::Green))
                .collect::<Vec<_>>(),
        );
        for row in &result.rows {
            table.add_row(row.iter().map(Self::value_to_string).collect::<Vec<_>>());
        }

        format!(
            "{}\n{}\nRows returned: {}\n",
            "Query Results".bold().green(),
            table,
            result.rows.len()
        )
    }

    fn format_json(result: &Tabular) -> String {
        let rows: Vec<serde_json::Value> = result
            .rows
            .iter()
            .map(|row| {
                let map = result
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.iter().map(Self::value_to_json))
                    .collect::<serde_json::Map<_, _>>();
                serde_json::Value::Object(map)
            })
            .collect();
        let json = serde_json::json!({
            "status": "success",
            "columns": result.columns,
            "rows": rows,
        });
        serde_json::to_string_pretty(&json).unwrap_or_else(|_| {
            "{\"status\": \"error\", \"error\": \"Could not serialize results to JSON\"}"
                .to_string()
        })
    }

    fn format_csv(result: &Tabular) -> String {
        let mut output = result
            .columns
            .iter()
            .map(|c| Self::csv_field(c))
            .collect::<Vec<_>>()
            .join(",");
        output.push('\n');
        for row in &result.rows {
            let fields: Vec<String> = row
                .iter()
                .map(|v| match v {
                    Value::Null => String::new(),
                    other => Self::csv_field(&Self::value_to_string(other)),
                })
                .collect();
            output.push_str(&fields.join(","));
            output.push('\n');
        }
        output
    }

    fn csv_field(text: &str) -> String {
        if text.contains([',', '"', '\n']) {
            format!("\"{}\"", text.replace('"', "\"\""))
        } else {
            text.to_string()
        }
    }

    fn value_to_string(value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            other => other.to_string(),
        }
    }

    fn value_to_json(value: &Value) -> serde_json::Value {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::json!(i),
            Value::Float(f) => serde_json::json!(f),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Self::value_to_json).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::value_to_json(v)))
                    .collect(),
            ),
            Value::Node(node) => serde_json::json!({
                "id": node.id,
                "labels": node.labels,
                "properties": node
                    .properties
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::value_to_json(v)))
                    .collect::<serde_json::Map<_, _>>(),
            }),
            Value::Relationship(rel) => serde_json::json!({
                "id": rel.id,
                "type": rel.rel_type,
                "start": rel.start,
                "end": rel.end,
                "properties": rel
                    .properties
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::value_to_json(v)))
                    .collect::<serde_json::Map<_, _>>(),
            }),
            Value::Path(path) => serde_json::Value::String(path.to_string()),
        }
    }
}
