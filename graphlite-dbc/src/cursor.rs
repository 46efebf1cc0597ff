// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Materialized results and the forward-only cursor over them
//!
//! Engine output is consumed eagerly into a [`ResultWrapper`] while the
//! producing transaction is still open, so a [`Cursor`] stays readable after
//! that transaction commits or rolls back.

use crate::backend::{QueryOutput, Record, UpdateStatistics};
use crate::error::{Error, Result};
use crate::shape::{Concurrency, CursorShape, Holdability, ResultSetType};
use graphlite_engine::Value;
use std::cell::Cell;

static NULL: Value = Value::Null;

/// Snapshot of one query's output
#[derive(Debug, Clone, Default)]
pub struct ResultWrapper {
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
    pub statistics: UpdateStatistics,
}

impl ResultWrapper {
    /// Drain the engine output; `max_rows == 0` keeps every row
    pub fn materialize(output: QueryOutput, max_rows: usize) -> Self {
        let rows = if max_rows == 0 {
            output.records.collect()
        } else {
            output.records.take(max_rows).collect()
        };
        Self {
            columns: output.columns,
            rows,
            statistics: output.statistics,
        }
    }
}

/// Column addressing: 1-based index or label
pub trait ColumnIndex {
    /// 0-based position of the column
    fn position(&self, columns: &[String]) -> Result<usize>;
}

impl ColumnIndex for usize {
    fn position(&self, columns: &[String]) -> Result<usize> {
        if *self == 0 || *self > columns.len() {
            return Err(Error::InvalidColumn("Column Index not valid".to_string()));
        }
        Ok(*self - 1)
    }
}

impl ColumnIndex for &str {
    fn position(&self, columns: &[String]) -> Result<usize> {
        columns
            .iter()
            .position(|c| c == *self)
            .ok_or_else(|| Error::InvalidColumn("Column Label not valid".to_string()))
    }
}

impl ColumnIndex for String {
    fn position(&self, columns: &[String]) -> Result<usize> {
        self.as_str().position(columns)
    }
}

/// Forward-only cursor over a [`ResultWrapper`]
///
/// # Examples
///
/// ```
/// use graphlite_dbc::{Cursor, CursorShape, ResultWrapper};
/// use graphlite_engine::Value;
/// use std::collections::HashMap;
///
/// let wrapper = ResultWrapper {
///     columns: vec!["n".to_string()],
///     rows: vec![HashMap::from([("n".to_string(), Value::Integer(7))])],
///     statistics: Default::default(),
/// };
/// let mut cursor = Cursor::new(wrapper, CursorShape::default());
/// assert!(cursor.next().unwrap());
/// assert_eq!(cursor.get_int(1).unwrap(), 7);
/// assert!(!cursor.next().unwrap());
/// ```
#[derive(Debug)]
pub struct Cursor {
    wrapper: Option<ResultWrapper>,
    shape: CursorShape,
    /// -1 before the first row; equals the row count past the last one
    position: i64,
    closed: bool,
    was_null: Cell<bool>,
}

impl Cursor {
    pub fn new(wrapper: ResultWrapper, shape: CursorShape) -> Self {
        Self::from_parts(Some(wrapper), shape)
    }

    /// A cursor with no backing result; every call fails
    pub fn uninitialized(shape: CursorShape) -> Self {
        Self::from_parts(None, shape)
    }

    fn from_parts(wrapper: Option<ResultWrapper>, shape: CursorShape) -> Self {
        Self {
            wrapper,
            shape,
            position: -1,
            closed: false,
            was_null: Cell::new(false),
        }
    }

    fn wrapper(&self) -> Result<&ResultWrapper> {
        let wrapper = self
            .wrapper
            .as_ref()
            .ok_or_else(|| Error::IllegalState("ResultCursor not initialized".to_string()))?;
        if self.closed {
            return Err(Error::ClosedResource("Result set is closed".to_string()));
        }
        Ok(wrapper)
    }

    fn on_row(&self, wrapper: &ResultWrapper) -> bool {
        self.position >= 0 && (self.position as usize) < wrapper.rows.len()
    }

    /// Advance to the next row; returns whether a row is now available
    pub fn next(&mut self) -> Result<bool> {
        let len = self.wrapper()?.rows.len() as i64;
        if self.position < len {
            self.position += 1;
        }
        Ok(self.position < len)
    }

    /// Read the raw value of a column on the current row
    fn value<C: ColumnIndex>(&self, column: C) -> Result<&Value> {
        let wrapper = self.wrapper()?;
        let index = column.position(&wrapper.columns)?;
        if !self.on_row(wrapper) {
            return Err(Error::IllegalState(
                "Cursor is not positioned on a row".to_string(),
            ));
        }
        let label = &wrapper.columns[index];
        let value = wrapper.rows[self.position as usize]
            .get(label)
            .unwrap_or(&NULL);
        self.was_null.set(value.is_null());
        Ok(value)
    }

    pub fn get_string<C: ColumnIndex>(&self, column: C) -> Result<Option<String>> {
        let value = self.value(column)?;
        Ok((!value.is_null()).then(|| value.to_string()))
    }

    pub fn get_boolean<C: ColumnIndex>(&self, column: C) -> Result<bool> {
        match self.value(column)? {
            Value::Null => Ok(false),
            Value::Boolean(b) => Ok(*b),
            other => Err(mismatch(other, "boolean")),
        }
    }

    pub fn get_short<C: ColumnIndex>(&self, column: C) -> Result<i16> {
        self.get_integer(column, "short")
    }

    pub fn get_int<C: ColumnIndex>(&self, column: C) -> Result<i32> {
        self.get_integer(column, "int")
    }

    pub fn get_long<C: ColumnIndex>(&self, column: C) -> Result<i64> {
        self.get_integer(column, "long")
    }

    fn get_integer<C, T>(&self, column: C, target: &str) -> Result<T>
    where
        C: ColumnIndex,
        T: TryFrom<i64> + Default,
    {
        match self.value(column)? {
            Value::Null => Ok(T::default()),
            Value::Integer(i) => T::try_from(*i).map_err(|_| {
                Error::Coercion(format!("Integer {} is out of range for {}", i, target))
            }),
            other => Err(mismatch(other, target)),
        }
    }

    /// Narrowing to `f32` keeps NaN and infinities but refuses finite overflow
    pub fn get_float<C: ColumnIndex>(&self, column: C) -> Result<f32> {
        let double = self.get_double(column)?;
        let float = double as f32;
        if double.is_finite() && !float.is_finite() {
            return Err(Error::Coercion(format!(
                "Float {} is out of range for float",
                double
            )));
        }
        Ok(float)
    }

    pub fn get_double<C: ColumnIndex>(&self, column: C) -> Result<f64> {
        match self.value(column)? {
            Value::Null => Ok(0.0),
            other => other.as_f64().ok_or_else(|| mismatch(other, "double")),
        }
    }

    pub fn get_object<C: ColumnIndex>(&self, column: C) -> Result<Option<Value>> {
        let value = self.value(column)?;
        Ok((!value.is_null()).then(|| value.clone()))
    }

    /// Whether the last value read was null
    pub fn was_null(&self) -> Result<bool> {
        self.wrapper()?;
        Ok(self.was_null.get())
    }

    /// 1-based index of the column with this label
    pub fn find_column(&self, label: &str) -> Result<usize> {
        let wrapper = self.wrapper()?;
        Ok(label.position(&wrapper.columns)? + 1)
    }

    pub fn column_count(&self) -> Result<usize> {
        Ok(self.wrapper()?.columns.len())
    }

    pub fn column_labels(&self) -> Result<&[String]> {
        Ok(&self.wrapper()?.columns)
    }

    /// Label of the column at a 1-based index
    pub fn column_label(&self, index: usize) -> Result<&str> {
        let wrapper = self.wrapper()?;
        let position = index.position(&wrapper.columns)?;
        Ok(&wrapper.columns[position])
    }

    /// 1-based number of the current row, 0 when not on a row
    pub fn row(&self) -> Result<usize> {
        let wrapper = self.wrapper()?;
        if self.on_row(wrapper) {
            Ok(self.position as usize + 1)
        } else {
            Ok(0)
        }
    }

    pub fn statistics(&self) -> Result<UpdateStatistics> {
        Ok(self.wrapper()?.statistics)
    }

    pub fn shape(&self) -> Result<CursorShape> {
        self.wrapper()?;
        Ok(self.shape)
    }

    pub fn get_type(&self) -> Result<ResultSetType> {
        Ok(self.shape()?.result_set_type)
    }

    pub fn get_concurrency(&self) -> Result<Concurrency> {
        Ok(self.shape()?.concurrency)
    }

    pub fn get_holdability(&self) -> Result<Holdability> {
        Ok(self.shape()?.holdability)
    }

    /// Close the cursor; closing it a second time is an error
    pub fn close(&mut self) -> Result<()> {
        self.wrapper()?;
        self.closed = true;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

fn mismatch(value: &Value, target: &str) -> Error {
    Error::Coercion(format!(
        "Cannot convert {} to {}",
        value.type_name(),
        target
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn wrapper(columns: &[&str], rows: Vec<Vec<Value>>) -> ResultWrapper {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let rows = rows
            .into_iter()
            .map(|values| columns.iter().cloned().zip(values).collect::<HashMap<_, _>>())
            .collect();
        ResultWrapper {
            columns,
            rows,
            statistics: UpdateStatistics::default(),
        }
    }

    fn cursor(columns: &[&str], rows: Vec<Vec<Value>>) -> Cursor {
        Cursor::new(wrapper(columns, rows), CursorShape::default())
    }

    #[test]
    fn test_find_column_and_invalid_indexes() {
        let mut c = cursor(
            &["columnA", "columnB"],
            vec![vec![Value::Integer(1), Value::Integer(2)]],
        );
        assert_eq!(c.find_column("columnA").unwrap(), 1);
        assert_eq!(c.find_column("columnB").unwrap(), 2);
        assert!(matches!(c.find_column("columnC"), Err(Error::InvalidColumn(_))));

        c.next().unwrap();
        assert!(matches!(c.get_string(0), Err(Error::InvalidColumn(_))));
        assert!(matches!(c.get_string(3), Err(Error::InvalidColumn(_))));
        assert_eq!(c.get_string(2).unwrap(), Some("2".to_string()));
        assert_eq!(c.column_label(1).unwrap(), "columnA");
    }

    #[test]
    fn test_null_getters() {
        let mut c = cursor(&["columnA"], vec![vec![Value::Null]]);
        c.next().unwrap();
        assert_eq!(c.get_int("columnA").unwrap(), 0);
        assert!(c.was_null().unwrap());
        assert!(!c.get_boolean("columnA").unwrap());
        assert_eq!(c.get_string("columnA").unwrap(), None);
        assert_eq!(c.get_object("columnA").unwrap(), None);
        assert_eq!(c.get_double("columnA").unwrap(), 0.0);
    }

    #[test]
    fn test_coercions() {
        let mut c = cursor(
            &["big", "small", "f", "s"],
            vec![vec![
                Value::Integer(100_000),
                Value::Integer(7),
                Value::Float(1.5),
                Value::String("x".to_string()),
            ]],
        );
        c.next().unwrap();
        assert!(matches!(c.get_short("big"), Err(Error::Coercion(_))));
        assert_eq!(c.get_int("big").unwrap(), 100_000);
        assert_eq!(c.get_short("small").unwrap(), 7);
        assert!(!c.was_null().unwrap());
        assert_eq!(c.get_double("small").unwrap(), 7.0);
        assert_eq!(c.get_float("f").unwrap(), 1.5);
        assert!(matches!(c.get_long("f"), Err(Error::Coercion(_))));
        assert!(matches!(c.get_boolean("s"), Err(Error::Coercion(_))));
        assert_eq!(c.get_string("f").unwrap(), Some("1.5".to_string()));
    }

    #[test]
    fn test_float_narrowing_range() {
        let mut c = cursor(
            &["huge", "tiny", "inf"],
            vec![vec![
                Value::Float(1e300),
                Value::Float(-3.0e38),
                Value::Float(f64::INFINITY),
            ]],
        );
        c.next().unwrap();
        assert!(matches!(c.get_float("huge"), Err(Error::Coercion(_))));
        assert_eq!(c.get_double("huge").unwrap(), 1e300);
        assert_eq!(c.get_float("tiny").unwrap(), -3.0e38);
        assert_eq!(c.get_float("inf").unwrap(), f32::INFINITY);
    }

    #[test]
    fn test_access_off_row() {
        let mut c = cursor(&["a"], vec![vec![Value::Integer(1)]]);
        assert!(matches!(c.get_int(1), Err(Error::IllegalState(_))));
        assert_eq!(c.row().unwrap(), 0);
        assert!(c.next().unwrap());
        assert_eq!(c.row().unwrap(), 1);
        assert!(!c.next().unwrap());
        assert!(!c.next().unwrap());
        assert_eq!(c.row().unwrap(), 0);
        assert!(matches!(c.get_int(1), Err(Error::IllegalState(_))));
        // Column errors take precedence over row position
        assert!(matches!(c.get_int(5), Err(Error::InvalidColumn(_))));
    }

    #[test]
    fn test_close_is_not_idempotent() {
        let mut c = cursor(&["a"], vec![]);
        c.close().unwrap();
        assert!(c.is_closed());
        assert!(matches!(c.close(), Err(Error::ClosedResource(_))));
        assert!(matches!(c.next(), Err(Error::ClosedResource(_))));
        assert!(matches!(c.column_count(), Err(Error::ClosedResource(_))));
    }

    #[test]
    fn test_uninitialized_cursor() {
        let mut c = Cursor::uninitialized(CursorShape::default());
        assert!(matches!(c.next(), Err(Error::IllegalState(_))));
        assert!(matches!(c.find_column("a"), Err(Error::IllegalState(_))));
        assert!(matches!(c.close(), Err(Error::IllegalState(_))));
    }

    #[test]
    fn test_materialize_truncates() {
        let rows: Vec<Record> = (0..5)
            .map(|i| HashMap::from([("n".to_string(), Value::Integer(i))]))
            .collect();
        let output = QueryOutput {
            columns: vec!["n".to_string()],
            records: Box::new(rows.clone().into_iter()),
            statistics: UpdateStatistics::default(),
        };
        assert_eq!(ResultWrapper::materialize(output, 2).rows.len(), 2);

        let output = QueryOutput {
            columns: vec!["n".to_string()],
            records: Box::new(rows.into_iter()),
            statistics: UpdateStatistics::default(),
        };
        assert_eq!(ResultWrapper::materialize(output, 0).rows.len(), 5);
    }
}
