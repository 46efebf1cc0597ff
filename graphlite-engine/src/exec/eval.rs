// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Expression evaluation
//!
//! Evaluation follows three-valued logic: comparisons involving null yield
//! null, and predicates only pass rows whose value is exactly `true`.

use crate::error::{EngineError, EngineResult};
use crate::graph::{GraphStore, NodeId, RelationshipId};
use crate::query::ast::{BinaryOperator, Expression, UnaryOperator, AGGREGATE_FUNCTIONS};
use crate::value::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// What a query variable is bound to in one row
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Binding {
    Node(NodeId),
    Relationship(RelationshipId),
    Value(Value),
}

pub(crate) type Bindings = BTreeMap<String, Binding>;

fn type_error(message: impl Into<String>) -> EngineError {
    EngineError::Execution(format!("Type mismatch: {}", message.into()))
}

pub(crate) struct Evaluator<'g> {
    graph: &'g GraphStore,
}

impl<'g> Evaluator<'g> {
    pub(crate) fn new(graph: &'g GraphStore) -> Self {
        Self { graph }
    }

    /// Materialize a binding as a value; entities deleted earlier in the
    /// statement resolve to null
    pub(crate) fn resolve(&self, binding: &Binding) -> Value {
        match binding {
            Binding::Node(id) => self
                .graph
                .node(*id)
                .cloned()
                .map(Value::Node)
                .unwrap_or(Value::Null),
            Binding::Relationship(id) => self
                .graph
                .relationship(*id)
                .cloned()
                .map(Value::Relationship)
                .unwrap_or(Value::Null),
            Binding::Value(value) => value.clone(),
        }
    }

    /// Evaluate a predicate; only `true` passes
    pub(crate) fn is_true(&self, expression: &Expression, row: &Bindings) -> EngineResult<bool> {
        Ok(matches!(
            self.evaluate(expression, row)?,
            Value::Boolean(true)
        ))
    }

    pub(crate) fn evaluate(&self, expression: &Expression, row: &Bindings) -> EngineResult<Value> {
        match expression {
            Expression::Literal(value) => Ok(value.clone()),
            Expression::Variable(name) => row
                .get(name)
                .map(|binding| self.resolve(binding))
                .ok_or_else(|| EngineError::Execution(format!("Variable `{}` not defined", name))),
            Expression::Property(inner, key) => self.property(inner, key, row),
            Expression::List(items) => Ok(Value::List(
                items
                    .iter()
                    .map(|item| self.evaluate(item, row))
                    .collect::<EngineResult<Vec<_>>>()?,
            )),
            Expression::Map(entries) => {
                let mut map = BTreeMap::new();
                for (key, value) in entries {
                    map.insert(key.clone(), self.evaluate(value, row)?);
                }
                Ok(Value::Map(map))
            }
            Expression::Unary(op, inner) => {
                let value = self.evaluate(inner, row)?;
                unary(*op, value)
            }
            Expression::Binary(left, op, right) => {
                let left = self.evaluate(left, row)?;
                let right = self.evaluate(right, row)?;
                binary(left, *op, right)
            }
            Expression::IsNull {
                expression,
                negated,
            } => {
                let is_null = self.evaluate(expression, row)?.is_null();
                Ok(Value::Boolean(is_null != *negated))
            }
            Expression::Function {
                name, arguments, ..
            } => {
                let lowered = name.to_ascii_lowercase();
                if AGGREGATE_FUNCTIONS.contains(&lowered.as_str()) {
                    return Err(EngineError::Execution(format!(
                        "Invalid use of aggregating function {}(...) in this context",
                        name
                    )));
                }
                let args = arguments
                    .iter()
                    .map(|arg| self.evaluate(arg, row))
                    .collect::<EngineResult<Vec<_>>>()?;
                scalar_function(&lowered, name, args)
            }
            Expression::CountStar => Err(EngineError::Execution(
                "Invalid use of aggregating function count(...) in this context".to_string(),
            )),
        }
    }

    fn property(&self, inner: &Expression, key: &str, row: &Bindings) -> EngineResult<Value> {
        // Avoid cloning whole entities for the common `var.key` shape
        if let Expression::Variable(name) = inner {
            match row.get(name) {
                Some(Binding::Node(id)) => {
                    return Ok(self
                        .graph
                        .node(*id)
                        .and_then(|n| n.property(key))
                        .cloned()
                        .unwrap_or(Value::Null))
                }
                Some(Binding::Relationship(id)) => {
                    return Ok(self
                        .graph
                        .relationship(*id)
                        .and_then(|r| r.property(key))
                        .cloned()
                        .unwrap_or(Value::Null))
                }
                _ => {}
            }
        }

        match self.evaluate(inner, row)? {
            Value::Null => Ok(Value::Null),
            Value::Node(node) => Ok(node.property(key).cloned().unwrap_or(Value::Null)),
            Value::Relationship(rel) => Ok(rel.property(key).cloned().unwrap_or(Value::Null)),
            Value::Map(map) => Ok(map.get(key).cloned().unwrap_or(Value::Null)),
            other => Err(type_error(format!(
                "expected a map, node or relationship but was {}",
                other.type_name()
            ))),
        }
    }

    /// Evaluate an expression over a group of rows. Aggregating functions
    /// consume the whole group; everything else is evaluated on the first row,
    /// which carries the group's key values.
    pub(crate) fn evaluate_group(
        &self,
        expression: &Expression,
        rows: &[Bindings],
    ) -> EngineResult<Value> {
        match expression {
            Expression::CountStar => Ok(Value::Integer(rows.len() as i64)),
            Expression::Function {
                name,
                distinct,
                arguments,
            } if AGGREGATE_FUNCTIONS.contains(&name.to_ascii_lowercase().as_str()) => {
                let argument = match arguments.as_slice() {
                    [argument] => argument,
                    _ => {
                        return Err(EngineError::Execution(format!(
                            "Function {}() takes exactly one argument",
                            name
                        )))
                    }
                };
                let mut values = Vec::with_capacity(rows.len());
                for row in rows {
                    let value = self.evaluate(argument, row)?;
                    if value.is_null() {
                        continue;
                    }
                    if *distinct && values.contains(&value) {
                        continue;
                    }
                    values.push(value);
                }
                aggregate(&name.to_ascii_lowercase(), values)
            }
            Expression::Binary(left, op, right) => {
                let left = self.evaluate_group(left, rows)?;
                let right = self.evaluate_group(right, rows)?;
                binary(left, *op, right)
            }
            Expression::Unary(op, inner) => unary(*op, self.evaluate_group(inner, rows)?),
            Expression::List(items) => Ok(Value::List(
                items
                    .iter()
                    .map(|item| self.evaluate_group(item, rows))
                    .collect::<EngineResult<Vec<_>>>()?,
            )),
            other => match rows.first() {
                Some(row) => self.evaluate(other, row),
                None => self.evaluate(other, &Bindings::new()),
            },
        }
    }
}

fn aggregate(name: &str, values: Vec<Value>) -> EngineResult<Value> {
    match name {
        "count" => Ok(Value::Integer(values.len() as i64)),
        "collect" => Ok(Value::List(values)),
        "sum" => {
            if values.iter().all(|v| matches!(v, Value::Integer(_))) {
                let mut total: i64 = 0;
                for value in &values {
                    if let Value::Integer(i) = value {
                        total = total.checked_add(*i).ok_or_else(|| {
                            EngineError::Execution("Integer overflow in sum()".to_string())
                        })?;
                    }
                }
                Ok(Value::Integer(total))
            } else {
                let mut total = 0.0;
                for value in &values {
                    total += value
                        .as_f64()
                        .ok_or_else(|| type_error(format!("sum() over {}", value.type_name())))?;
                }
                Ok(Value::Float(total))
            }
        }
        "avg" => {
            if values.is_empty() {
                return Ok(Value::Null);
            }
            let mut total = 0.0;
            for value in &values {
                total += value
                    .as_f64()
                    .ok_or_else(|| type_error(format!("avg() over {}", value.type_name())))?;
            }
            Ok(Value::Float(total / values.len() as f64))
        }
        "min" | "max" => {
            let wanted = if name == "min" {
                Ordering::Less
            } else {
                Ordering::Greater
            };
            let mut best: Option<Value> = None;
            for value in values {
                best = match best {
                    Some(current) if value.sort_order(&current) != wanted => Some(current),
                    _ => Some(value),
                };
            }
            Ok(best.unwrap_or(Value::Null))
        }
        other => Err(EngineError::Execution(format!(
            "Unknown aggregating function '{}'",
            other
        ))),
    }
}

fn unary(op: UnaryOperator, value: Value) -> EngineResult<Value> {
    match (op, value) {
        (_, Value::Null) => Ok(Value::Null),
        (UnaryOperator::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
        (UnaryOperator::Negate, Value::Integer(i)) => i
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| EngineError::Execution("Integer overflow".to_string())),
        (UnaryOperator::Negate, Value::Float(x)) => Ok(Value::Float(-x)),
        (UnaryOperator::Not, other) => Err(type_error(format!(
            "expected Boolean but was {}",
            other.type_name()
        ))),
        (UnaryOperator::Negate, other) => Err(type_error(format!(
            "expected a number but was {}",
            other.type_name()
        ))),
    }
}

fn truth(value: &Value) -> EngineResult<Option<bool>> {
    match value {
        Value::Null => Ok(None),
        Value::Boolean(b) => Ok(Some(*b)),
        other => Err(type_error(format!(
            "expected Boolean but was {}",
            other.type_name()
        ))),
    }
}

fn logical(value: Option<bool>) -> Value {
    value.map(Value::Boolean).unwrap_or(Value::Null)
}

pub(crate) fn binary(left: Value, op: BinaryOperator, right: Value) -> EngineResult<Value> {
    match op {
        BinaryOperator::And => {
            let result = match (truth(&left)?, truth(&right)?) {
                (Some(false), _) | (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            };
            Ok(logical(result))
        }
        BinaryOperator::Or => {
            let result = match (truth(&left)?, truth(&right)?) {
                (Some(true), _) | (_, Some(true)) => Some(true),
                (Some(false), Some(false)) => Some(false),
                _ => None,
            };
            Ok(logical(result))
        }
        BinaryOperator::Xor => {
            let result = match (truth(&left)?, truth(&right)?) {
                (Some(a), Some(b)) => Some(a != b),
                _ => None,
            };
            Ok(logical(result))
        }
        BinaryOperator::Equal => Ok(logical(left.equals(&right))),
        BinaryOperator::NotEqual => Ok(logical(left.equals(&right).map(|eq| !eq))),
        BinaryOperator::LessThan => Ok(compare(&left, &right, |o| o == Ordering::Less)),
        BinaryOperator::LessEqual => Ok(compare(&left, &right, |o| o != Ordering::Greater)),
        BinaryOperator::GreaterThan => Ok(compare(&left, &right, |o| o == Ordering::Greater)),
        BinaryOperator::GreaterEqual => Ok(compare(&left, &right, |o| o != Ordering::Less)),
        BinaryOperator::In => match right {
            Value::Null => Ok(Value::Null),
            Value::List(items) => {
                let mut unknown = left.is_null();
                for item in &items {
                    match left.equals(item) {
                        Some(true) => return Ok(Value::Boolean(true)),
                        None => unknown = true,
                        Some(false) => {}
                    }
                }
                Ok(if unknown {
                    Value::Null
                } else {
                    Value::Boolean(false)
                })
            }
            other => Err(type_error(format!(
                "expected a List but was {}",
                other.type_name()
            ))),
        },
        BinaryOperator::Add => add(left, right),
        BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Modulo => arithmetic(left, op, right),
    }
}

fn compare(left: &Value, right: &Value, accept: impl Fn(Ordering) -> bool) -> Value {
    logical(left.compare(right).map(accept))
}

fn add(left: Value, right: Value) -> EngineResult<Value> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
        (Value::String(a), b @ (Value::Integer(_) | Value::Float(_) | Value::Boolean(_))) => {
            Ok(Value::String(format!("{}{}", a, b)))
        }
        (a @ (Value::Integer(_) | Value::Float(_) | Value::Boolean(_)), Value::String(b)) => {
            Ok(Value::String(format!("{}{}", a, b)))
        }
        (Value::List(mut a), Value::List(b)) => {
            a.extend(b);
            Ok(Value::List(a))
        }
        (Value::List(mut a), b) => {
            a.push(b);
            Ok(Value::List(a))
        }
        (a, b) => arithmetic(a, BinaryOperator::Add, b),
    }
}

fn arithmetic(left: Value, op: BinaryOperator, right: Value) -> EngineResult<Value> {
    match (&left, &right) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Integer(a), Value::Integer(b)) => {
            let (a, b) = (*a, *b);
            let result = match op {
                BinaryOperator::Add => a.checked_add(b),
                BinaryOperator::Subtract => a.checked_sub(b),
                BinaryOperator::Multiply => a.checked_mul(b),
                BinaryOperator::Divide | BinaryOperator::Modulo if b == 0 => {
                    return Err(EngineError::Execution("/ by zero".to_string()))
                }
                BinaryOperator::Divide => a.checked_div(b),
                BinaryOperator::Modulo => a.checked_rem(b),
                _ => None,
            };
            result
                .map(Value::Integer)
                .ok_or_else(|| EngineError::Execution("Integer overflow".to_string()))
        }
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => {
                let result = match op {
                    BinaryOperator::Add => a + b,
                    BinaryOperator::Subtract => a - b,
                    BinaryOperator::Multiply => a * b,
                    BinaryOperator::Divide => a / b,
                    _ => a % b,
                };
                Ok(Value::Float(result))
            }
            _ => Err(type_error(format!(
                "cannot apply {} to {} and {}",
                op.symbol(),
                left.type_name(),
                right.type_name()
            ))),
        },
    }
}

fn scalar_function(lowered: &str, name: &str, args: Vec<Value>) -> EngineResult<Value> {
    let single = |args: &[Value]| -> EngineResult<Value> {
        match args {
            [value] => Ok(value.clone()),
            _ => Err(EngineError::Execution(format!(
                "Function {}() takes exactly one argument",
                name
            ))),
        }
    };

    match lowered {
        "coalesce" => Ok(args
            .into_iter()
            .find(|v| !v.is_null())
            .unwrap_or(Value::Null)),
        "id" => match single(&args)? {
            Value::Null => Ok(Value::Null),
            Value::Node(node) => Ok(Value::Integer(node.id as i64)),
            Value::Relationship(rel) => Ok(Value::Integer(rel.id as i64)),
            other => Err(type_error(format!(
                "id() expects a node or relationship but was {}",
                other.type_name()
            ))),
        },
        "labels" => match single(&args)? {
            Value::Null => Ok(Value::Null),
            Value::Node(node) => Ok(Value::List(
                node.labels.into_iter().map(Value::String).collect(),
            )),
            other => Err(type_error(format!(
                "labels() expects a node but was {}",
                other.type_name()
            ))),
        },
        "type" => match single(&args)? {
            Value::Null => Ok(Value::Null),
            Value::Relationship(rel) => Ok(Value::String(rel.rel_type)),
            other => Err(type_error(format!(
                "type() expects a relationship but was {}",
                other.type_name()
            ))),
        },
        "keys" => match single(&args)? {
            Value::Null => Ok(Value::Null),
            Value::Node(node) => Ok(Value::List(
                node.properties.into_keys().map(Value::String).collect(),
            )),
            Value::Relationship(rel) => Ok(Value::List(
                rel.properties.into_keys().map(Value::String).collect(),
            )),
            Value::Map(map) => Ok(Value::List(map.into_keys().map(Value::String).collect())),
            other => Err(type_error(format!(
                "keys() expects a map, node or relationship but was {}",
                other.type_name()
            ))),
        },
        "properties" => match single(&args)? {
            Value::Null => Ok(Value::Null),
            Value::Node(node) => Ok(Value::Map(node.properties)),
            Value::Relationship(rel) => Ok(Value::Map(rel.properties)),
            map @ Value::Map(_) => Ok(map),
            other => Err(type_error(format!(
                "properties() expects a map, node or relationship but was {}",
                other.type_name()
            ))),
        },
        "size" => match single(&args)? {
            Value::Null => Ok(Value::Null),
            Value::String(s) => Ok(Value::Integer(s.chars().count() as i64)),
            Value::List(items) => Ok(Value::Integer(items.len() as i64)),
            other => Err(type_error(format!(
                "size() expects a string or list but was {}",
                other.type_name()
            ))),
        },
        "toupper" | "tolower" => match single(&args)? {
            Value::Null => Ok(Value::Null),
            Value::String(s) if lowered == "toupper" => Ok(Value::String(s.to_uppercase())),
            Value::String(s) => Ok(Value::String(s.to_lowercase())),
            other => Err(type_error(format!(
                "{}() expects a string but was {}",
                name,
                other.type_name()
            ))),
        },
        "tostring" => match single(&args)? {
            Value::Null => Ok(Value::Null),
            value @ (Value::String(_) | Value::Integer(_) | Value::Float(_) | Value::Boolean(_)) => {
                Ok(Value::String(value.to_string()))
            }
            other => Err(type_error(format!(
                "toString() cannot convert {}",
                other.type_name()
            ))),
        },
        "tointeger" => match single(&args)? {
            Value::Integer(i) => Ok(Value::Integer(i)),
            Value::Float(x) => Ok(Value::Integer(x.trunc() as i64)),
            Value::String(s) => Ok(s
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .unwrap_or(Value::Null)),
            _ => Ok(Value::Null),
        },
        "tofloat" => match single(&args)? {
            Value::Integer(i) => Ok(Value::Float(i as f64)),
            Value::Float(x) => Ok(Value::Float(x)),
            Value::String(s) => Ok(s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .unwrap_or(Value::Null)),
            _ => Ok(Value::Null),
        },
        _ => Err(EngineError::Execution(format!(
            "Unknown function '{}'",
            name
        ))),
    }
}
