// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Abstract syntax tree for parsed queries

use crate::value::Value;
use std::fmt;

/// A parsed query: an ordered pipeline of clauses
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub clauses: Vec<Clause>,
}

impl Query {
    /// Whether the query ends with a RETURN clause and therefore produces rows
    pub fn returns_rows(&self) -> bool {
        matches!(self.clauses.last(), Some(Clause::Return(_)))
    }

    /// Whether any clause can change the graph
    pub fn is_updating(&self) -> bool {
        self.clauses.iter().any(Clause::is_updating)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Match {
        patterns: Vec<Pattern>,
        predicate: Option<Expression>,
    },
    Create {
        patterns: Vec<Pattern>,
    },
    Set {
        items: Vec<SetItem>,
    },
    Remove {
        items: Vec<RemoveItem>,
    },
    Delete {
        detach: bool,
        expressions: Vec<Expression>,
    },
    Return(ReturnClause),
}

impl Clause {
    pub fn name(&self) -> &'static str {
        match self {
            Clause::Match { .. } => "MATCH",
            Clause::Create { .. } => "CREATE",
            Clause::Set { .. } => "SET",
            Clause::Remove { .. } => "REMOVE",
            Clause::Delete { detach: true, .. } => "DETACH DELETE",
            Clause::Delete { .. } => "DELETE",
            Clause::Return(_) => "RETURN",
        }
    }

    pub fn is_updating(&self) -> bool {
        matches!(
            self,
            Clause::Create { .. } | Clause::Set { .. } | Clause::Remove { .. } | Clause::Delete { .. }
        )
    }
}

/// A path pattern: a start node followed by relationship hops
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub start: NodePattern,
    pub steps: Vec<(RelationshipPattern, NodePattern)>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodePattern {
    pub variable: Option<String>,
    pub labels: Vec<String>,
    pub properties: Vec<(String, Expression)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipPattern {
    pub variable: Option<String>,
    pub rel_type: Option<String>,
    pub properties: Vec<(String, Expression)>,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SetItem {
    Property {
        variable: String,
        key: String,
        value: Expression,
    },
    Labels {
        variable: String,
        labels: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemoveItem {
    Property { variable: String, key: String },
    Labels { variable: String, labels: Vec<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnClause {
    pub distinct: bool,
    pub items: ReturnItems,
    pub order_by: Vec<SortItem>,
    pub skip: Option<Expression>,
    pub limit: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReturnItems {
    /// `RETURN *`
    All,
    Explicit(Vec<ReturnItem>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnItem {
    pub expression: Expression,
    pub alias: Option<String>,
}

impl ReturnItem {
    /// Column label: the alias, or the expression's canonical text
    pub fn column_name(&self) -> String {
        self.alias
            .clone()
            .unwrap_or_else(|| self.expression.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortItem {
    pub expression: Expression,
    pub descending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Or,
    Xor,
    And,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    In,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Or => "OR",
            BinaryOperator::Xor => "XOR",
            BinaryOperator::And => "AND",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::In => "IN",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Value),
    Variable(String),
    Property(Box<Expression>, String),
    List(Vec<Expression>),
    Map(Vec<(String, Expression)>),
    Unary(UnaryOperator, Box<Expression>),
    Binary(Box<Expression>, BinaryOperator, Box<Expression>),
    IsNull {
        expression: Box<Expression>,
        negated: bool,
    },
    Function {
        name: String,
        distinct: bool,
        arguments: Vec<Expression>,
    },
    CountStar,
}

/// Names of the aggregating functions
pub const AGGREGATE_FUNCTIONS: [&str; 6] = ["count", "sum", "avg", "min", "max", "collect"];

impl Expression {
    /// Whether this expression (or any sub-expression) aggregates over rows
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Expression::CountStar => true,
            Expression::Function {
                name, arguments, ..
            } => {
                AGGREGATE_FUNCTIONS.contains(&name.to_ascii_lowercase().as_str())
                    || arguments.iter().any(Expression::contains_aggregate)
            }
            Expression::Property(inner, _) | Expression::Unary(_, inner) => {
                inner.contains_aggregate()
            }
            Expression::IsNull { expression, .. } => expression.contains_aggregate(),
            Expression::Binary(left, _, right) => {
                left.contains_aggregate() || right.contains_aggregate()
            }
            Expression::List(items) => items.iter().any(Expression::contains_aggregate),
            Expression::Map(entries) => entries.iter().any(|(_, e)| e.contains_aggregate()),
            Expression::Literal(_) | Expression::Variable(_) => false,
        }
    }
}

fn write_literal(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::String(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
        other => write!(f, "{}", other),
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(value) => write_literal(f, value),
            Expression::Variable(name) => write!(f, "{}", name),
            Expression::Property(inner, key) => write!(f, "{}.{}", inner, key),
            Expression::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Expression::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Expression::Unary(UnaryOperator::Not, inner) => write!(f, "NOT {}", inner),
            Expression::Unary(UnaryOperator::Negate, inner) => write!(f, "-{}", inner),
            Expression::Binary(left, op, right) => {
                write!(f, "{} {} {}", left, op.symbol(), right)
            }
            Expression::IsNull {
                expression,
                negated,
            } => {
                if *negated {
                    write!(f, "{} IS NOT NULL", expression)
                } else {
                    write!(f, "{} IS NULL", expression)
                }
            }
            Expression::Function {
                name,
                distinct,
                arguments,
            } => {
                write!(f, "{}(", name)?;
                if *distinct {
                    write!(f, "DISTINCT ")?;
                }
                for (i, arg) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expression::CountStar => write!(f, "count(*)"),
        }
    }
}
