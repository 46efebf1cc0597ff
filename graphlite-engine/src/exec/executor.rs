// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Clause-by-clause query execution
//!
//! A query runs as a pipeline of binding rows. Every updating clause applies
//! its changes to the working graph immediately, so later clauses observe
//! them, and records the same changes as [`Mutation`]s for the transaction log.

use super::eval::{Binding, Bindings, Evaluator};
use super::result::{QueryResult, QueryStatistics, Row};
use crate::error::{EngineError, EngineResult};
use crate::graph::{
    GraphStore, IdAllocator, Mutation, Node, NodeId, Relationship, RelationshipId,
};
use crate::query::ast::{
    Clause, Direction, Expression, NodePattern, Pattern, Query, RemoveItem, ReturnClause,
    ReturnItem, ReturnItems, SetItem,
};
use crate::value::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Instant;

/// Run `query` against `graph`, returning the result and the mutations it made
pub(crate) fn execute_query(
    query: &Query,
    graph: &mut GraphStore,
    ids: &IdAllocator,
) -> EngineResult<(QueryResult, Vec<Mutation>)> {
    QueryExecutor::new(graph, ids).execute(query)
}

#[derive(Debug, Clone, Copy)]
enum Target {
    Node(NodeId),
    Relationship(RelationshipId),
}

struct QueryExecutor<'a> {
    graph: &'a mut GraphStore,
    ids: &'a IdAllocator,
    mutations: Vec<Mutation>,
    statistics: QueryStatistics,
    /// Variables in scope, in declaration order (used by `RETURN *`)
    declared: Vec<String>,
}

impl<'a> QueryExecutor<'a> {
    fn new(graph: &'a mut GraphStore, ids: &'a IdAllocator) -> Self {
        Self {
            graph,
            ids,
            mutations: Vec::new(),
            statistics: QueryStatistics::default(),
            declared: Vec::new(),
        }
    }

    fn execute(mut self, query: &Query) -> EngineResult<(QueryResult, Vec<Mutation>)> {
        let started = Instant::now();
        let mut result = QueryResult::new();
        let mut rows = vec![Bindings::new()];

        for clause in &query.clauses {
            log::trace!("executing {} over {} row(s)", clause.name(), rows.len());
            match clause {
                Clause::Match {
                    patterns,
                    predicate,
                } => rows = self.match_clause(rows, patterns, predicate.as_ref())?,
                Clause::Create { patterns } => rows = self.create_clause(rows, patterns)?,
                Clause::Set { items } => self.set_clause(&rows, items)?,
                Clause::Remove { items } => self.remove_clause(&rows, items)?,
                Clause::Delete {
                    detach,
                    expressions,
                } => self.delete_clause(&rows, *detach, expressions)?,
                Clause::Return(ret) => {
                    let (variables, projected) = self.project(std::mem::take(&mut rows), ret)?;
                    result.variables = variables;
                    result.rows = projected;
                }
            }
        }

        result.statistics = self.statistics;
        result.execution_time_ms = started.elapsed().as_millis() as u64;
        Ok((result, self.mutations))
    }

    fn apply(&mut self, mutation: Mutation) {
        self.graph.apply(&mutation);
        self.mutations.push(mutation);
    }

    fn declare(&mut self, variable: Option<&String>) {
        if let Some(name) = variable {
            if !self.declared.contains(name) {
                self.declared.push(name.clone());
            }
        }
    }

    fn declare_pattern(&mut self, pattern: &Pattern) {
        self.declare(pattern.start.variable.as_ref());
        for (rel, node) in &pattern.steps {
            self.declare(rel.variable.as_ref());
            self.declare(node.variable.as_ref());
        }
    }

    // ==================== MATCH ====================

    fn match_clause(
        &mut self,
        rows: Vec<Bindings>,
        patterns: &[Pattern],
        predicate: Option<&Expression>,
    ) -> EngineResult<Vec<Bindings>> {
        for pattern in patterns {
            self.declare_pattern(pattern);
        }

        let graph: &GraphStore = &*self.graph;
        let matcher = Matcher {
            graph,
            evaluator: Evaluator::new(graph),
        };

        let mut matched = Vec::new();
        for row in rows {
            let mut partial = vec![row];
            for pattern in patterns {
                let mut next = Vec::new();
                for candidate in partial {
                    matcher.match_pattern(pattern, candidate, &mut next)?;
                }
                partial = next;
            }
            for candidate in partial {
                let keep = match predicate {
                    Some(predicate) => matcher.evaluator.is_true(predicate, &candidate)?,
                    None => true,
                };
                if keep {
                    matched.push(candidate);
                }
            }
        }
        Ok(matched)
    }

    // ==================== CREATE ====================

    fn create_clause(
        &mut self,
        rows: Vec<Bindings>,
        patterns: &[Pattern],
    ) -> EngineResult<Vec<Bindings>> {
        for pattern in patterns {
            self.declare_pattern(pattern);
        }

        let mut created = Vec::with_capacity(rows.len());
        for mut row in rows {
            for pattern in patterns {
                let mut current = self.create_or_reuse_node(&pattern.start, &mut row)?;
                for (rel_pattern, node_pattern) in &pattern.steps {
                    let other = self.create_or_reuse_node(node_pattern, &mut row)?;
                    let (start, end) = match rel_pattern.direction {
                        Direction::Incoming => (other, current),
                        _ => (current, other),
                    };
                    let rel_type = rel_pattern.rel_type.clone().ok_or_else(|| {
                        EngineError::Execution(
                            "Exactly one relationship type must be specified for CREATE"
                                .to_string(),
                        )
                    })?;
                    if let Some(variable) = &rel_pattern.variable {
                        if row.contains_key(variable) {
                            return Err(EngineError::Execution(format!(
                                "Can't create relationship `{}`: the variable is already declared in this context",
                                variable
                            )));
                        }
                    }

                    let properties = self.evaluate_properties(&rel_pattern.properties, &row)?;
                    let id = self.ids.next_relationship_id();
                    self.statistics.relationships_created += 1;
                    self.statistics.properties_set += properties.len();
                    self.apply(Mutation::CreateRelationship(Relationship {
                        id,
                        rel_type,
                        start,
                        end,
                        properties,
                    }));
                    if let Some(variable) = &rel_pattern.variable {
                        row.insert(variable.clone(), Binding::Relationship(id));
                    }
                    current = other;
                }
            }
            created.push(row);
        }
        Ok(created)
    }

    fn create_or_reuse_node(
        &mut self,
        pattern: &NodePattern,
        row: &mut Bindings,
    ) -> EngineResult<NodeId> {
        if let Some(variable) = &pattern.variable {
            match row.get(variable) {
                Some(Binding::Node(id)) => {
                    if !pattern.labels.is_empty() || !pattern.properties.is_empty() {
                        return Err(EngineError::Execution(format!(
                            "Can't create node `{}` with labels or properties here. The variable is already declared in this context",
                            variable
                        )));
                    }
                    return Ok(*id);
                }
                Some(_) => {
                    return Err(EngineError::Execution(format!(
                        "Variable `{}` already declared as another type",
                        variable
                    )))
                }
                None => {}
            }
        }

        let properties = self.evaluate_properties(&pattern.properties, row)?;
        let mut node = Node::new(self.ids.next_node_id());
        for label in &pattern.labels {
            if !node.has_label(label) {
                node.labels.push(label.clone());
            }
        }
        node.properties = properties;

        let id = node.id;
        self.statistics.nodes_created += 1;
        self.statistics.labels_added += node.labels.len();
        self.statistics.properties_set += node.properties.len();
        self.apply(Mutation::CreateNode(node));
        if let Some(variable) = &pattern.variable {
            row.insert(variable.clone(), Binding::Node(id));
        }
        Ok(id)
    }

    fn evaluate_properties(
        &self,
        properties: &[(String, Expression)],
        row: &Bindings,
    ) -> EngineResult<BTreeMap<String, Value>> {
        let evaluator = Evaluator::new(&*self.graph);
        let mut evaluated = BTreeMap::new();
        for (key, expression) in properties {
            let value = evaluator.evaluate(expression, row)?;
            check_storable(&value)?;
            if !value.is_null() {
                evaluated.insert(key.clone(), value);
            }
        }
        Ok(evaluated)
    }

    // ==================== SET / REMOVE ====================

    /// Resolve a variable to the entity it names; deleted entities and nulls
    /// resolve to `None`
    fn target(&self, variable: &str, row: &Bindings) -> EngineResult<Option<Target>> {
        match row.get(variable) {
            Some(Binding::Node(id)) => Ok(self.graph.node(*id).map(|_| Target::Node(*id))),
            Some(Binding::Relationship(id)) => Ok(self
                .graph
                .relationship(*id)
                .map(|_| Target::Relationship(*id))),
            Some(Binding::Value(Value::Null)) => Ok(None),
            Some(Binding::Value(other)) => Err(EngineError::Execution(format!(
                "Type mismatch: expected a node or relationship but was {}",
                other.type_name()
            ))),
            None => Err(EngineError::Execution(format!(
                "Variable `{}` not defined",
                variable
            ))),
        }
    }

    fn has_property(&self, target: Target, key: &str) -> bool {
        match target {
            Target::Node(id) => self.graph.node(id).and_then(|n| n.property(key)).is_some(),
            Target::Relationship(id) => self
                .graph
                .relationship(id)
                .and_then(|r| r.property(key))
                .is_some(),
        }
    }

    fn write_property(&mut self, target: Target, key: &str, value: Option<Value>) {
        if value.is_none() && !self.has_property(target, key) {
            return;
        }
        let key = key.to_string();
        let mutation = match target {
            Target::Node(id) => Mutation::SetNodeProperty { id, key, value },
            Target::Relationship(id) => Mutation::SetRelationshipProperty { id, key, value },
        };
        self.statistics.properties_set += 1;
        self.apply(mutation);
    }

    fn node_target(&self, variable: &str, row: &Bindings) -> EngineResult<Option<NodeId>> {
        match self.target(variable, row)? {
            Some(Target::Node(id)) => Ok(Some(id)),
            Some(Target::Relationship(_)) => Err(EngineError::Execution(format!(
                "Type mismatch: `{}` is a relationship, labels apply to nodes only",
                variable
            ))),
            None => Ok(None),
        }
    }

    fn set_clause(&mut self, rows: &[Bindings], items: &[SetItem]) -> EngineResult<()> {
        for row in rows {
            for item in items {
                match item {
                    SetItem::Property {
                        variable,
                        key,
                        value,
                    } => {
                        let value = Evaluator::new(&*self.graph).evaluate(value, row)?;
                        check_storable(&value)?;
                        if let Some(target) = self.target(variable, row)? {
                            let value = if value.is_null() { None } else { Some(value) };
                            self.write_property(target, key, value);
                        }
                    }
                    SetItem::Labels { variable, labels } => {
                        if let Some(id) = self.node_target(variable, row)? {
                            for label in labels {
                                let present =
                                    self.graph.node(id).is_some_and(|n| n.has_label(label));
                                if !present {
                                    self.statistics.labels_added += 1;
                                    self.apply(Mutation::AddLabel {
                                        id,
                                        label: label.clone(),
                                    });
                                }
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn remove_clause(&mut self, rows: &[Bindings], items: &[RemoveItem]) -> EngineResult<()> {
        for row in rows {
            for item in items {
                match item {
                    RemoveItem::Property { variable, key } => {
                        if let Some(target) = self.target(variable, row)? {
                            self.write_property(target, key, None);
                        }
                    }
                    RemoveItem::Labels { variable, labels } => {
                        if let Some(id) = self.node_target(variable, row)? {
                            for label in labels {
                                let present =
                                    self.graph.node(id).is_some_and(|n| n.has_label(label));
                                if present {
                                    self.statistics.labels_removed += 1;
                                    self.apply(Mutation::RemoveLabel {
                                        id,
                                        label: label.clone(),
                                    });
                                }
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    // ==================== DELETE ====================

    fn delete_clause(
        &mut self,
        rows: &[Bindings],
        detach: bool,
        expressions: &[Expression],
    ) -> EngineResult<()> {
        let mut nodes = Vec::new();
        let mut relationships = Vec::new();
        {
            let evaluator = Evaluator::new(&*self.graph);
            for row in rows {
                for expression in expressions {
                    if let Expression::Variable(name) = expression {
                        match row.get(name) {
                            Some(Binding::Node(id)) => {
                                nodes.push(*id);
                                continue;
                            }
                            Some(Binding::Relationship(id)) => {
                                relationships.push(*id);
                                continue;
                            }
                            _ => {}
                        }
                    }
                    match evaluator.evaluate(expression, row)? {
                        Value::Null => {}
                        Value::Node(node) => nodes.push(node.id),
                        Value::Relationship(rel) => relationships.push(rel.id),
                        Value::Path(path) => {
                            relationships.extend(path.relationships.iter().map(|r| r.id));
                            nodes.extend(path.nodes.iter().map(|n| n.id));
                        }
                        other => {
                            return Err(EngineError::Execution(format!(
                                "Type mismatch: expected Node, Relationship or Path but was {}",
                                other.type_name()
                            )))
                        }
                    }
                }
            }
        }

        // Relationships named by the clause go first so that deleting both a
        // node and its relationships in one DELETE succeeds
        relationships.sort_unstable();
        relationships.dedup();
        for id in relationships {
            self.delete_relationship(id);
        }

        let mut seen = Vec::with_capacity(nodes.len());
        for id in nodes {
            if seen.contains(&id) || self.graph.node(id).is_none() {
                continue;
            }
            seen.push(id);

            let attached: Vec<RelationshipId> =
                self.graph.relationships_of(id).map(|r| r.id).collect();
            if !attached.is_empty() {
                if !detach {
                    return Err(EngineError::Execution(format!(
                        "Cannot delete node<{}>, because it still has relationships. To delete this node, you must first delete its relationships.",
                        id
                    )));
                }
                for rel in attached {
                    self.delete_relationship(rel);
                }
            }
            self.statistics.nodes_deleted += 1;
            self.apply(Mutation::DeleteNode(id));
        }
        Ok(())
    }

    fn delete_relationship(&mut self, id: RelationshipId) {
        if self.graph.relationship(id).is_some() {
            self.statistics.relationships_deleted += 1;
            self.apply(Mutation::DeleteRelationship(id));
        }
    }

    // ==================== RETURN ====================

    fn project(
        &self,
        rows: Vec<Bindings>,
        ret: &ReturnClause,
    ) -> EngineResult<(Vec<String>, Vec<Row>)> {
        let items: Vec<ReturnItem> = match &ret.items {
            ReturnItems::All => {
                if self.declared.is_empty() {
                    return Err(EngineError::Execution(
                        "RETURN * is not allowed when there are no variables in scope"
                            .to_string(),
                    ));
                }
                self.declared
                    .iter()
                    .map(|name| ReturnItem {
                        expression: Expression::Variable(name.clone()),
                        alias: None,
                    })
                    .collect()
            }
            ReturnItems::Explicit(items) => items.clone(),
        };

        let columns: Vec<String> = items.iter().map(ReturnItem::column_name).collect();
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].contains(column) {
                return Err(EngineError::Execution(format!(
                    "Multiple result columns with the same name `{}` are not supported",
                    column
                )));
            }
        }

        let evaluator = Evaluator::new(&*self.graph);
        let mut projected: Vec<(Vec<Value>, Bindings)> =
            if items.iter().any(|item| item.expression.contains_aggregate()) {
                aggregate_rows(&evaluator, rows, &items)?
            } else {
                let mut projected = Vec::with_capacity(rows.len());
                for row in rows {
                    let values = items
                        .iter()
                        .map(|item| evaluator.evaluate(&item.expression, &row))
                        .collect::<EngineResult<Vec<_>>>()?;
                    projected.push((values, row));
                }
                projected
            };

        if ret.distinct {
            let mut seen: Vec<Vec<Value>> = Vec::new();
            projected.retain(|(values, _)| {
                if seen.contains(values) {
                    false
                } else {
                    seen.push(values.clone());
                    true
                }
            });
        }

        let mut ordered: Vec<Vec<Value>> = if ret.order_by.is_empty() {
            projected.into_iter().map(|(values, _)| values).collect()
        } else {
            let mut keyed = Vec::with_capacity(projected.len());
            for (values, mut context) in projected {
                for (column, value) in columns.iter().zip(&values) {
                    context.insert(column.clone(), Binding::Value(value.clone()));
                }
                let mut keys = Vec::with_capacity(ret.order_by.len());
                for sort in &ret.order_by {
                    let text = sort.expression.to_string();
                    let key = match columns.iter().position(|c| *c == text) {
                        Some(i) => values[i].clone(),
                        None => evaluator.evaluate(&sort.expression, &context)?,
                    };
                    keys.push(key);
                }
                keyed.push((keys, values));
            }
            keyed.sort_by(|(a, _), (b, _)| {
                for ((x, y), sort) in a.iter().zip(b).zip(&ret.order_by) {
                    let ordering = x.sort_order(y);
                    let ordering = if sort.descending {
                        ordering.reverse()
                    } else {
                        ordering
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
            keyed.into_iter().map(|(_, values)| values).collect()
        };

        let skip = self.row_count(ret.skip.as_ref(), "SKIP")?.unwrap_or(0);
        let limit = self.row_count(ret.limit.as_ref(), "LIMIT")?;
        let ordered_len = ordered.len();
        ordered.drain(..skip.min(ordered_len));
        if let Some(limit) = limit {
            ordered.truncate(limit);
        }

        let rows = ordered
            .into_iter()
            .map(|values| Row::from_positional(values, &columns))
            .collect();
        Ok((columns, rows))
    }

    fn row_count(&self, expression: Option<&Expression>, clause: &str) -> EngineResult<Option<usize>> {
        let Some(expression) = expression else {
            return Ok(None);
        };
        match Evaluator::new(&*self.graph).evaluate(expression, &Bindings::new())? {
            Value::Integer(n) if n >= 0 => Ok(Some(n as usize)),
            other => Err(EngineError::Execution(format!(
                "Invalid input. '{}' is not a valid value for {}. Must be a non-negative integer.",
                other, clause
            ))),
        }
    }
}

/// Group rows by their non-aggregating items and evaluate every item per group.
/// Without grouping keys an empty input still yields one row.
fn aggregate_rows(
    evaluator: &Evaluator<'_>,
    rows: Vec<Bindings>,
    items: &[ReturnItem],
) -> EngineResult<Vec<(Vec<Value>, Bindings)>> {
    let keys: Vec<&ReturnItem> = items
        .iter()
        .filter(|item| !item.expression.contains_aggregate())
        .collect();

    let mut groups: Vec<(Vec<Value>, Vec<Bindings>)> = Vec::new();
    for row in rows {
        let key = keys
            .iter()
            .map(|item| evaluator.evaluate(&item.expression, &row))
            .collect::<EngineResult<Vec<_>>>()?;
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(row),
            None => groups.push((key, vec![row])),
        }
    }
    if groups.is_empty() && keys.is_empty() {
        groups.push((Vec::new(), Vec::new()));
    }

    let mut aggregated = Vec::with_capacity(groups.len());
    for (_, members) in groups {
        let values = items
            .iter()
            .map(|item| evaluator.evaluate_group(&item.expression, &members))
            .collect::<EngineResult<Vec<_>>>()?;
        let context = members.into_iter().next().unwrap_or_default();
        aggregated.push((values, context));
    }
    Ok(aggregated)
}

fn check_storable(value: &Value) -> EngineResult<()> {
    let primitive = |v: &Value| {
        matches!(
            v,
            Value::Null | Value::Boolean(_) | Value::Integer(_) | Value::Float(_) | Value::String(_)
        )
    };
    match value {
        Value::List(items) if items.iter().all(primitive) => Ok(()),
        v if primitive(v) => Ok(()),
        other => Err(EngineError::Execution(format!(
            "Property values can only be of primitive types or arrays thereof, got {}",
            other.type_name()
        ))),
    }
}

/// Read-only pattern matching over a graph
struct Matcher<'g> {
    graph: &'g GraphStore,
    evaluator: Evaluator<'g>,
}

impl<'g> Matcher<'g> {
    fn match_pattern(
        &self,
        pattern: &Pattern,
        row: Bindings,
        out: &mut Vec<Bindings>,
    ) -> EngineResult<()> {
        for start in self.node_candidates(&pattern.start, &row)? {
            let mut bound = row.clone();
            if let Some(variable) = &pattern.start.variable {
                bound.insert(variable.clone(), Binding::Node(start));
            }
            let mut used = Vec::new();
            self.extend(pattern, 0, start, bound, &mut used, out)?;
        }
        Ok(())
    }

    fn extend(
        &self,
        pattern: &Pattern,
        step: usize,
        current: NodeId,
        row: Bindings,
        used: &mut Vec<RelationshipId>,
        out: &mut Vec<Bindings>,
    ) -> EngineResult<()> {
        let Some((rel_pattern, node_pattern)) = pattern.steps.get(step) else {
            out.push(row);
            return Ok(());
        };

        let rel_properties = self.properties(&rel_pattern.properties, &row)?;
        let node_properties = self.properties(&node_pattern.properties, &row)?;
        let bound_rel = match rel_pattern.variable.as_ref().and_then(|v| row.get(v)) {
            None => None,
            Some(Binding::Relationship(id)) => Some(*id),
            Some(_) => {
                return Err(EngineError::Execution(format!(
                    "Variable `{}` already declared as another type",
                    rel_pattern.variable.as_deref().unwrap_or_default()
                )))
            }
        };
        let bound_end = self.bound_node(node_pattern, &row)?;

        let candidates: Vec<(RelationshipId, NodeId)> = self
            .graph
            .relationships_of(current)
            .filter_map(|rel| {
                let other = match rel_pattern.direction {
                    Direction::Outgoing if rel.start == current => rel.end,
                    Direction::Incoming if rel.end == current => rel.start,
                    Direction::Both if rel.start == current => rel.end,
                    Direction::Both => rel.start,
                    _ => return None,
                };
                let type_matches = rel_pattern
                    .rel_type
                    .as_ref()
                    .map_or(true, |t| *t == rel.rel_type);
                let accepted = type_matches
                    && !used.contains(&rel.id)
                    && bound_rel.map_or(true, |id| id == rel.id)
                    && bound_end.map_or(true, |id| id == other)
                    && properties_match(&rel.properties, &rel_properties)
                    && self.graph.node(other).is_some_and(|node| {
                        node_matches(node, &node_pattern.labels, &node_properties)
                    });
                accepted.then_some((rel.id, other))
            })
            .collect();

        for (rel_id, other) in candidates {
            let mut next = row.clone();
            if let Some(variable) = &rel_pattern.variable {
                next.insert(variable.clone(), Binding::Relationship(rel_id));
            }
            if let Some(variable) = &node_pattern.variable {
                next.insert(variable.clone(), Binding::Node(other));
            }
            used.push(rel_id);
            self.extend(pattern, step + 1, other, next, used, out)?;
            used.pop();
        }
        Ok(())
    }

    fn bound_node(&self, pattern: &NodePattern, row: &Bindings) -> EngineResult<Option<NodeId>> {
        let Some(variable) = &pattern.variable else {
            return Ok(None);
        };
        match row.get(variable) {
            None => Ok(None),
            Some(Binding::Node(id)) => Ok(Some(*id)),
            Some(_) => Err(EngineError::Execution(format!(
                "Variable `{}` already declared as another type",
                variable
            ))),
        }
    }

    fn node_candidates(&self, pattern: &NodePattern, row: &Bindings) -> EngineResult<Vec<NodeId>> {
        let properties = self.properties(&pattern.properties, row)?;
        if let Some(id) = self.bound_node(pattern, row)? {
            return Ok(self
                .graph
                .node(id)
                .filter(|node| node_matches(node, &pattern.labels, &properties))
                .map(|node| vec![node.id])
                .unwrap_or_default());
        }
        Ok(self
            .graph
            .nodes()
            .filter(|node| node_matches(node, &pattern.labels, &properties))
            .map(|node| node.id)
            .collect())
    }

    fn properties(
        &self,
        properties: &[(String, Expression)],
        row: &Bindings,
    ) -> EngineResult<Vec<(String, Value)>> {
        properties
            .iter()
            .map(|(key, expression)| Ok((key.clone(), self.evaluator.evaluate(expression, row)?)))
            .collect()
    }
}

fn properties_match(actual: &BTreeMap<String, Value>, expected: &[(String, Value)]) -> bool {
    expected.iter().all(|(key, value)| {
        actual
            .get(key)
            .is_some_and(|actual| actual.equals(value) == Some(true))
    })
}

fn node_matches(node: &Node, labels: &[String], properties: &[(String, Value)]) -> bool {
    labels.iter().all(|label| node.has_label(label)) && properties_match(&node.properties, properties)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse_query;

    struct Fixture {
        graph: GraphStore,
        ids: IdAllocator,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                graph: GraphStore::new(),
                ids: IdAllocator::default(),
            }
        }

        fn run(&mut self, text: &str) -> EngineResult<QueryResult> {
            let query = parse_query(text)?;
            execute_query(&query, &mut self.graph, &self.ids).map(|(result, _)| result)
        }

        fn single(&mut self, text: &str) -> Value {
            let result = self.run(text).unwrap();
            assert_eq!(result.rows.len(), 1, "expected one row from {}", text);
            result.rows[0].positional_values[0].clone()
        }
    }

    #[test]
    fn test_return_literal() {
        let mut fx = Fixture::new();
        let result = fx.run("RETURN 1").unwrap();
        assert_eq!(result.variables, vec!["1".to_string()]);
        assert_eq!(result.rows[0].get_value("1"), Some(&Value::Integer(1)));
        assert!(!result.statistics.contains_updates());
    }

    #[test]
    fn test_create_and_match() {
        let mut fx = Fixture::new();
        let result = fx
            .run("CREATE (n:User {name: 'test', result: 'OK'})")
            .unwrap();
        assert_eq!(result.statistics.nodes_created, 1);
        assert_eq!(result.statistics.labels_added, 1);
        assert_eq!(result.statistics.properties_set, 2);
        assert!(result.variables.is_empty());

        assert_eq!(
            fx.single("MATCH (n:User) WHERE n.name = 'test' RETURN n.result"),
            Value::from("OK")
        );
    }

    #[test]
    fn test_create_returns_created_entities() {
        let mut fx = Fixture::new();
        let result = fx
            .run("CREATE (a:P {n: 1})-[r:KNOWS {since: 2020}]->(b:P {n: 2}) RETURN a.n, r.since, b.n")
            .unwrap();
        assert_eq!(result.statistics.nodes_created, 2);
        assert_eq!(result.statistics.relationships_created, 1);
        assert_eq!(
            result.rows[0].positional_values,
            vec![Value::Integer(1), Value::Integer(2020), Value::Integer(2)]
        );
    }

    #[test]
    fn test_match_directions() {
        let mut fx = Fixture::new();
        fx.run("CREATE (:P {n: 1})-[:R]->(:P {n: 2})").unwrap();
        let out = fx.run("MATCH (a)-[:R]->(b) RETURN a.n, b.n").unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(
            out.rows[0].positional_values,
            vec![Value::Integer(1), Value::Integer(2)]
        );
        assert_eq!(fx.run("MATCH (a)<-[:R]-(b) RETURN a").unwrap().rows.len(), 1);
        assert_eq!(fx.run("MATCH (a)-[:R]-(b) RETURN a").unwrap().rows.len(), 2);
        assert_eq!(fx.run("MATCH (a)-[:OTHER]-(b) RETURN a").unwrap().rows.len(), 0);
    }

    #[test]
    fn test_create_uses_matched_nodes() {
        let mut fx = Fixture::new();
        fx.run("CREATE (:P {n: 1}), (:P {n: 2})").unwrap();
        let out = fx
            .run("MATCH (a:P {n: 1}), (b:P {n: 2}) CREATE (a)-[:R]->(b)")
            .unwrap();
        assert_eq!(out.statistics.nodes_created, 0);
        assert_eq!(out.statistics.relationships_created, 1);
        assert_eq!(fx.graph.node_count(), 2);
    }

    #[test]
    fn test_set_and_remove() {
        let mut fx = Fixture::new();
        fx.run("CREATE (:P {n: 1})").unwrap();
        let out = fx.run("MATCH (p:P) SET p.name = 'x', p:Q RETURN p.name").unwrap();
        assert_eq!(out.statistics.properties_set, 1);
        assert_eq!(out.statistics.labels_added, 1);
        assert_eq!(out.rows[0].positional_values[0], Value::from("x"));

        let out = fx.run("MATCH (p:Q) REMOVE p.name, p:Q").unwrap();
        assert_eq!(out.statistics.properties_set, 1);
        assert_eq!(out.statistics.labels_removed, 1);
        assert_eq!(fx.run("MATCH (p:Q) RETURN p").unwrap().rows.len(), 0);
    }

    #[test]
    fn test_delete_requires_detach() {
        let mut fx = Fixture::new();
        fx.run("CREATE (:P)-[:R]->(:P)").unwrap();
        let err = fx.run("MATCH (n) DELETE n").unwrap_err();
        assert!(err.to_string().contains("still has relationships"));

        let out = fx.run("MATCH (n) DETACH DELETE n").unwrap();
        assert_eq!(out.statistics.nodes_deleted, 2);
        assert_eq!(out.statistics.relationships_deleted, 1);
        assert_eq!(fx.graph.node_count(), 0);
    }

    #[test]
    fn test_delete_relationship_and_nodes_together() {
        let mut fx = Fixture::new();
        fx.run("CREATE (:P)-[:R]->(:P)").unwrap();
        let out = fx.run("MATCH (a)-[r]->(b) DELETE a, r, b").unwrap();
        assert_eq!(out.statistics.nodes_deleted, 2);
        assert_eq!(out.statistics.relationships_deleted, 1);
    }

    #[test]
    fn test_aggregation() {
        let mut fx = Fixture::new();
        assert_eq!(fx.single("MATCH (n) RETURN count(n)"), Value::Integer(0));

        fx.run("CREATE (:P {g: 'a', v: 1}), (:P {g: 'a', v: 2}), (:P {g: 'b', v: 5})")
            .unwrap();
        assert_eq!(fx.single("MATCH (n) RETURN count(*)"), Value::Integer(3));
        assert_eq!(fx.single("MATCH (n) RETURN sum(n.v)"), Value::Integer(8));

        let out = fx
            .run("MATCH (n:P) RETURN n.g AS g, count(n) AS c ORDER BY g")
            .unwrap();
        assert_eq!(out.rows.len(), 2);
        assert_eq!(
            out.rows[0].positional_values,
            vec![Value::from("a"), Value::Integer(2)]
        );
        assert_eq!(
            out.rows[1].positional_values,
            vec![Value::from("b"), Value::Integer(1)]
        );
    }

    #[test]
    fn test_order_skip_limit_distinct() {
        let mut fx = Fixture::new();
        fx.run("CREATE (:P {v: 3}), (:P {v: 1}), (:P {v: 2}), (:P {v: 2})")
            .unwrap();
        let out = fx
            .run("MATCH (n:P) RETURN DISTINCT n.v ORDER BY n.v DESC SKIP 1 LIMIT 1")
            .unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].positional_values[0], Value::Integer(2));
    }

    #[test]
    fn test_return_star_uses_declaration_order() {
        let mut fx = Fixture::new();
        fx.run("CREATE (:P)-[:R]->(:P)").unwrap();
        let out = fx.run("MATCH (b)-[r]->(a) RETURN *").unwrap();
        assert_eq!(out.variables, vec!["b", "r", "a"]);
    }

    #[test]
    fn test_duplicate_columns_are_rejected() {
        let mut fx = Fixture::new();
        assert!(fx.run("RETURN 1, 1").is_err());
    }

    #[test]
    fn test_mutations_replay_to_same_graph() {
        let mut fx = Fixture::new();
        let query = parse_query("CREATE (a:P {n: 1})-[:R]->(b:P) SET b.n = 2").unwrap();
        let (_, mutations) = execute_query(&query, &mut fx.graph, &fx.ids).unwrap();

        let mut replayed = GraphStore::new();
        replayed.apply_all(&mutations);
        assert_eq!(replayed.node_count(), fx.graph.node_count());
        assert_eq!(replayed.relationship_count(), 1);
        assert_eq!(
            replayed.nodes().map(|n| n.properties.clone()).collect::<Vec<_>>(),
            fx.graph.nodes().map(|n| n.properties.clone()).collect::<Vec<_>>()
        );
    }
}
