// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query language tests against a file-backed database

#[path = "testutils/mod.rs"]
mod testutils;

use graphlite_engine::{EngineError, Value};
use testutils::test_fixture::TestFixture;

#[test]
fn test_match_with_where_and_order() {
    let fixture = TestFixture::with_simple_data().expect("Failed to create fixture");

    let names = fixture.column("MATCH (p:Person) WHERE p.age > 26 RETURN p.name ORDER BY p.name");
    assert_eq!(names, vec![Value::from("Alice"), Value::from("Carol")]);
}

#[test]
fn test_multi_hop_pattern() {
    let fixture = TestFixture::with_simple_data().expect("Failed to create fixture");

    let result = fixture
        .query("MATCH (a:Person)-[:KNOWS]->(b)-[:KNOWS]->(c) RETURN a.name, c.name")
        .expect("pattern query should succeed");
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].get_value("a.name"), Some(&Value::from("Alice")));
    assert_eq!(result.rows[0].get_value("c.name"), Some(&Value::from("Carol")));
}

#[test]
fn test_relationship_properties_and_functions() {
    let fixture = TestFixture::with_simple_data().expect("Failed to create fixture");

    let result = fixture
        .query("MATCH (a)-[r:KNOWS]->(b) WHERE r.since < 2020 RETURN type(r) AS t, labels(b) AS l")
        .expect("query should succeed");
    assert_eq!(result.variables, vec!["t", "l"]);
    assert_eq!(result.rows[0].get_value("t"), Some(&Value::from("KNOWS")));
    assert_eq!(
        result.rows[0].get_value("l"),
        Some(&Value::List(vec![Value::from("Person")]))
    );
}

#[test]
fn test_aggregates_over_graph() {
    let fixture = TestFixture::with_simple_data().expect("Failed to create fixture");

    let result = fixture
        .query("MATCH (p:Person) RETURN count(p) AS people, avg(p.age) AS age, collect(p.name) AS names")
        .expect("aggregate query should succeed");
    let row = &result.rows[0];
    assert_eq!(row.get_value("people"), Some(&Value::Integer(3)));
    assert_eq!(row.get_value("age"), Some(&Value::Float(30.0)));
    match row.get_value("names") {
        Some(Value::List(names)) => assert_eq!(names.len(), 3),
        other => panic!("expected a list, got {:?}", other),
    }
}

#[test]
fn test_syntax_errors_report_invalid_input() {
    let fixture = TestFixture::new().expect("Failed to create fixture");

    let err = fixture.db().execute("AZERTYUIOP").unwrap_err();
    assert!(matches!(err, EngineError::Syntax(_)));
    assert!(err.to_string().starts_with("Invalid input"));
}

#[test]
fn test_delete_statistics() {
    let fixture = TestFixture::new().expect("Failed to create fixture");

    let created = fixture.query("CREATE (n:Temp)").unwrap();
    assert_eq!(created.statistics.nodes_created, 1);

    let both = fixture.query("CREATE (n:Temp) DELETE n").unwrap();
    assert_eq!(both.statistics.nodes_created, 1);
    assert_eq!(both.statistics.nodes_deleted, 1);
    assert_eq!(fixture.db().node_count(), 1);
}
