// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Persistence and transaction visibility tests

#[path = "testutils/mod.rs"]
mod testutils;

use graphlite_engine::{GraphDatabase, Value};
use testutils::test_fixture::TestFixture;

#[test]
fn test_committed_data_survives_reopen() {
    let mut fixture = TestFixture::with_simple_data().expect("Failed to create fixture");
    fixture
        .query("MATCH (p:Person {name: 'Alice'}) SET p.age = 31")
        .unwrap();

    fixture.reopen().expect("Failed to reopen database");

    assert_eq!(fixture.db().node_count(), 3);
    assert_eq!(fixture.db().relationship_count(), 2);
    assert_eq!(
        fixture.column("MATCH (p:Person {name: 'Alice'}) RETURN p.age"),
        vec![Value::Integer(31)]
    );
}

#[test]
fn test_ids_are_not_reused_after_reopen() {
    let mut fixture = TestFixture::new().expect("Failed to create fixture");
    let first = fixture.column("CREATE (n:A) RETURN id(n)");
    fixture.reopen().expect("Failed to reopen database");
    let second = fixture.column("CREATE (n:B) RETURN id(n)");
    assert_ne!(first, second);
}

#[test]
fn test_deletions_are_persisted() {
    let mut fixture = TestFixture::with_simple_data().expect("Failed to create fixture");
    fixture.query("MATCH (n) DETACH DELETE n").unwrap();
    fixture.reopen().expect("Failed to reopen database");
    assert_eq!(fixture.db().node_count(), 0);
    assert_eq!(fixture.db().relationship_count(), 0);
}

#[test]
fn test_rolled_back_work_is_not_persisted() {
    let mut fixture = TestFixture::new().expect("Failed to create fixture");
    {
        let mut tx = fixture.db().begin_transaction().unwrap();
        tx.execute("CREATE (:Ghost)").unwrap();
        tx.rollback().unwrap();
    }
    fixture.reopen().expect("Failed to reopen database");
    assert_eq!(fixture.db().node_count(), 0);
}

#[test]
fn test_concurrent_writers_commit_in_order() {
    let db = GraphDatabase::open_in_memory().unwrap();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let db = db.clone();
            std::thread::spawn(move || {
                for j in 0..10 {
                    db.execute(&format!("CREATE (:W {{worker: {}, seq: {}}})", i, j))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(db.node_count(), 40);
}
