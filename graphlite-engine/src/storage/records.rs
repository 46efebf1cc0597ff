// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Graph persistence on top of a storage driver
//!
//! Nodes and relationships live in the `nodes` and `relationships` trees,
//! keyed by big-endian id. Each value is a CRC32 of the payload followed by
//! the bincode-encoded entity.

use super::factory::BoxedStorageDriver;
use super::traits::StorageTree;
use super::types::{StorageDriverError, StorageResult, StorageType};
use crate::graph::{GraphStore, Mutation, Node, Relationship};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;

const NODES_TREE: &str = "nodes";
const RELATIONSHIPS_TREE: &str = "relationships";
const CHECKSUM_LEN: usize = 4;

pub(crate) fn encode_record<T: Serialize>(value: &T) -> StorageResult<Vec<u8>> {
    let payload = bincode::serialize(value)?;
    let mut record = Vec::with_capacity(CHECKSUM_LEN + payload.len());
    record.extend_from_slice(&crc32fast::hash(&payload).to_be_bytes());
    record.extend_from_slice(&payload);
    Ok(record)
}

pub(crate) fn decode_record<T: DeserializeOwned>(record: &[u8]) -> StorageResult<T> {
    if record.len() < CHECKSUM_LEN {
        return Err(StorageDriverError::CorruptRecord(format!(
            "record of {} bytes is too short",
            record.len()
        )));
    }
    let (checksum, payload) = record.split_at(CHECKSUM_LEN);
    let mut expected = [0u8; CHECKSUM_LEN];
    expected.copy_from_slice(checksum);
    if crc32fast::hash(payload) != u32::from_be_bytes(expected) {
        return Err(StorageDriverError::CorruptRecord(
            "checksum mismatch".to_string(),
        ));
    }
    bincode::deserialize(payload).map_err(|e| StorageDriverError::CorruptRecord(e.to_string()))
}

/// Reads and writes committed graph state through a storage driver
pub struct GraphPersistence {
    driver: BoxedStorageDriver,
    nodes: Box<dyn StorageTree>,
    relationships: Box<dyn StorageTree>,
}

impl GraphPersistence {
    pub fn new(driver: BoxedStorageDriver) -> StorageResult<Self> {
        let nodes = driver.open_tree(NODES_TREE)?;
        let relationships = driver.open_tree(RELATIONSHIPS_TREE)?;
        Ok(Self {
            driver,
            nodes,
            relationships,
        })
    }

    pub fn storage_type(&self) -> StorageType {
        self.driver.storage_type()
    }

    /// Load the full committed graph
    pub fn load(&self) -> StorageResult<GraphStore> {
        let mut graph = GraphStore::new();
        for entry in self.nodes.scan()? {
            let (_, value) = entry?;
            graph.load_node(decode_record::<Node>(&value)?);
        }
        for entry in self.relationships.scan()? {
            let (_, value) = entry?;
            graph.load_relationship(decode_record::<Relationship>(&value)?);
        }
        log::debug!(
            "loaded {} node(s) and {} relationship(s) from {} storage",
            graph.node_count(),
            graph.relationship_count(),
            self.storage_type()
        );
        Ok(graph)
    }

    /// Write the committed state of every entity touched by `mutations`
    pub fn persist(&self, graph: &GraphStore, mutations: &[Mutation]) -> StorageResult<()> {
        let node_ids: BTreeSet<_> = mutations.iter().filter_map(Mutation::node_id).collect();
        let rel_ids: BTreeSet<_> = mutations
            .iter()
            .filter_map(Mutation::relationship_id)
            .collect();

        let node_writes = node_ids
            .into_iter()
            .map(|id| {
                let record = graph.node(id).map(encode_record).transpose()?;
                Ok((id.to_be_bytes().to_vec(), record))
            })
            .collect::<StorageResult<Vec<_>>>()?;
        let rel_writes = rel_ids
            .into_iter()
            .map(|id| {
                let record = graph.relationship(id).map(encode_record).transpose()?;
                Ok((id.to_be_bytes().to_vec(), record))
            })
            .collect::<StorageResult<Vec<_>>>()?;

        self.nodes.apply(node_writes)?;
        self.relationships.apply(rel_writes)?;
        self.driver.flush()
    }

    pub fn shutdown(&mut self) -> StorageResult<()> {
        self.driver.shutdown()
    }
}
