//! Provenance graph reconstruction using petgraph.
//!
//! The graph is a read projection of the record store: nodes are cache
//! records, and an edge `producer -> consumer` exists when one of the
//! consumer's input references names the producer (by identifier, or by
//! action name). Inputs that match no record are kept as unresolved
//! references; a pruned or partial store still yields a usable graph.

use crate::cache::CacheRecord;
use crate::error::{ProvcacheError, ProvcacheResult};
use crate::store::RecordStore;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef, Reversed};
use petgraph::Direction;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// An input reference with no producing record in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedInput {
    /// Identifier of the consuming record
    pub consumer: String,
    /// Input parameter name on the consumer
    pub parameter: String,
    /// The reference that matched nothing
    pub reference: String,
}

/// Provenance DAG over cache records
#[derive(Debug)]
pub struct ProvenanceGraph {
    /// Edge weight is the consumer's input parameter name.
    graph: DiGraph<CacheRecord, String>,
    by_identifier: HashMap<String, NodeIndex>,
    /// Latest record inserted under each action name.
    by_name: HashMap<String, NodeIndex>,
    unresolved: Vec<UnresolvedInput>,
}

/// Read every record from `store` and build the graph
pub fn build_graph<S: RecordStore + ?Sized>(store: &S) -> ProvcacheResult<ProvenanceGraph> {
    Ok(ProvenanceGraph::from_records(store.records()?))
}

impl ProvenanceGraph {
    /// Build from records in insertion order
    ///
    /// References resolve only against records inserted before the
    /// consumer, so every edge points forward in insertion order and the
    /// graph is acyclic.
    pub fn from_records(records: Vec<CacheRecord>) -> Self {
        let mut graph: DiGraph<CacheRecord, String> = DiGraph::new();
        let mut by_identifier: HashMap<String, NodeIndex> = HashMap::new();
        let mut by_name: HashMap<String, NodeIndex> = HashMap::new();
        let mut unresolved = Vec::new();

        for record in records {
            let mut edges = Vec::new();
            for (parameter, reference) in &record.inputs {
                match by_identifier
                    .get(reference)
                    .or_else(|| by_name.get(reference))
                {
                    Some(&producer) => edges.push((producer, parameter.clone())),
                    None => unresolved.push(UnresolvedInput {
                        consumer: record.identifier.clone(),
                        parameter: parameter.clone(),
                        reference: reference.clone(),
                    }),
                }
            }

            let identifier = record.identifier.clone();
            let name = record.name.clone();
            let consumer = graph.add_node(record);
            for (producer, parameter) in edges {
                graph.add_edge(producer, consumer, parameter);
            }
            by_identifier.insert(identifier, consumer);
            by_name.insert(name, consumer);
        }

        debug!(
            "Built provenance graph: {} nodes, {} edges, {} unresolved inputs",
            graph.node_count(),
            graph.edge_count(),
            unresolved.len()
        );

        Self {
            graph,
            by_identifier,
            by_name,
            unresolved,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Inputs that could not be linked to a producing record
    pub fn unresolved(&self) -> &[UnresolvedInput] {
        &self.unresolved
    }

    /// Look up a record by identifier or action name
    pub fn get(&self, key: &str) -> Option<&CacheRecord> {
        self.index_of(key).map(|idx| &self.graph[idx])
    }

    /// Records with no resolved upstream producer
    pub fn roots(&self) -> Vec<&CacheRecord> {
        self.graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|idx| &self.graph[idx])
            .collect()
    }

    /// `(producer, consumer, parameter)` identifier triples
    pub fn edges(&self) -> Vec<(&str, &str, &str)> {
        self.graph
            .edge_references()
            .map(|edge| {
                (
                    self.graph[edge.source()].identifier.as_str(),
                    self.graph[edge.target()].identifier.as_str(),
                    edge.weight().as_str(),
                )
            })
            .collect()
    }

    /// Every record the given record transitively depends on
    pub fn upstream(&self, key: &str) -> ProvcacheResult<Vec<&CacheRecord>> {
        let start = self.require(key)?;
        let reversed = Reversed(&self.graph);
        let mut dfs = Dfs::new(reversed, start);
        let mut found = Vec::new();
        while let Some(idx) = dfs.next(reversed) {
            if idx != start {
                found.push(&self.graph[idx]);
            }
        }
        Ok(found)
    }

    /// Every record that transitively consumes the given record
    pub fn downstream(&self, key: &str) -> ProvcacheResult<Vec<&CacheRecord>> {
        let start = self.require(key)?;
        let mut dfs = Dfs::new(&self.graph, start);
        let mut found = Vec::new();
        while let Some(idx) = dfs.next(&self.graph) {
            if idx != start {
                found.push(&self.graph[idx]);
            }
        }
        Ok(found)
    }

    /// The record and all its ancestors, producers first
    pub fn lineage(&self, key: &str) -> ProvcacheResult<Vec<&CacheRecord>> {
        let target = self.require(key)?;
        let mut members: Vec<NodeIndex> = {
            let reversed = Reversed(&self.graph);
            let mut dfs = Dfs::new(reversed, target);
            std::iter::from_fn(|| dfs.next(reversed)).collect()
        };

        let order = self.topological_indices()?;
        let position: HashMap<NodeIndex, usize> =
            order.iter().enumerate().map(|(i, &idx)| (idx, i)).collect();
        members.sort_by_key(|idx| position[idx]);

        Ok(members.into_iter().map(|idx| &self.graph[idx]).collect())
    }

    /// All records, producers before consumers
    pub fn topological_order(&self) -> ProvcacheResult<Vec<&CacheRecord>> {
        Ok(self
            .topological_indices()?
            .into_iter()
            .map(|idx| &self.graph[idx])
            .collect())
    }

    fn topological_indices(&self) -> ProvcacheResult<Vec<NodeIndex>> {
        toposort(&self.graph, None).map_err(|cycle| {
            ProvcacheError::CorruptRecord {
                identifier: self.graph[cycle.node_id()].identifier.clone(),
                reason: "record is part of a provenance cycle".to_string(),
            }
        })
    }

    fn index_of(&self, key: &str) -> Option<NodeIndex> {
        self.by_identifier
            .get(key)
            .or_else(|| self.by_name.get(key))
            .copied()
    }

    fn require(&self, key: &str) -> ProvcacheResult<NodeIndex> {
        self.index_of(key)
            .ok_or_else(|| ProvcacheError::RecordNotFound(key.to_string()))
    }
}
