//! Concurrent in-memory graph storage
//!
//! Entity maps are sharded (`DashMap`), so writers on unrelated nodes or
//! edges never contend on a common lock. Adjacency and the relationship
//! type index are maintained on edge insert and consumed by the
//! postprocessing passes after ingestion drains.

use super::edge::Edge;
use super::node::Node;
use super::types::{EdgeId, Label, NodeId, RelType};
use dashmap::DashMap;
use thiserror::Error;

/// Errors that can occur during graph operations
#[derive(Error, Debug, PartialEq)]
pub enum GraphError {
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Edge {0} not found")]
    EdgeNotFound(EdgeId),

    #[error("Invalid edge: start node {0} does not exist")]
    InvalidEdgeStart(NodeId),

    #[error("Invalid edge: end node {0} does not exist")]
    InvalidEdgeEnd(NodeId),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Concurrent in-memory graph store
///
/// The store itself performs no identity resolution; callers are expected
/// to allocate ids through the identity maps so that an id is inserted at
/// most once.
#[derive(Debug, Default)]
pub struct GraphStore {
    /// Node storage
    nodes: DashMap<NodeId, Node>,

    /// Edge storage
    edges: DashMap<EdgeId, Edge>,

    /// Outgoing edges for each node (adjacency list)
    outgoing: DashMap<NodeId, Vec<EdgeId>>,

    /// Incoming edges for each node (adjacency list)
    incoming: DashMap<NodeId, Vec<EdgeId>>,

    /// Relationship type index for postprocessing scans
    edge_type_index: DashMap<RelType, Vec<EdgeId>>,
}

impl GraphStore {
    /// Create a new empty graph store
    pub fn new() -> Self {
        GraphStore {
            nodes: DashMap::with_capacity(1024),
            edges: DashMap::with_capacity(4096),
            outgoing: DashMap::with_capacity(1024),
            incoming: DashMap::with_capacity(1024),
            edge_type_index: DashMap::new(),
        }
    }

    /// Insert a node under its pre-allocated id
    pub fn insert_node(&self, node: Node) {
        self.nodes.insert(node.id, node);
    }

    /// Insert an edge under its pre-allocated id, maintaining adjacency
    /// and the type index. Endpoint validation happens in the write
    /// layer, the sole mutator during ingestion.
    pub fn insert_edge(&self, edge: Edge) {
        self.outgoing.entry(edge.start).or_default().push(edge.id);
        self.incoming.entry(edge.end).or_default().push(edge.id);
        self.edge_type_index
            .entry(edge.rel_type.clone())
            .or_default()
            .push(edge.id);
        self.edges.insert(edge.id, edge);
    }

    /// Whether a node id is present
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Clone a node out of the store
    pub fn get_node(&self, id: NodeId) -> Option<Node> {
        self.nodes.get(&id).map(|n| n.value().clone())
    }

    /// Clone an edge out of the store
    pub fn get_edge(&self, id: EdgeId) -> Option<Edge> {
        self.edges.get(&id).map(|e| e.value().clone())
    }

    /// Run a closure against a node without cloning it
    pub fn with_node<R>(&self, id: NodeId, f: impl FnOnce(&Node) -> R) -> Option<R> {
        self.nodes.get(&id).map(|n| f(&n))
    }

    /// Mutate a node in place; the entry's shard stays locked for the
    /// duration of the closure
    pub fn with_node_mut<R>(&self, id: NodeId, f: impl FnOnce(&mut Node) -> R) -> GraphResult<R> {
        match self.nodes.get_mut(&id) {
            Some(mut node) => Ok(f(&mut node)),
            None => Err(GraphError::NodeNotFound(id)),
        }
    }

    /// Mutate an edge in place
    pub fn with_edge_mut<R>(&self, id: EdgeId, f: impl FnOnce(&mut Edge) -> R) -> GraphResult<R> {
        match self.edges.get_mut(&id) {
            Some(mut edge) => Ok(f(&mut edge)),
            None => Err(GraphError::EdgeNotFound(id)),
        }
    }

    /// Outgoing edge ids of a node
    pub fn outgoing(&self, id: NodeId) -> Vec<EdgeId> {
        self.outgoing
            .get(&id)
            .map(|v| v.value().clone())
            .unwrap_or_default()
    }

    /// Incoming edge ids of a node
    pub fn incoming(&self, id: NodeId) -> Vec<EdgeId> {
        self.incoming
            .get(&id)
            .map(|v| v.value().clone())
            .unwrap_or_default()
    }

    /// All edge ids carrying a relationship type
    pub fn edges_with_type(&self, rel_type: &RelType) -> Vec<EdgeId> {
        self.edge_type_index
            .get(rel_type)
            .map(|v| v.value().clone())
            .unwrap_or_default()
    }

    /// Snapshot of all node ids
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|entry| *entry.key()).collect()
    }

    /// Snapshot of all edge ids
    pub fn edge_ids(&self) -> Vec<EdgeId> {
        self.edges.iter().map(|entry| *entry.key()).collect()
    }

    /// Node ids carrying a label
    pub fn nodes_with_label(&self, label: &Label) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|entry| entry.value().labels.contains(label))
            .map(|entry| *entry.key())
            .collect()
    }

    /// Visit every node
    pub fn for_each_node(&self, mut f: impl FnMut(&Node)) {
        for entry in self.nodes.iter() {
            f(entry.value());
        }
    }

    /// Visit every edge
    pub fn for_each_edge(&self, mut f: impl FnMut(&Edge)) {
        for entry in self.edges.iter() {
            f(entry.value());
        }
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
