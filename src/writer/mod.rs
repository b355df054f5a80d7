//! Batch write layer
//!
//! The sole mutator of the graph during ingestion. Every write funnels
//! through the identity maps, which make the end state order-independent:
//! the same external key always resolves to the same node and the same
//! (start, end, type) triple to the same edge, no matter how consumer
//! threads interleave. The layer holds no lock of its own beyond the
//! sharded maps' entry locks, so writers on unrelated entities proceed in
//! parallel.

use crate::graph::{
    Edge, EdgeId, GraphError, GraphResult, GraphStore, Label, Node, NodeId, PropertyValue, RelType,
};
use crate::identity::{EdgeIdentityMap, EdgeKey, NodeIdentityMap};
use crate::index::IndexMirror;
use crate::persistence::{PersistentStorage, StorageError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Name of the property holding a node's external key
pub const IRI_PROPERTY: &str = "iri";

/// Errors surfaced by the write layer
#[derive(Error, Debug)]
pub enum WriteError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type WriteResult<T> = Result<T, WriteError>;

/// A node or an edge, for the property and label operations that apply
/// to both
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef {
    Node(NodeId),
    Edge(EdgeId),
}

impl From<NodeId> for EntityRef {
    fn from(id: NodeId) -> Self {
        EntityRef::Node(id)
    }
}

impl From<EdgeId> for EntityRef {
    fn from(id: EdgeId) -> Self {
        EntityRef::Edge(id)
    }
}

/// Write counters reported in the session summary
#[derive(Debug, Default)]
pub struct WriteCounters {
    nodes_created: AtomicU64,
    edges_created: AtomicU64,
    properties_written: AtomicU64,
}

impl WriteCounters {
    pub fn nodes_created(&self) -> u64 {
        self.nodes_created.load(Ordering::Relaxed)
    }

    pub fn edges_created(&self) -> u64 {
        self.edges_created.load(Ordering::Relaxed)
    }

    pub fn properties_written(&self) -> u64 {
        self.properties_written.load(Ordering::Relaxed)
    }
}

/// Identity-resolving write layer over the graph store
pub struct GraphWriter {
    store: Arc<GraphStore>,
    node_ids: Arc<NodeIdentityMap>,
    edge_ids: Arc<EdgeIdentityMap>,
    mirror: Arc<IndexMirror>,
    storage: Option<Arc<PersistentStorage>>,
    counters: WriteCounters,
}

impl GraphWriter {
    pub fn new(
        store: Arc<GraphStore>,
        node_ids: Arc<NodeIdentityMap>,
        edge_ids: Arc<EdgeIdentityMap>,
        mirror: Arc<IndexMirror>,
        storage: Option<Arc<PersistentStorage>>,
    ) -> Self {
        GraphWriter {
            store,
            node_ids,
            edge_ids,
            mirror,
            storage,
            counters: WriteCounters::default(),
        }
    }

    /// In-memory writer with no mirror configuration, for tests and
    /// single-session tooling
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(GraphStore::new()),
            Arc::new(NodeIdentityMap::new()),
            Arc::new(EdgeIdentityMap::new()),
            Arc::new(IndexMirror::disabled()),
            None,
        )
    }

    pub fn store(&self) -> &Arc<GraphStore> {
        &self.store
    }

    pub fn node_ids(&self) -> &Arc<NodeIdentityMap> {
        &self.node_ids
    }

    pub fn edge_ids(&self) -> &Arc<EdgeIdentityMap> {
        &self.edge_ids
    }

    pub fn mirror(&self) -> &Arc<IndexMirror> {
        &self.mirror
    }

    pub fn counters(&self) -> &WriteCounters {
        &self.counters
    }

    /// Resolve an external key to its node, creating the node on first
    /// sight. The node is inserted before the identity binding becomes
    /// visible, so any thread that resolves the key can address the node.
    pub fn get_or_create_node(&self, key: &str) -> NodeId {
        let (id, created) = self.node_ids.resolve_with(key, |id| {
            let mut node = Node::new(id, key);
            node.set_property(IRI_PROPERTY, key);
            self.store.insert_node(node);
            self.mirror.refresh(id, IRI_PROPERTY, &key.into());
        });
        if created {
            self.counters.nodes_created.fetch_add(1, Ordering::Relaxed);
            debug!(key, id = id.as_u64(), "created node");
        }
        id
    }

    /// Create the `(start, end, rel_type)` edge, or return the existing
    /// one. Idempotent: repeated calls return the same id and leave the
    /// store untouched.
    pub fn create_relationship(
        &self,
        start: NodeId,
        end: NodeId,
        rel_type: impl Into<RelType>,
    ) -> GraphResult<EdgeId> {
        if !self.store.contains_node(start) {
            return Err(GraphError::InvalidEdgeStart(start));
        }
        if !self.store.contains_node(end) {
            return Err(GraphError::InvalidEdgeEnd(end));
        }

        let rel_type = rel_type.into();
        let key = EdgeKey::new(start, end, rel_type.clone());
        let (id, created) = self.edge_ids.get_or_assign_with(key, |id| {
            self.store.insert_edge(Edge::new(id, start, end, rel_type));
        });
        if created {
            self.counters.edges_created.fetch_add(1, Ordering::Relaxed);
        }
        Ok(id)
    }

    /// Create `rel_type` edges between every ordered pair of distinct
    /// nodes, skipping self-pairs. Re-invocation with an overlapping set
    /// creates nothing new.
    pub fn create_relationships_pairwise(
        &self,
        nodes: &[NodeId],
        rel_type: impl Into<RelType>,
    ) -> GraphResult<Vec<EdgeId>> {
        let rel_type = rel_type.into();
        let mut edges = Vec::with_capacity(nodes.len().saturating_sub(1) * nodes.len());
        for &start in nodes {
            for &end in nodes {
                if start == end {
                    continue;
                }
                edges.push(self.create_relationship(start, end, rel_type.clone())?);
            }
        }
        Ok(edges)
    }

    /// Overwrite a property. Ignorable values are dropped without
    /// touching the entity. Mirrored node properties are refreshed in the
    /// same call.
    pub fn set_property(
        &self,
        entity: impl Into<EntityRef>,
        name: &str,
        value: impl Into<PropertyValue>,
    ) -> GraphResult<()> {
        let value = value.into();
        if value.is_ignorable() {
            return Ok(());
        }
        match entity.into() {
            EntityRef::Node(id) => {
                self.store.with_node_mut(id, |node| {
                    node.set_property(name, value.clone());
                })?;
                self.mirror.refresh(id, name, &value);
            }
            EntityRef::Edge(id) => {
                self.store.with_edge_mut(id, |edge| {
                    edge.set_property(name, value);
                })?;
            }
        }
        self.counters
            .properties_written
            .fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Merge a value into a property with the set semantics of
    /// [`PropertyValue::merge`]. The read-modify-write runs inside the
    /// entity's shard lock, so concurrent merges on the same entity never
    /// lose values.
    pub fn add_property(
        &self,
        entity: impl Into<EntityRef>,
        name: &str,
        value: impl Into<PropertyValue>,
    ) -> GraphResult<()> {
        let value = value.into();
        if value.is_ignorable() {
            return Ok(());
        }
        match entity.into() {
            EntityRef::Node(id) => {
                let merged = self.store.with_node_mut(id, |node| {
                    let merged = match node.properties.remove(name) {
                        Some(existing) => existing.merge(value.clone()).0,
                        None => value.clone(),
                    };
                    node.properties.insert(name.to_string(), merged.clone());
                    merged
                })?;
                self.mirror.refresh(id, name, &merged);
            }
            EntityRef::Edge(id) => {
                self.store.with_edge_mut(id, |edge| {
                    let merged = match edge.properties.remove(name) {
                        Some(existing) => existing.merge(value.clone()).0,
                        None => value.clone(),
                    };
                    edge.properties.insert(name.to_string(), merged);
                })?;
            }
        }
        self.counters
            .properties_written
            .fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Replace the entity's label set
    pub fn set_label(&self, entity: impl Into<EntityRef>, label: impl Into<Label>) -> GraphResult<()> {
        let label = label.into();
        match entity.into() {
            EntityRef::Node(id) => self.store.with_node_mut(id, |node| node.set_label(label)),
            EntityRef::Edge(id) => self.store.with_edge_mut(id, |edge| edge.set_label(label)),
        }
    }

    /// Union a label into the entity's label set
    pub fn add_label(&self, entity: impl Into<EntityRef>, label: impl Into<Label>) -> GraphResult<()> {
        let label = label.into();
        match entity.into() {
            EntityRef::Node(id) => self.store.with_node_mut(id, |node| node.add_label(label)),
            EntityRef::Edge(id) => self.store.with_edge_mut(id, |edge| edge.add_label(label)),
        }
    }

    /// Persist the graph, the identity tables and the next-id counters.
    /// No-op for an in-memory writer.
    pub fn flush(&self) -> WriteResult<()> {
        if let Some(storage) = &self.storage {
            storage.persist(&self.store, &self.node_ids, &self.edge_ids)?;
        }
        Ok(())
    }
}
