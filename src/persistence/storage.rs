//! RocksDB storage layer
//!
//! Holds the graph itself plus everything the identity maps need to
//! survive a process restart: the full key→id tables and the next-id
//! counters. A later ingestion session against the same location
//! continues id allocation where the previous one ended instead of
//! colliding with ids issued in a prior process.

use crate::graph::{Edge, GraphStore, Label, Node, NodeId, PropertyMap, RelType};
use crate::identity::{EdgeIdentityMap, EdgeKey, NodeIdentityMap};
use rocksdb::{ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

const CF_NODES: &str = "nodes";
const CF_EDGES: &str = "edges";
const CF_NODE_IDENTITY: &str = "node_identity";
const CF_EDGE_IDENTITY: &str = "edge_identity";
const CF_META: &str = "meta";

const META_NEXT_NODE_ID: &[u8] = b"next_node_id";
const META_NEXT_EDGE_ID: &[u8] = b"next_edge_id";

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// RocksDB error
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Column family error
    #[error("Column family missing: {0}")]
    ColumnFamily(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Serialized node row
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredNode {
    id: u64,
    key: String,
    labels: Vec<String>,
    properties: Vec<u8>, // Serialized PropertyMap
}

/// Serialized edge row
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEdge {
    id: u64,
    start: u64,
    end: u64,
    rel_type: String,
    labels: Vec<String>,
    properties: Vec<u8>, // Serialized PropertyMap
}

/// RocksDB-backed persistent storage for the graph and identity tables
pub struct PersistentStorage {
    db: DB,
}

impl PersistentStorage {
    /// Open or create storage at a path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "opening graph storage");

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        // Bulk-load tuning: large write buffers, LZ4 throughout
        opts.set_write_buffer_size(64 * 1024 * 1024);
        opts.set_max_write_buffer_number(3);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_NODES, Self::cf_options()),
            ColumnFamilyDescriptor::new(CF_EDGES, Self::cf_options()),
            ColumnFamilyDescriptor::new(CF_NODE_IDENTITY, Self::cf_options()),
            ColumnFamilyDescriptor::new(CF_EDGE_IDENTITY, Self::cf_options()),
            ColumnFamilyDescriptor::new(CF_META, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, cf_descriptors)?;
        Ok(Self { db })
    }

    fn cf_options() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf(&self, name: &str) -> StorageResult<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::ColumnFamily(name.to_string()))
    }

    /// Write the store, identity tables and counters in one batch
    pub fn persist(
        &self,
        store: &GraphStore,
        node_ids: &NodeIdentityMap,
        edge_ids: &EdgeIdentityMap,
    ) -> StorageResult<()> {
        let mut batch = WriteBatch::default();

        let cf_nodes = self.cf(CF_NODES)?;
        let mut result = Ok(());
        store.for_each_node(|node| {
            if result.is_err() {
                return;
            }
            result = encode_node(node).map(|row| {
                batch.put_cf(cf_nodes, node.id.as_u64().to_be_bytes(), row);
            });
        });
        result?;

        let cf_edges = self.cf(CF_EDGES)?;
        let mut result = Ok(());
        store.for_each_edge(|edge| {
            if result.is_err() {
                return;
            }
            result = encode_edge(edge).map(|row| {
                batch.put_cf(cf_edges, edge.id.as_u64().to_be_bytes(), row);
            });
        });
        result?;

        let cf_node_identity = self.cf(CF_NODE_IDENTITY)?;
        node_ids.for_each(|key, id| {
            batch.put_cf(cf_node_identity, key.as_bytes(), id.as_u64().to_be_bytes());
        });

        let cf_edge_identity = self.cf(CF_EDGE_IDENTITY)?;
        let mut result = Ok(());
        edge_ids.for_each(|key, id| {
            if result.is_err() {
                return;
            }
            result = encode_edge_key(key).map(|row| {
                batch.put_cf(cf_edge_identity, row, id.as_u64().to_be_bytes());
            });
        });
        result?;

        let cf_meta = self.cf(CF_META)?;
        batch.put_cf(cf_meta, META_NEXT_NODE_ID, node_ids.next_id().to_be_bytes());
        batch.put_cf(cf_meta, META_NEXT_EDGE_ID, edge_ids.next_id().to_be_bytes());

        self.db.write(batch)?;
        debug!(
            nodes = store.node_count(),
            edges = store.edge_count(),
            "persisted graph"
        );
        Ok(())
    }

    /// Load a persisted session back into an empty store and identity
    /// maps. Returns the number of (nodes, edges) restored.
    pub fn load_into(
        &self,
        store: &GraphStore,
        node_ids: &NodeIdentityMap,
        edge_ids: &EdgeIdentityMap,
    ) -> StorageResult<(usize, usize)> {
        let cf_nodes = self.cf(CF_NODES)?;
        let mut nodes = 0usize;
        for entry in self.db.iterator_cf(cf_nodes, IteratorMode::Start) {
            let (_, value) = entry?;
            store.insert_node(decode_node(&value)?);
            nodes += 1;
        }

        let cf_edges = self.cf(CF_EDGES)?;
        let mut edges = 0usize;
        for entry in self.db.iterator_cf(cf_edges, IteratorMode::Start) {
            let (_, value) = entry?;
            store.insert_edge(decode_edge(&value)?);
            edges += 1;
        }

        let cf_node_identity = self.cf(CF_NODE_IDENTITY)?;
        for entry in self.db.iterator_cf(cf_node_identity, IteratorMode::Start) {
            let (key, value) = entry?;
            let key = String::from_utf8_lossy(&key).into_owned();
            node_ids.restore(key, NodeId::new(decode_u64(&value)));
        }

        let cf_edge_identity = self.cf(CF_EDGE_IDENTITY)?;
        for entry in self.db.iterator_cf(cf_edge_identity, IteratorMode::Start) {
            let (key, value) = entry?;
            edge_ids.restore(decode_edge_key(&key)?, decode_u64(&value).into());
        }

        let cf_meta = self.cf(CF_META)?;
        if let Some(value) = self.db.get_cf(cf_meta, META_NEXT_NODE_ID)? {
            node_ids.set_next_id(decode_u64(&value));
        }
        if let Some(value) = self.db.get_cf(cf_meta, META_NEXT_EDGE_ID)? {
            edge_ids.set_next_id(decode_u64(&value));
        }

        info!(nodes, edges, "restored persisted graph");
        Ok((nodes, edges))
    }
}

fn encode_node(node: &Node) -> StorageResult<Vec<u8>> {
    let stored = StoredNode {
        id: node.id.as_u64(),
        key: node.key.clone(),
        labels: node.labels.iter().map(|l| l.as_str().to_string()).collect(),
        properties: bincode::serialize(&node.properties)?,
    };
    Ok(bincode::serialize(&stored)?)
}

fn decode_node(bytes: &[u8]) -> StorageResult<Node> {
    let stored: StoredNode = bincode::deserialize(bytes)?;
    let properties: PropertyMap = bincode::deserialize(&stored.properties)?;
    let mut node = Node::new(NodeId::new(stored.id), stored.key);
    node.labels = stored.labels.into_iter().map(Label::new).collect();
    node.properties = properties;
    Ok(node)
}

fn encode_edge(edge: &Edge) -> StorageResult<Vec<u8>> {
    let stored = StoredEdge {
        id: edge.id.as_u64(),
        start: edge.start.as_u64(),
        end: edge.end.as_u64(),
        rel_type: edge.rel_type.as_str().to_string(),
        labels: edge.labels.iter().map(|l| l.as_str().to_string()).collect(),
        properties: bincode::serialize(&edge.properties)?,
    };
    Ok(bincode::serialize(&stored)?)
}

fn decode_edge(bytes: &[u8]) -> StorageResult<Edge> {
    let stored: StoredEdge = bincode::deserialize(bytes)?;
    let properties: PropertyMap = bincode::deserialize(&stored.properties)?;
    let mut edge = Edge::new(
        stored.id.into(),
        NodeId::new(stored.start),
        NodeId::new(stored.end),
        stored.rel_type,
    );
    edge.labels = stored.labels.into_iter().map(Label::new).collect();
    edge.properties = properties;
    Ok(edge)
}

fn encode_edge_key(key: &EdgeKey) -> StorageResult<Vec<u8>> {
    Ok(bincode::serialize(&(
        key.start.as_u64(),
        key.end.as_u64(),
        key.rel_type.as_str(),
    ))?)
}

fn decode_edge_key(bytes: &[u8]) -> StorageResult<EdgeKey> {
    let (start, end, rel_type): (u64, u64, String) = bincode::deserialize(bytes)?;
    Ok(EdgeKey::new(
        NodeId::new(start),
        NodeId::new(end),
        RelType::new(rel_type),
    ))
}

fn decode_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_be_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PropertyValue;
    use std::sync::Arc;

    fn sample_graph() -> (Arc<GraphStore>, Arc<NodeIdentityMap>, Arc<EdgeIdentityMap>) {
        let store = Arc::new(GraphStore::new());
        let node_ids = Arc::new(NodeIdentityMap::new());
        let edge_ids = Arc::new(EdgeIdentityMap::new());

        let (a, _) = node_ids.resolve("http://example.org/A");
        let mut node = Node::new(a, "http://example.org/A");
        node.add_label("class");
        node.set_property("label", "Apple");
        store.insert_node(node);

        let (b, _) = node_ids.resolve("http://example.org/B");
        store.insert_node(Node::new(b, "http://example.org/B"));

        let key = EdgeKey::new(a, b, "subClassOf");
        let (eid, _) = edge_ids.get_or_assign(key);
        store.insert_edge(Edge::new(eid, a, b, "subClassOf"));

        (store, node_ids, edge_ids)
    }

    #[test]
    fn test_persist_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (store, node_ids, edge_ids) = sample_graph();

        {
            let storage = PersistentStorage::open(dir.path()).unwrap();
            storage.persist(&store, &node_ids, &edge_ids).unwrap();
        }

        let storage = PersistentStorage::open(dir.path()).unwrap();
        let restored_store = GraphStore::new();
        let restored_node_ids = NodeIdentityMap::new();
        let restored_edge_ids = EdgeIdentityMap::new();
        let (nodes, edges) = storage
            .load_into(&restored_store, &restored_node_ids, &restored_edge_ids)
            .unwrap();

        assert_eq!((nodes, edges), (2, 1));
        assert_eq!(restored_node_ids.next_id(), node_ids.next_id());
        assert_eq!(restored_edge_ids.next_id(), edge_ids.next_id());

        let a = restored_node_ids.get("http://example.org/A").unwrap();
        let node = restored_store.get_node(a).unwrap();
        assert!(node.has_label(&Label::new("class")));
        assert_eq!(
            node.get_property("label"),
            Some(&PropertyValue::from("Apple"))
        );

        // identity continues where the previous session ended
        let (fresh, created) = restored_node_ids.resolve("http://example.org/C");
        assert!(created);
        assert_eq!(fresh.as_u64(), node_ids.next_id());
    }
}
