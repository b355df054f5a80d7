//! Identity maps: idempotent key→id assignment
//!
//! The maps are the single source of truth for id allocation during
//! ingestion. Both are sharded concurrent maps, so concurrent resolution
//! of unrelated keys never serializes; concurrent resolution of the same
//! unseen key converges on exactly one id because allocation happens
//! inside the owning shard's entry lock.
//!
//! For multi-session loads the full key→id table and the next-id counter
//! are persisted through the store (see `persistence`) and loaded back
//! with [`NodeIdentityMap::restore`] / [`EdgeIdentityMap::restore`].

use crate::graph::{EdgeId, NodeId, RelType};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of an edge: direction-sensitive (start, end, type) triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeKey {
    pub start: NodeId,
    pub end: NodeId,
    pub rel_type: RelType,
}

impl EdgeKey {
    pub fn new(start: NodeId, end: NodeId, rel_type: impl Into<RelType>) -> Self {
        EdgeKey {
            start,
            end,
            rel_type: rel_type.into(),
        }
    }
}

/// Concurrent external-key → NodeId map with idempotent allocation
#[derive(Debug, Default)]
pub struct NodeIdentityMap {
    ids: DashMap<String, NodeId>,
    next_id: AtomicU64,
}

impl NodeIdentityMap {
    pub fn new() -> Self {
        NodeIdentityMap {
            ids: DashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }

    /// Resolve a key to its id, allocating the next counter value for an
    /// unseen key. Returns the id and whether it was newly assigned.
    ///
    /// Concurrent callers racing on the same unseen key are serialized by
    /// the shard lock: exactly one allocates, the rest observe its id.
    pub fn resolve(&self, key: &str) -> (NodeId, bool) {
        self.resolve_with(key, |_| {})
    }

    /// Like [`resolve`](Self::resolve), running `init` with the fresh id
    /// before the binding becomes visible to other callers. Anything
    /// `init` publishes (such as the node itself) is therefore observable
    /// by every thread that can observe the binding.
    pub fn resolve_with(&self, key: &str, init: impl FnOnce(NodeId)) -> (NodeId, bool) {
        if let Some(existing) = self.ids.get(key) {
            return (*existing, false);
        }
        match self.ids.entry(key.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => (*entry.get(), false),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                let id = NodeId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
                init(id);
                entry.insert(id);
                (id, true)
            }
        }
    }

    /// Resolve a key to its id, allocating if unseen.
    pub fn id_for(&self, key: &str) -> NodeId {
        self.resolve(key).0
    }

    /// Look up a key without allocating
    pub fn get(&self, key: &str) -> Option<NodeId> {
        self.ids.get(key).map(|id| *id)
    }

    /// Restore a binding from a persisted table. Keeps the counter above
    /// every restored id.
    pub fn restore(&self, key: String, id: NodeId) {
        self.next_id.fetch_max(id.as_u64() + 1, Ordering::Relaxed);
        self.ids.insert(key, id);
    }

    /// Value the counter would assign next
    pub fn next_id(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed)
    }

    /// Override the counter (used when reopening a persisted session)
    pub fn set_next_id(&self, next: u64) {
        self.next_id.fetch_max(next, Ordering::Relaxed);
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Visit every binding (used by persistence)
    pub fn for_each(&self, mut f: impl FnMut(&str, NodeId)) {
        for entry in self.ids.iter() {
            f(entry.key(), *entry.value());
        }
    }
}

/// Concurrent EdgeKey → EdgeId map with idempotent allocation
#[derive(Debug, Default)]
pub struct EdgeIdentityMap {
    ids: DashMap<EdgeKey, EdgeId>,
    next_id: AtomicU64,
}

impl EdgeIdentityMap {
    pub fn new() -> Self {
        EdgeIdentityMap {
            ids: DashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }

    /// Whether the triple already has an edge
    pub fn contains(&self, key: &EdgeKey) -> bool {
        self.ids.contains_key(key)
    }

    /// Look up without allocating
    pub fn get(&self, key: &EdgeKey) -> Option<EdgeId> {
        self.ids.get(key).map(|id| *id)
    }

    /// Check-then-act under the shard lock: returns the existing id, or
    /// allocates a fresh one. The boolean reports whether this call won
    /// the allocation, so exactly one caller creates the underlying edge.
    pub fn get_or_assign(&self, key: EdgeKey) -> (EdgeId, bool) {
        self.get_or_assign_with(key, |_| {})
    }

    /// Like [`get_or_assign`](Self::get_or_assign), running `init` with
    /// the fresh id before the binding becomes visible to other callers.
    pub fn get_or_assign_with(&self, key: EdgeKey, init: impl FnOnce(EdgeId)) -> (EdgeId, bool) {
        if let Some(existing) = self.ids.get(&key) {
            return (*existing, false);
        }
        match self.ids.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(entry) => (*entry.get(), false),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                let id = EdgeId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
                init(id);
                entry.insert(id);
                (id, true)
            }
        }
    }

    /// Restore a binding from a persisted table
    pub fn restore(&self, key: EdgeKey, id: EdgeId) {
        self.next_id.fetch_max(id.as_u64() + 1, Ordering::Relaxed);
        self.ids.insert(key, id);
    }

    /// Value the counter would assign next
    pub fn next_id(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed)
    }

    /// Override the counter (used when reopening a persisted session)
    pub fn set_next_id(&self, next: u64) {
        self.next_id.fetch_max(next, Ordering::Relaxed);
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Visit every binding (used by persistence)
    pub fn for_each(&self, mut f: impl FnMut(&EdgeKey, EdgeId)) {
        for entry in self.ids.iter() {
            f(entry.key(), *entry.value());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_node_ids_are_stable_and_increasing() {
        let map = NodeIdentityMap::new();
        let (a, created_a) = map.resolve("http://example.org/A");
        let (b, created_b) = map.resolve("http://example.org/B");
        assert!(created_a && created_b);
        assert_eq!(a, NodeId::new(0));
        assert_eq!(b, NodeId::new(1));

        let (a2, created) = map.resolve("http://example.org/A");
        assert!(!created);
        assert_eq!(a, a2);
    }

    #[test]
    fn test_concurrent_resolution_converges() {
        let map = Arc::new(NodeIdentityMap::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let map = Arc::clone(&map);
            handles.push(thread::spawn(move || {
                let mut ids = Vec::new();
                for i in 0..1000 {
                    ids.push(map.id_for(&format!("http://example.org/{}", i % 100)));
                }
                ids
            }));
        }
        let results: Vec<Vec<NodeId>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        // every thread saw the same id for the same key
        for ids in &results[1..] {
            assert_eq!(ids, &results[0]);
        }
        // 100 distinct keys, 100 distinct ids, all below the counter
        assert_eq!(map.len(), 100);
        assert_eq!(map.next_id(), 100);
    }

    #[test]
    fn test_edge_identity_direction_sensitive() {
        let map = EdgeIdentityMap::new();
        let ab = EdgeKey::new(NodeId::new(0), NodeId::new(1), "knows");
        let ba = EdgeKey::new(NodeId::new(1), NodeId::new(0), "knows");

        let (id_ab, fresh_ab) = map.get_or_assign(ab.clone());
        let (id_ba, fresh_ba) = map.get_or_assign(ba);
        assert!(fresh_ab && fresh_ba);
        assert_ne!(id_ab, id_ba);

        let (again, fresh) = map.get_or_assign(ab);
        assert!(!fresh);
        assert_eq!(again, id_ab);
    }

    #[test]
    fn test_restore_advances_counter() {
        let map = NodeIdentityMap::new();
        map.restore("http://example.org/A".to_string(), NodeId::new(41));
        let (id, created) = map.resolve("http://example.org/B");
        assert!(created);
        assert_eq!(id, NodeId::new(42));
        assert_eq!(map.get("http://example.org/A"), Some(NodeId::new(41)));
    }
}
