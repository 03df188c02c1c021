//! The network map's node info cache: a collaborator trait plus an
//! in-memory implementation keyed by legal identity and by content hash.
//!
//! The design leaves persistence to the caller (a disk-backed cache, a
//! database-backed one) by keeping this a trait; [`InMemoryCache`] is the
//! supplemented reference implementation used by the updater's tests and by
//! the `agent` binary when no external store is configured.
use std::collections::HashMap;
use std::sync::RwLock;

use crate::model::NodeInfo;

/// Node info storage keyed by legal identity and by content hash
/// (`getNodeByLegalIdentity`, `getNodeByHash`, `addNode`, `removeNode`,
/// `allNodeHashes`).
pub trait Cache: Send + Sync {
    fn get_node_by_legal_identity(&self, legal_identity: &str) -> Option<NodeInfo>;
    fn get_node_by_hash(&self, hash: &str) -> Option<NodeInfo>;
    fn add_node(&self, node: NodeInfo);
    fn remove_node(&self, legal_identity: &str);
    fn all_node_hashes(&self) -> Vec<String>;
}

/// An in-memory [`Cache`] backed by two maps kept in lockstep under a
/// single [`RwLock`]. Adequate for a single-process network map service;
/// a clustered deployment would replace this with a shared store without
/// changing any caller of the [`Cache`] trait.
#[derive(Default)]
pub struct InMemoryCache {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    by_legal_identity: HashMap<String, String>,
    by_hash: HashMap<String, NodeInfo>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cache for InMemoryCache {
    fn get_node_by_legal_identity(&self, legal_identity: &str) -> Option<NodeInfo> {
        let inner = self.inner.read().expect("cache lock poisoned");
        let hash = inner.by_legal_identity.get(legal_identity)?;
        inner.by_hash.get(hash).cloned()
    }

    fn get_node_by_hash(&self, hash: &str) -> Option<NodeInfo> {
        let inner = self.inner.read().expect("cache lock poisoned");
        inner.by_hash.get(hash).cloned()
    }

    fn add_node(&self, node: NodeInfo) {
        let hash = node.hash();
        let mut inner = self.inner.write().expect("cache lock poisoned");
        inner
            .by_legal_identity
            .insert(node.legal_identity.clone(), hash.clone());
        inner.by_hash.insert(hash, node);
    }

    fn remove_node(&self, legal_identity: &str) {
        let mut inner = self.inner.write().expect("cache lock poisoned");
        if let Some(hash) = inner.by_legal_identity.remove(legal_identity) {
            inner.by_hash.remove(&hash);
        }
    }

    fn all_node_hashes(&self) -> Vec<String> {
        let inner = self.inner.read().expect("cache lock poisoned");
        inner.by_hash.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn node(legal_identity: &str, serial: u64) -> NodeInfo {
        NodeInfo {
            legal_identity: legal_identity.to_owned(),
            addresses: vec!["10.0.0.1:10000".to_owned()],
            platform_version: 7,
            serial,
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn added_node_is_retrievable_by_identity_and_by_hash() {
        let cache = InMemoryCache::new();
        let node = node("O=Alice,L=London,C=GB", 1);
        let hash = node.hash();
        cache.add_node(node.clone());

        assert_eq!(cache.get_node_by_legal_identity(&node.legal_identity), Some(node.clone()));
        assert_eq!(cache.get_node_by_hash(&hash), Some(node));
    }

    #[test]
    fn removing_a_node_drops_it_from_both_indices() {
        let cache = InMemoryCache::new();
        let node = node("O=Bob,L=Paris,C=FR", 1);
        let hash = node.hash();
        cache.add_node(node.clone());

        cache.remove_node(&node.legal_identity);

        assert_eq!(cache.get_node_by_legal_identity(&node.legal_identity), None);
        assert_eq!(cache.get_node_by_hash(&hash), None);
    }

    #[test]
    fn republishing_a_node_replaces_its_old_hash_entry() {
        let cache = InMemoryCache::new();
        let v1 = node("O=Carol,L=Berlin,C=DE", 1);
        let v1_hash = v1.hash();
        cache.add_node(v1);

        let v2 = node("O=Carol,L=Berlin,C=DE", 2);
        cache.add_node(v2.clone());

        assert_eq!(cache.get_node_by_hash(&v1_hash), None);
        assert_eq!(cache.get_node_by_legal_identity(&v2.legal_identity), Some(v2));
    }
}
