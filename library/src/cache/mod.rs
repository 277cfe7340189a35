use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use crate::graph::outputs::Consumer;
use crate::model::node::NodeRef;

/// Memo of outputs queries, keyed by the queried node.
///
/// Any rewire may change every answer, so callers clear the whole cache
/// after a successful write rather than invalidating single keys.
pub struct OutputsCache {
    entries: Mutex<LruCache<NodeRef, Vec<Consumer>>>,
}

impl OutputsCache {
    /// Returns `None` for a zero capacity, which disables memoisation.
    pub fn new(capacity: usize) -> Option<Self> {
        let capacity = NonZeroUsize::new(capacity)?;
        Some(Self {
            entries: Mutex::new(LruCache::new(capacity)),
        })
    }

    pub fn get(&self, node: NodeRef) -> Option<Vec<Consumer>> {
        self.lock().get(&node).cloned()
    }

    pub fn put(&self, node: NodeRef, consumers: &[Consumer]) {
        self.lock().put(node, consumers.to_vec());
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<NodeRef, Vec<Consumer>>> {
        // A panic while holding the lock leaves only stale memo entries.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_disables_cache() {
        assert!(OutputsCache::new(0).is_none());
    }

    #[test]
    fn test_put_get_clear() {
        let cache = OutputsCache::new(2).unwrap();
        let node = NodeRef::new();
        let consumer = Consumer {
            parent: NodeRef::new(),
            attribute: "surfaceShader".into(),
            index: None,
            channel: None,
        };
        cache.put(node, std::slice::from_ref(&consumer));
        assert_eq!(cache.get(node), Some(vec![consumer]));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(node), None);
    }

    #[test]
    fn test_least_recently_used_is_evicted() {
        let cache = OutputsCache::new(1).unwrap();
        let first = NodeRef::new();
        let second = NodeRef::new();
        cache.put(first, &[]);
        cache.put(second, &[]);
        assert_eq!(cache.get(first), None);
        assert_eq!(cache.get(second), Some(vec![]));
    }
}
