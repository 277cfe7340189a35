//! Reverse lookup: who consumes a node.

use indexmap::IndexSet;
use log::debug;

use crate::cache::OutputsCache;
use crate::host::HostAdapter;
use crate::model::node::NodeRef;
use crate::graph::walker::walk;

/// One attachment point that currently reads from the queried node.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Consumer {
    pub parent: NodeRef,
    pub attribute: String,
    pub index: Option<usize>,
    /// Output channel of the queried node that the consumer reads.
    pub channel: Option<String>,
}

/// Answers outputs queries by re-walking from a fixed set of roots.
///
/// Without a cache every query is a full walk from every root.
pub struct OutputsResolver {
    roots: Vec<NodeRef>,
    cache: Option<OutputsCache>,
}

impl OutputsResolver {
    pub fn new(roots: Vec<NodeRef>) -> Self {
        Self { roots, cache: None }
    }

    /// Roots are the host's scene roots.
    pub fn for_scene(host: &dyn HostAdapter) -> Self {
        Self::new(host.scene_roots())
    }

    pub fn with_cache(mut self, capacity: usize) -> Self {
        self.cache = OutputsCache::new(capacity);
        self
    }

    pub fn add_root(&mut self, root: NodeRef) {
        if !self.roots.contains(&root) {
            self.roots.push(root);
        }
    }

    pub fn roots(&self) -> &[NodeRef] {
        &self.roots
    }

    /// Every consumer edge whose child is `node`, deduplicated, in walk order.
    pub fn outputs(&self, host: &dyn HostAdapter, node: NodeRef) -> Vec<Consumer> {
        if let Some(hit) = self.cache.as_ref().and_then(|cache| cache.get(node)) {
            debug!("outputs: cache hit for {}", node);
            return hit;
        }

        let mut found = IndexSet::new();
        for &root in &self.roots {
            for edge in walk(host, root).filter(|edge| edge.child == node) {
                found.insert(Consumer {
                    parent: edge.parent,
                    attribute: edge.attribute,
                    index: edge.index,
                    channel: edge.channel,
                });
            }
        }
        let consumers: Vec<Consumer> = found.into_iter().collect();
        debug!("outputs: {} has {} consumer(s)", node, consumers.len());

        if let Some(cache) = &self.cache {
            cache.put(node, &consumers);
        }
        consumers
    }

    /// Drops memoised answers; call after any change to the scene graph.
    pub fn invalidate(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }
}

/// One-shot outputs query from the host's scene roots.
pub fn outputs(host: &dyn HostAdapter, node: NodeRef) -> Vec<Consumer> {
    OutputsResolver::for_scene(host).outputs(host, node)
}
