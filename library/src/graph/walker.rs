//! Lazy edge discovery over host attributes.
//!
//! No adjacency list exists anywhere: each step asks the host for a node's
//! declared attributes and inspects their live values. The attribute graph
//! must be a DAG; a cycle makes the walk non-terminating.

use log::{debug, warn};

use crate::host::HostAdapter;
use crate::model::node::{Edge, NodeRef};
use crate::model::value::AttributeValue;

/// Depth-first iterator over every edge reachable upstream of a root.
///
/// Edges are yielded in pre-order: the edge into a child comes before the
/// child's own edges. Walking the same root twice on an unchanged scene
/// yields the same sequence.
pub struct Walker<'a> {
    host: &'a dyn HostAdapter,
    stack: Vec<std::vec::IntoIter<Edge>>,
}

impl<'a> Walker<'a> {
    pub fn new(host: &'a dyn HostAdapter, root: NodeRef) -> Self {
        let first = direct_edges(host, root);
        Self {
            host,
            stack: vec![first.into_iter()],
        }
    }
}

impl Iterator for Walker<'_> {
    type Item = Edge;

    fn next(&mut self) -> Option<Edge> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(edge) => {
                    let below = direct_edges(self.host, edge.child);
                    if !below.is_empty() {
                        self.stack.push(below.into_iter());
                    }
                    return Some(edge);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

pub fn walk(host: &dyn HostAdapter, root: NodeRef) -> Walker<'_> {
    Walker::new(host, root)
}

/// Edges whose parent is `node`, in attribute declaration order.
///
/// A connected attribute yields one edge with no index; an array yields one
/// edge per node-bearing element, indexed by position. Plain scalars yield
/// nothing. Host read failures are logged and the attribute is skipped.
pub fn direct_edges(host: &dyn HostAdapter, node: NodeRef) -> Vec<Edge> {
    let names = match host.attribute_names(node) {
        Ok(names) => names,
        Err(err) => {
            warn!("walker: cannot list attributes of {}: {}", node, err);
            return Vec::new();
        }
    };

    let mut edges = Vec::new();
    for attribute in names {
        let value = match host.get_attr(node, &attribute) {
            Ok(value) => value,
            Err(err) => {
                warn!("walker: cannot read {}.{}: {}", node, attribute, err);
                continue;
            }
        };
        match value {
            AttributeValue::Connection(plug) => edges.push(Edge {
                parent: node,
                attribute,
                child: plug.node,
                index: None,
                channel: plug.channel,
            }),
            AttributeValue::Array(items) => {
                for (index, item) in items.into_iter().enumerate() {
                    if let AttributeValue::Connection(plug) = item {
                        edges.push(Edge {
                            parent: node,
                            attribute: attribute.clone(),
                            child: plug.node,
                            index: Some(index),
                            channel: plug.channel,
                        });
                    }
                }
            }
            AttributeValue::Scalar(_) => {}
        }
    }
    debug!("walker: {} has {} direct edge(s)", node, edges.len());
    edges
}
