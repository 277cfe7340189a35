//! Repoints the consumers of converted nodes at their replacements.

use std::collections::HashSet;

use log::{debug, info, warn};

use crate::error::RewireFailure;
use crate::graph::outputs::{Consumer, OutputsResolver};
use crate::host::{HostAdapter, HostError};
use crate::model::node::NodeRef;
use crate::model::value::{AttributeValue, Plug};

#[derive(Clone, Debug, PartialEq)]
pub struct CleanupOptions {
    /// Capacity of the outputs memo; 0 re-walks on every query.
    pub cache_capacity: usize,
    /// Also walk from the replacement nodes, so consumers inside freshly
    /// built networks are found before they are attached to the scene.
    pub include_replacements_as_roots: bool,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            cache_capacity: 0,
            include_replacements_as_roots: true,
        }
    }
}

/// One consumer edge that now reads from the replacement node.
#[derive(Clone, Debug, PartialEq)]
pub struct Rewire {
    pub old_node: NodeRef,
    pub new_node: NodeRef,
    pub consumer: Consumer,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CleanupReport {
    pub rewired: Vec<Rewire>,
    pub failures: Vec<RewireFailure>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub fn clean_up(host: &mut dyn HostAdapter, pairs: &[(NodeRef, NodeRef)]) -> CleanupReport {
    clean_up_with(host, pairs, &CleanupOptions::default())
}

pub fn clean_up_with(
    host: &mut dyn HostAdapter,
    pairs: &[(NodeRef, NodeRef)],
    options: &CleanupOptions,
) -> CleanupReport {
    let replaced: Vec<&(NodeRef, NodeRef)> =
        pairs.iter().filter(|(old, new)| old != new).collect();
    let old_nodes: HashSet<NodeRef> = replaced.iter().map(|(old, _)| *old).collect();

    let mut resolver =
        OutputsResolver::new(host.scene_roots()).with_cache(options.cache_capacity);
    if options.include_replacements_as_roots {
        for (_, new) in &replaced {
            resolver.add_root(*new);
        }
    }

    let mut report = CleanupReport::default();
    for &&(old, new) in &replaced {
        for consumer in resolver.outputs(&*host, old) {
            // Old consumers are being replaced themselves; their own
            // replacement already carries the forwarded connection.
            if old_nodes.contains(&consumer.parent) || consumer.parent == new {
                continue;
            }
            match repoint(host, &consumer, new) {
                Ok(()) => {
                    debug!(
                        "cleanup: {}.{} now reads {} instead of {}",
                        consumer.parent, consumer.attribute, new, old
                    );
                    resolver.invalidate();
                    report.rewired.push(Rewire {
                        old_node: old,
                        new_node: new,
                        consumer,
                    });
                }
                Err(cause) => {
                    let failure = RewireFailure {
                        old_node: old,
                        new_node: new,
                        consumer: consumer.parent,
                        attribute: consumer.attribute,
                        index: consumer.index,
                        cause,
                    };
                    warn!("cleanup: {}", failure);
                    report.failures.push(failure);
                }
            }
        }
    }

    info!(
        "cleanup: {} edge(s) rewired, {} failure(s)",
        report.rewired.len(),
        report.failures.len()
    );
    report
}

fn repoint(
    host: &mut dyn HostAdapter,
    consumer: &Consumer,
    new: NodeRef,
) -> Result<(), HostError> {
    let source = Plug {
        node: new,
        channel: consumer.channel.clone(),
    };
    match consumer.index {
        None => host.connect(&source, consumer.parent, &consumer.attribute),
        Some(index) => host.set_indexed_attr(
            consumer.parent,
            &consumer.attribute,
            index,
            AttributeValue::Connection(source),
        ),
    }
}
