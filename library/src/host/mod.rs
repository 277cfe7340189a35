//! The boundary to the host application.
//!
//! Every engine operation takes a `&mut dyn HostAdapter` (or `&dyn` for read
//! only queries) explicitly; there is no ambient "current scene". The
//! adapter is assumed non-reentrant, so the engine never calls it from more
//! than one thread.

pub mod memory;

use thiserror::Error;

use crate::model::node::NodeRef;
use crate::model::value::{AttributeValue, Plug};

pub use memory::{MemoryScene, NodeSchema};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    #[error("node {0} does not exist")]
    NoSuchNode(NodeRef),
    #[error("node {node} has no attribute '{attr}'")]
    NoSuchAttribute { node: NodeRef, attr: String },
    #[error("attribute '{attr}' on {node} rejected value: {reason}")]
    Rejected {
        node: NodeRef,
        attr: String,
        reason: String,
    },
    #[error("index {index} is out of range for '{attr}' on {node}")]
    IndexOutOfRange {
        node: NodeRef,
        attr: String,
        index: usize,
    },
    #[error("cannot create node of type '{0}'")]
    Creation(String),
    #[error("host fault: {0}")]
    Fault(String),
}

/// A host input addressed by its stable identifier rather than its label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputEntry {
    /// Identifier that survives UI renames (e.g. Fusion's `INPS_ID`).
    pub id: String,
    /// Attribute the input writes to.
    pub attribute: String,
}

pub trait HostAdapter {
    /// All live nodes of `type_name`, in host order.
    fn list_nodes(&self, type_name: &str) -> Vec<NodeRef>;

    /// Every node in the document.
    fn all_nodes(&self) -> Vec<NodeRef>;

    /// Top-level consumers: the scene-level slots shading networks are
    /// assigned to (objects, render outputs).
    fn scene_roots(&self) -> Vec<NodeRef>;

    fn node_type(&self, node: NodeRef) -> Result<String, HostError>;

    fn node_name(&self, node: NodeRef) -> Result<String, HostError>;

    /// Renames `node`, returning the name the host actually assigned.
    fn rename_node(&mut self, node: NodeRef, new_name: &str) -> Result<String, HostError>;

    fn create_node(
        &mut self,
        type_name: &str,
        secondary_type: Option<&str>,
    ) -> Result<NodeRef, HostError>;

    /// Declared attribute names, in declaration order.
    fn attribute_names(&self, node: NodeRef) -> Result<Vec<String>, HostError>;

    /// Live view of an attribute: a `Connection` when the attribute is driven.
    fn get_attr(&self, node: NodeRef, attr: &str) -> Result<AttributeValue, HostError>;

    /// The stored value underneath any incoming connection.
    fn get_static_attr(&self, node: NodeRef, attr: &str) -> Result<AttributeValue, HostError> {
        self.get_attr(node, attr)
    }

    fn set_attr(
        &mut self,
        node: NodeRef,
        attr: &str,
        value: AttributeValue,
    ) -> Result<(), HostError>;

    /// Upstream outputs driving `attr`; empty if it is not connected.
    fn get_connections(&self, node: NodeRef, attr: &str) -> Result<Vec<Plug>, HostError>;

    fn connect(
        &mut self,
        source: &Plug,
        target_node: NodeRef,
        target_attr: &str,
    ) -> Result<(), HostError>;

    /// Writes one slot of an array attribute.
    ///
    /// The default reads the whole array, replaces the slot and writes it
    /// back through `set_attr`. Adapters whose containers cannot be assigned
    /// wholesale override this with a container-specific bridge.
    fn set_indexed_attr(
        &mut self,
        node: NodeRef,
        attr: &str,
        index: usize,
        value: AttributeValue,
    ) -> Result<(), HostError> {
        let mut items = match self.get_static_attr(node, attr)? {
            AttributeValue::Array(items) => items,
            other => {
                return Err(HostError::Rejected {
                    node,
                    attr: attr.to_string(),
                    reason: format!("expected an array but found {}", other.describe()),
                });
            }
        };
        let slot = items.get_mut(index).ok_or_else(|| HostError::IndexOutOfRange {
            node,
            attr: attr.to_string(),
            index,
        })?;
        *slot = value;
        self.set_attr(node, attr, AttributeValue::Array(items))
    }

    /// Inputs addressable by identifier. Defaults to one entry per attribute.
    fn input_entries(&self, node: NodeRef) -> Result<Vec<InputEntry>, HostError> {
        Ok(self
            .attribute_names(node)?
            .into_iter()
            .map(|name| InputEntry {
                id: name.clone(),
                attribute: name,
            })
            .collect())
    }

    /// Stores opaque metadata on a node (not a graph edge).
    fn set_tag(&mut self, node: NodeRef, key: &str, value: &str) -> Result<(), HostError>;

    fn get_tag(&self, node: NodeRef, key: &str) -> Result<Option<String>, HostError>;
}

/// Read-only view of one node, handed to converters and asset jobs.
#[derive(Clone, Copy)]
pub struct NodeView<'a> {
    host: &'a dyn HostAdapter,
    node: NodeRef,
}

impl<'a> NodeView<'a> {
    pub fn new(host: &'a dyn HostAdapter, node: NodeRef) -> Self {
        Self { host, node }
    }

    pub fn node(&self) -> NodeRef {
        self.node
    }

    pub fn host(&self) -> &'a dyn HostAdapter {
        self.host
    }

    pub fn get(&self, attr: &str) -> Result<AttributeValue, HostError> {
        self.host.get_attr(self.node, attr)
    }

    pub fn get_static(&self, attr: &str) -> Result<AttributeValue, HostError> {
        self.host.get_static_attr(self.node, attr)
    }

    pub fn name(&self) -> Result<String, HostError> {
        self.host.node_name(self.node)
    }

    pub fn type_name(&self) -> Result<String, HostError> {
        self.host.node_type(self.node)
    }
}

impl std::fmt::Debug for NodeView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeView").field("node", &self.node).finish()
    }
}
