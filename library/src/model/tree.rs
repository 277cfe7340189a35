//! Declarative node-tree descriptions consumed by the tree builder.
//!
//! A tree is written as a JSON literal:
//!
//! ```json
//! [
//!   {"type": "ColorCurves", "ref_id": "grade", "input_list": {"EditAlpha": 0.0}},
//!   {"type": "Saver", "attrs": {"TOOLS_Name": "out_png"}, "connected_to": {"ref_id": "grade"}}
//! ]
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, de};

use crate::model::value::AttributeValue;

/// Either a single root or several sibling roots built in order.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(untagged)]
pub enum NodeTree {
    Many(Vec<NodeTreeSpec>),
    One(NodeTreeSpec),
}

impl NodeTree {
    pub fn roots(&self) -> &[NodeTreeSpec] {
        match self {
            NodeTree::Many(specs) => specs,
            NodeTree::One(spec) => std::slice::from_ref(spec),
        }
    }
}

impl From<NodeTreeSpec> for NodeTree {
    fn from(spec: NodeTreeSpec) -> Self {
        NodeTree::One(spec)
    }
}

impl From<Vec<NodeTreeSpec>> for NodeTree {
    fn from(specs: Vec<NodeTreeSpec>) -> Self {
        NodeTree::Many(specs)
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct NodeTreeSpec {
    #[serde(rename = "type")]
    pub node_type: String,
    /// Attributes by name; a nested spec is built and connected as that input.
    #[serde(default, alias = "attr", skip_serializing_if = "IndexMap::is_empty")]
    pub attrs: IndexMap<String, TreeValue>,
    /// Literal values keyed by the host's stable input identifier.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub input_list: IndexMap<String, TreeValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected_to: Option<ConnectedTo>,
}

impl NodeTreeSpec {
    pub fn new(node_type: &str) -> Self {
        Self {
            node_type: node_type.to_string(),
            attrs: IndexMap::new(),
            input_list: IndexMap::new(),
            ref_id: None,
            connected_to: None,
        }
    }

    pub fn attr(mut self, key: &str, value: impl Into<AttributeValue>) -> Self {
        self.attrs
            .insert(key.to_string(), TreeValue::Literal(value.into()));
        self
    }

    pub fn attr_node(mut self, key: &str, spec: NodeTreeSpec) -> Self {
        self.attrs
            .insert(key.to_string(), TreeValue::Node(Box::new(spec)));
        self
    }

    pub fn input(mut self, id: &str, value: impl Into<AttributeValue>) -> Self {
        self.input_list
            .insert(id.to_string(), TreeValue::Literal(value.into()));
        self
    }

    pub fn ref_id(mut self, tag: &str) -> Self {
        self.ref_id = Some(tag.to_string());
        self
    }

    pub fn connected_to_input(mut self, spec: NodeTreeSpec) -> Self {
        self.connected_to = Some(ConnectedTo::Input(Box::new(spec)));
        self
    }

    pub fn connected_to_ref(mut self, tag: &str) -> Self {
        self.connected_to = Some(ConnectedTo::RefId(tag.to_string()));
        self
    }
}

/// Value side of `attrs` / `input_list`.
///
/// An object with a `type` key is a nested spec and must parse as one;
/// everything else is read as a literal.
#[derive(Serialize, Clone, PartialEq, Debug)]
#[serde(untagged)]
pub enum TreeValue {
    Node(Box<NodeTreeSpec>),
    Literal(AttributeValue),
}

impl<'de> Deserialize<'de> for TreeValue {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(d)?;
        if raw.get("type").is_some() {
            return serde_json::from_value::<NodeTreeSpec>(raw)
                .map(|spec| TreeValue::Node(Box::new(spec)))
                .map_err(|err| de::Error::custom(format!("nested node spec: {}", err)));
        }
        AttributeValue::try_from(raw)
            .map(TreeValue::Literal)
            .map_err(de::Error::custom)
    }
}

/// Where the node's primary input comes from.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub enum ConnectedTo {
    #[serde(rename = "Input")]
    Input(Box<NodeTreeSpec>),
    #[serde(rename = "ref_id")]
    RefId(String),
}
