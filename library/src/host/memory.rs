//! In-memory reference host.
//!
//! Used by the CLI (scenes are JSON files) and by tests. Node types must be
//! registered with a [`NodeSchema`] before `create_node` can instantiate them,
//! and writes are checked against the declared attributes, so it rejects the
//! same mistakes a real host would.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::host::{HostAdapter, HostError, InputEntry};
use crate::model::node::NodeRef;
use crate::model::value::{AttributeValue, Plug};

/// Declared attributes (with defaults) for one node type.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct NodeSchema {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub attributes: IndexMap<String, AttributeValue>,
    /// Stable input identifier -> attribute name.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub input_ids: IndexMap<String, String>,
}

impl NodeSchema {
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            attributes: IndexMap::new(),
            input_ids: IndexMap::new(),
        }
    }

    pub fn attr(mut self, name: &str, default: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.to_string(), default.into());
        self
    }

    pub fn input_id(mut self, id: &str, attribute: &str) -> Self {
        self.input_ids.insert(id.to_string(), attribute.to_string());
        self
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct AttributeSlot {
    pub value: AttributeValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Plug>,
}

impl AttributeSlot {
    pub fn new(value: AttributeValue) -> Self {
        Self { value, input: None }
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct SceneNode {
    pub id: NodeRef,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_type: Option<String>,
    pub name: String,
    #[serde(default)]
    pub attributes: IndexMap<String, AttributeSlot>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Debug)]
pub struct MemoryScene {
    #[serde(default)]
    pub schemas: IndexMap<String, NodeSchema>,
    #[serde(default)]
    pub nodes: IndexMap<NodeRef, SceneNode>,
    #[serde(default)]
    pub roots: Vec<NodeRef>,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    pub fn save(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn register_type(&mut self, schema: NodeSchema) {
        self.schemas.insert(schema.type_name.clone(), schema);
    }

    /// Adds a node directly, with the schema defaults when the type is known.
    pub fn add_node(&mut self, type_name: &str, name: &str) -> NodeRef {
        let id = NodeRef::new();
        let attributes = self
            .schemas
            .get(type_name)
            .map(|schema| {
                schema
                    .attributes
                    .iter()
                    .map(|(k, v)| (k.clone(), AttributeSlot::new(v.clone())))
                    .collect()
            })
            .unwrap_or_default();
        self.nodes.insert(
            id,
            SceneNode {
                id,
                type_name: type_name.to_string(),
                secondary_type: None,
                name: name.to_string(),
                attributes,
                tags: BTreeMap::new(),
            },
        );
        id
    }

    /// Declares (or overwrites) an attribute on an existing node, bypassing
    /// schema checks. Connections in `value` become the slot's live input.
    pub fn declare_attr(
        &mut self,
        node: NodeRef,
        attr: &str,
        value: impl Into<AttributeValue>,
    ) -> Result<(), HostError> {
        let scene_node = self
            .nodes
            .get_mut(&node)
            .ok_or(HostError::NoSuchNode(node))?;
        let slot = match value.into() {
            AttributeValue::Connection(plug) => AttributeSlot {
                value: AttributeValue::from(0.0),
                input: Some(plug),
            },
            other => AttributeSlot::new(other),
        };
        scene_node.attributes.insert(attr.to_string(), slot);
        Ok(())
    }

    pub fn add_root(&mut self, node: NodeRef) {
        if !self.roots.contains(&node) {
            self.roots.push(node);
        }
    }

    pub fn node(&self, node: NodeRef) -> Option<&SceneNode> {
        self.nodes.get(&node)
    }

    pub fn slot(&self, node: NodeRef, attr: &str) -> Option<&AttributeSlot> {
        self.nodes.get(&node)?.attributes.get(attr)
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeRef> {
        self.nodes
            .values()
            .find(|n| n.name == name)
            .map(|n| n.id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn scene_node(&self, node: NodeRef) -> Result<&SceneNode, HostError> {
        self.nodes.get(&node).ok_or(HostError::NoSuchNode(node))
    }

    fn slot_mut(&mut self, node: NodeRef, attr: &str) -> Result<&mut AttributeSlot, HostError> {
        let scene_node = self
            .nodes
            .get_mut(&node)
            .ok_or(HostError::NoSuchNode(node))?;
        scene_node
            .attributes
            .get_mut(attr)
            .ok_or_else(|| HostError::NoSuchAttribute {
                node,
                attr: attr.to_string(),
            })
    }

    fn check_plugs(&self, value: &AttributeValue) -> Result<(), HostError> {
        match value {
            AttributeValue::Connection(plug) => {
                self.scene_node(plug.node)?;
                Ok(())
            }
            AttributeValue::Array(items) => items.iter().try_for_each(|i| self.check_plugs(i)),
            AttributeValue::Scalar(_) => Ok(()),
        }
    }

    /// Shapes `value` to fit the slot's current static value.
    fn fit(
        node: NodeRef,
        attr: &str,
        current: &AttributeValue,
        value: AttributeValue,
    ) -> Result<AttributeValue, HostError> {
        let rejected = |reason: String| HostError::Rejected {
            node,
            attr: attr.to_string(),
            reason,
        };
        match (current, value) {
            (AttributeValue::Scalar(existing), AttributeValue::Scalar(incoming)) => incoming
                .coerce_to(existing.kind())
                .map(AttributeValue::Scalar)
                .ok_or_else(|| {
                    rejected(format!(
                        "cannot store {} in a {} attribute",
                        incoming.kind(),
                        existing.kind()
                    ))
                }),
            (AttributeValue::Array(_), incoming @ AttributeValue::Array(_)) => Ok(incoming),
            (existing, incoming) => Err(rejected(format!(
                "cannot store {} in an attribute holding {}",
                incoming.describe(),
                existing.describe()
            ))),
        }
    }
}

impl HostAdapter for MemoryScene {
    fn list_nodes(&self, type_name: &str) -> Vec<NodeRef> {
        self.nodes
            .values()
            .filter(|n| n.type_name == type_name)
            .map(|n| n.id)
            .collect()
    }

    fn all_nodes(&self) -> Vec<NodeRef> {
        self.nodes.keys().copied().collect()
    }

    fn scene_roots(&self) -> Vec<NodeRef> {
        self.roots.clone()
    }

    fn node_type(&self, node: NodeRef) -> Result<String, HostError> {
        Ok(self.scene_node(node)?.type_name.clone())
    }

    fn node_name(&self, node: NodeRef) -> Result<String, HostError> {
        Ok(self.scene_node(node)?.name.clone())
    }

    fn rename_node(&mut self, node: NodeRef, new_name: &str) -> Result<String, HostError> {
        let scene_node = self
            .nodes
            .get_mut(&node)
            .ok_or(HostError::NoSuchNode(node))?;
        scene_node.name = new_name.to_string();
        Ok(scene_node.name.clone())
    }

    fn create_node(
        &mut self,
        type_name: &str,
        secondary_type: Option<&str>,
    ) -> Result<NodeRef, HostError> {
        if !self.schemas.contains_key(type_name) {
            return Err(HostError::Creation(type_name.to_string()));
        }
        let count = self.list_nodes(type_name).len();
        let id = self.add_node(type_name, &format!("{}{}", type_name, count + 1));
        if let Some(node) = self.nodes.get_mut(&id) {
            node.secondary_type = secondary_type.map(str::to_string);
        }
        Ok(id)
    }

    fn attribute_names(&self, node: NodeRef) -> Result<Vec<String>, HostError> {
        Ok(self.scene_node(node)?.attributes.keys().cloned().collect())
    }

    fn get_attr(&self, node: NodeRef, attr: &str) -> Result<AttributeValue, HostError> {
        let slot = self
            .slot(node, attr)
            .ok_or_else(|| HostError::NoSuchAttribute {
                node,
                attr: attr.to_string(),
            })?;
        Ok(match &slot.input {
            Some(plug) => AttributeValue::Connection(plug.clone()),
            None => slot.value.clone(),
        })
    }

    fn get_static_attr(&self, node: NodeRef, attr: &str) -> Result<AttributeValue, HostError> {
        self.slot(node, attr)
            .map(|slot| slot.value.clone())
            .ok_or_else(|| HostError::NoSuchAttribute {
                node,
                attr: attr.to_string(),
            })
    }

    fn set_attr(
        &mut self,
        node: NodeRef,
        attr: &str,
        value: AttributeValue,
    ) -> Result<(), HostError> {
        if let AttributeValue::Connection(plug) = &value {
            return self.connect(plug, node, attr);
        }
        self.check_plugs(&value)?;
        let slot = self.slot_mut(node, attr)?;
        let fitted = Self::fit(node, attr, &slot.value, value)?;
        slot.value = fitted;
        slot.input = None;
        Ok(())
    }

    fn get_connections(&self, node: NodeRef, attr: &str) -> Result<Vec<Plug>, HostError> {
        let slot = self
            .slot(node, attr)
            .ok_or_else(|| HostError::NoSuchAttribute {
                node,
                attr: attr.to_string(),
            })?;
        Ok(slot.input.iter().cloned().collect())
    }

    fn connect(
        &mut self,
        source: &Plug,
        target_node: NodeRef,
        target_attr: &str,
    ) -> Result<(), HostError> {
        self.scene_node(source.node)?;
        if source.node == target_node {
            return Err(HostError::Rejected {
                node: target_node,
                attr: target_attr.to_string(),
                reason: "cannot connect a node to itself".to_string(),
            });
        }
        let slot = self.slot_mut(target_node, target_attr)?;
        slot.input = Some(source.clone());
        Ok(())
    }

    fn set_indexed_attr(
        &mut self,
        node: NodeRef,
        attr: &str,
        index: usize,
        value: AttributeValue,
    ) -> Result<(), HostError> {
        self.check_plugs(&value)?;
        let slot = self.slot_mut(node, attr)?;
        let items = match &mut slot.value {
            AttributeValue::Array(items) => items,
            other => {
                return Err(HostError::Rejected {
                    node,
                    attr: attr.to_string(),
                    reason: format!("expected an array but found {}", other.describe()),
                });
            }
        };
        let element = items.get_mut(index).ok_or_else(|| HostError::IndexOutOfRange {
            node,
            attr: attr.to_string(),
            index,
        })?;
        *element = value;
        Ok(())
    }

    fn input_entries(&self, node: NodeRef) -> Result<Vec<InputEntry>, HostError> {
        let scene_node = self.scene_node(node)?;
        let mapped = self
            .schemas
            .get(&scene_node.type_name)
            .map(|schema| &schema.input_ids)
            .filter(|ids| !ids.is_empty());
        Ok(match mapped {
            Some(ids) => ids
                .iter()
                .filter(|(_, attr)| scene_node.attributes.contains_key(*attr))
                .map(|(id, attr)| InputEntry {
                    id: id.clone(),
                    attribute: attr.clone(),
                })
                .collect(),
            None => scene_node
                .attributes
                .keys()
                .map(|name| InputEntry {
                    id: name.clone(),
                    attribute: name.clone(),
                })
                .collect(),
        })
    }

    fn set_tag(&mut self, node: NodeRef, key: &str, value: &str) -> Result<(), HostError> {
        let scene_node = self
            .nodes
            .get_mut(&node)
            .ok_or(HostError::NoSuchNode(node))?;
        scene_node.tags.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_tag(&self, node: NodeRef, key: &str) -> Result<Option<String>, HostError> {
        Ok(self.scene_node(node)?.tags.get(key).cloned())
    }
}
