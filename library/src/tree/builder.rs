use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{BuildFailure, UnresolvedReference};
use crate::host::{HostAdapter, HostError};
use crate::model::node::NodeRef;
use crate::model::tree::{ConnectedTo, NodeTree, NodeTreeSpec, TreeValue};
use crate::model::value::Plug;

pub const DEFAULT_TAG_KEY: &str = "ref_id";
pub const DEFAULT_PRIMARY_INPUT: &str = "Input";

/// Where `connected_to.ref_id` looks for its producer.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TagScope {
    /// Only nodes tagged by the current `build` call.
    #[default]
    Build,
    /// Any node in the document carrying the tag, built now or earlier.
    Document,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BuilderOptions {
    pub tag_scope: TagScope,
    /// Retry unresolved references once the whole tree exists, so a
    /// consumer may be written before its producer.
    pub deferred_references: bool,
    /// Attribute that `connected_to` feeds.
    pub primary_input: String,
    /// Metadata key the `ref_id` is stored under.
    pub tag_key: String,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            tag_scope: TagScope::default(),
            deferred_references: true,
            primary_input: DEFAULT_PRIMARY_INPUT.to_string(),
            tag_key: DEFAULT_TAG_KEY.to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BuildOutput {
    /// One node per top-level spec, in order.
    pub roots: Vec<NodeRef>,
    /// Every node created, in creation order.
    pub created: Vec<NodeRef>,
    /// Tags issued by this build.
    pub tags: IndexMap<String, NodeRef>,
    pub unresolved: Vec<UnresolvedReference>,
    pub failures: Vec<BuildFailure>,
}

impl BuildOutput {
    pub fn root(&self) -> Option<NodeRef> {
        self.roots.first().copied()
    }

    pub fn tagged(&self, tag: &str) -> Option<NodeRef> {
        self.tags.get(tag).copied()
    }

    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty() && self.failures.is_empty()
    }
}

/// Builds node networks from [`NodeTree`] descriptions.
#[derive(Clone, Debug, Default)]
pub struct TreeBuilder {
    options: BuilderOptions,
}

impl TreeBuilder {
    pub fn new(options: BuilderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &BuilderOptions {
        &self.options
    }

    /// Builds every root of `tree`.
    ///
    /// A host fault while creating a node aborts the build; nodes created
    /// before the fault stay in the scene. Everything else (attribute
    /// writes, connections, references) is recorded in the output.
    pub fn build(
        &self,
        host: &mut dyn HostAdapter,
        tree: &NodeTree,
    ) -> Result<BuildOutput, HostError> {
        let mut state = BuildState::default();
        for spec in tree.roots() {
            let root = self.build_spec(host, spec, &mut state)?;
            state.out.roots.push(root);
        }

        for (node, tag) in std::mem::take(&mut state.deferred) {
            match self.resolve(&*host, &state.out, &tag, node) {
                Some(source) => {
                    debug!("builder: deferred ref '{}' resolved to {}", tag, source);
                    self.connect_primary(host, source, node, &mut state.out);
                }
                None => state.unresolved(node, tag),
            }
        }

        info!(
            "builder: created {} node(s), {} unresolved reference(s), {} failure(s)",
            state.out.created.len(),
            state.out.unresolved.len(),
            state.out.failures.len()
        );
        Ok(state.out)
    }

    fn build_spec(
        &self,
        host: &mut dyn HostAdapter,
        spec: &NodeTreeSpec,
        state: &mut BuildState,
    ) -> Result<NodeRef, HostError> {
        let node = host.create_node(&spec.node_type, None)?;
        state.out.created.push(node);
        debug!("builder: created {} ({})", node, spec.node_type);

        for (key, value) in &spec.attrs {
            self.assign(host, node, key, key, value, state)?;
        }

        if !spec.input_list.is_empty() {
            let entries = host.input_entries(node);
            for (id, value) in &spec.input_list {
                let attribute = match &entries {
                    Ok(entries) => entries
                        .iter()
                        .find(|entry| &entry.id == id)
                        .map(|entry| entry.attribute.clone())
                        .ok_or_else(|| HostError::NoSuchAttribute {
                            node,
                            attr: id.clone(),
                        }),
                    Err(err) => Err(err.clone()),
                };
                match attribute {
                    Ok(attribute) => self.assign(host, node, id, &attribute, value, state)?,
                    Err(cause) => state.failed(node, id, cause),
                }
            }
        }

        if let Some(tag) = &spec.ref_id {
            if let Err(cause) = host.set_tag(node, &self.options.tag_key, tag) {
                state.failed(node, &self.options.tag_key, cause);
            }
            if let Some(previous) = state.out.tags.get(tag) {
                warn!(
                    "builder: ref_id '{}' already names {}; keeping the first",
                    tag, previous
                );
            } else {
                state.out.tags.insert(tag.clone(), node);
            }
        }

        match &spec.connected_to {
            Some(ConnectedTo::Input(upstream)) => {
                let source = self.build_spec(host, upstream, state)?;
                self.connect_primary(host, source, node, &mut state.out);
            }
            Some(ConnectedTo::RefId(tag)) => match self.resolve(&*host, &state.out, tag, node) {
                Some(source) => self.connect_primary(host, source, node, &mut state.out),
                None if self.options.deferred_references => {
                    state.deferred.push((node, tag.clone()));
                }
                None => state.unresolved(node, tag.clone()),
            },
            None => {}
        }

        Ok(node)
    }

    /// Writes a literal into `attribute`, or builds a nested spec and
    /// connects it there. Failures are keyed by `key` as written in the tree.
    fn assign(
        &self,
        host: &mut dyn HostAdapter,
        node: NodeRef,
        key: &str,
        attribute: &str,
        value: &TreeValue,
        state: &mut BuildState,
    ) -> Result<(), HostError> {
        let written = match value {
            TreeValue::Literal(literal) => host.set_attr(node, attribute, literal.clone()),
            TreeValue::Node(child) => {
                let upstream = self.build_spec(host, child, state)?;
                host.connect(&Plug::new(upstream), node, attribute)
            }
        };
        if let Err(cause) = written {
            state.failed(node, key, cause);
        }
        Ok(())
    }

    fn connect_primary(
        &self,
        host: &mut dyn HostAdapter,
        source: NodeRef,
        node: NodeRef,
        out: &mut BuildOutput,
    ) {
        let input = &self.options.primary_input;
        if let Err(cause) = host.connect(&Plug::new(source), node, input) {
            let failure = BuildFailure {
                node,
                key: input.clone(),
                cause,
            };
            warn!("builder: {}", failure);
            out.failures.push(failure);
        }
    }

    fn resolve(
        &self,
        host: &dyn HostAdapter,
        out: &BuildOutput,
        tag: &str,
        consumer: NodeRef,
    ) -> Option<NodeRef> {
        if let Some(node) = out.tagged(tag) {
            return Some(node);
        }
        if self.options.tag_scope == TagScope::Build {
            return None;
        }
        host.all_nodes().into_iter().find(|&candidate| {
            candidate != consumer
                && host
                    .get_tag(candidate, &self.options.tag_key)
                    .ok()
                    .flatten()
                    .as_deref()
                    == Some(tag)
        })
    }
}

#[derive(Default)]
struct BuildState {
    out: BuildOutput,
    deferred: Vec<(NodeRef, String)>,
}

impl BuildState {
    fn failed(&mut self, node: NodeRef, key: &str, cause: HostError) {
        let failure = BuildFailure {
            node,
            key: key.to_string(),
            cause,
        };
        warn!("builder: {}", failure);
        self.out.failures.push(failure);
    }

    fn unresolved(&mut self, node: NodeRef, ref_id: String) {
        let reference = UnresolvedReference { node, ref_id };
        warn!("builder: {}", reference);
        self.out.unresolved.push(reference);
    }
}

/// Builds `tree` with default options.
pub fn build(host: &mut dyn HostAdapter, tree: &NodeTree) -> Result<BuildOutput, HostError> {
    TreeBuilder::default().build(host, tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemoryScene, NodeSchema};
    use crate::model::value::AttributeValue;

    fn comp() -> MemoryScene {
        let mut scene = MemoryScene::new();
        scene.register_type(NodeSchema::new("Src").attr("Input", 0.0).attr("Gain", 1.0));
        scene.register_type(
            NodeSchema::new("Dst")
                .attr("Input", 0.0)
                .attr("Mask", 0.0)
                .attr("blend_amount", 1.0)
                .input_id("Blend", "blend_amount"),
        );
        scene
    }

    #[test]
    fn test_sibling_ref_connects_producer() {
        let mut scene = comp();
        let tree: NodeTree = serde_json::from_str(
            r#"[{"type":"Src","ref_id":"r1"}, {"type":"Dst","connected_to":{"ref_id":"r1"}}]"#,
        )
        .unwrap();
        let out = build(&mut scene, &tree).unwrap();
        assert!(out.is_clean());
        let (src, dst) = (out.roots[0], out.roots[1]);
        assert_eq!(
            scene.get_connections(dst, "Input").unwrap(),
            vec![Plug::new(src)]
        );
        assert_eq!(
            scene.get_tag(src, "ref_id").unwrap().as_deref(),
            Some("r1")
        );
    }

    #[test]
    fn test_forward_reference_resolves_when_deferred() {
        let mut scene = comp();
        let tree = NodeTree::from(vec![
            NodeTreeSpec::new("Dst").connected_to_ref("later"),
            NodeTreeSpec::new("Src").ref_id("later"),
        ]);
        let out = build(&mut scene, &tree).unwrap();
        assert!(out.unresolved.is_empty());
        assert_eq!(
            scene.get_connections(out.roots[0], "Input").unwrap(),
            vec![Plug::new(out.roots[1])]
        );

        let strict = TreeBuilder::new(BuilderOptions {
            deferred_references: false,
            ..BuilderOptions::default()
        });
        let out = strict.build(&mut scene, &tree).unwrap();
        assert_eq!(out.unresolved.len(), 1);
        assert_eq!(out.unresolved[0].ref_id, "later");
    }

    #[test]
    fn test_build_scope_ignores_earlier_builds() {
        let mut scene = comp();
        build(&mut scene, &NodeTreeSpec::new("Src").ref_id("shared").into()).unwrap();
        let consumer: NodeTree = NodeTreeSpec::new("Dst").connected_to_ref("shared").into();

        let out = build(&mut scene, &consumer).unwrap();
        assert_eq!(out.unresolved.len(), 1);

        let document = TreeBuilder::new(BuilderOptions {
            tag_scope: TagScope::Document,
            ..BuilderOptions::default()
        });
        let out = document.build(&mut scene, &consumer).unwrap();
        assert!(out.is_clean());
        assert_eq!(scene.get_connections(out.roots[0], "Input").unwrap().len(), 1);
    }

    #[test]
    fn test_nested_attr_input_list_and_failures() {
        let mut scene = comp();
        let tree: NodeTree = NodeTreeSpec::new("Dst")
            .attr_node("Mask", NodeTreeSpec::new("Src").attr("Gain", 2.0))
            .attr("Missing", 1.0)
            .input("Blend", 0.25)
            .input("NoSuchId", 1.0)
            .connected_to_input(NodeTreeSpec::new("Src"))
            .into();
        let out = build(&mut scene, &tree).unwrap();
        let dst = out.root().unwrap();
        assert_eq!(out.created.len(), 3);

        let mask = scene.get_connections(dst, "Mask").unwrap();
        assert_eq!(mask.len(), 1);
        assert_eq!(
            scene.get_attr(mask[0].node, "Gain").unwrap(),
            AttributeValue::from(2.0)
        );
        assert_eq!(
            scene.get_attr(dst, "blend_amount").unwrap(),
            AttributeValue::from(0.25)
        );
        assert_eq!(scene.get_connections(dst, "Input").unwrap().len(), 1);

        let keys: Vec<&str> = out.failures.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["Missing", "NoSuchId"]);
    }

    #[test]
    fn test_unknown_type_aborts_build() {
        let mut scene = comp();
        let tree: NodeTree = NodeTreeSpec::new("Src")
            .connected_to_input(NodeTreeSpec::new("Nope"))
            .into();
        assert_eq!(
            build(&mut scene, &tree),
            Err(HostError::Creation("Nope".to_string()))
        );
    }
}
