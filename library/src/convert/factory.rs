//! Creates replacement nodes and names them after the node they replace.

use std::collections::HashSet;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::host::{HostAdapter, HostError};
use crate::model::node::NodeRef;

/// What to do when a derived name was already used.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NamingPolicy {
    /// Append `_<n>` until the name is held by no node in the scene and was
    /// not issued earlier in this session.
    #[default]
    Unique,
    /// Hand the derived name to the host as-is.
    Verbatim,
}

/// Issues names for one conversion session.
#[derive(Debug, Default)]
pub struct NodeFactory {
    policy: NamingPolicy,
    issued: HashSet<String>,
}

impl NodeFactory {
    pub fn new(policy: NamingPolicy) -> Self {
        Self {
            policy,
            issued: HashSet::new(),
        }
    }

    pub fn policy(&self) -> NamingPolicy {
        self.policy
    }

    pub fn create(
        &self,
        host: &mut dyn HostAdapter,
        target_type: &str,
        secondary_type: Option<&str>,
    ) -> Result<NodeRef, HostError> {
        let node = host.create_node(target_type, secondary_type)?;
        debug!("factory: created {} of type {}", node, target_type);
        Ok(node)
    }

    /// Renames `new` after `old`, substituting `token` for the old type name.
    /// Returns the name the host assigned.
    pub fn label(
        &mut self,
        host: &mut dyn HostAdapter,
        old: NodeRef,
        new: NodeRef,
        token: &str,
    ) -> Result<String, HostError> {
        let old_name = host.node_name(old)?;
        let old_type = host.node_type(old)?;
        let derived = derive_name(&old_name, &old_type, token);
        let taken = if self.policy == NamingPolicy::Unique {
            scene_names(&*host, new)
        } else {
            HashSet::new()
        };
        let name = self.claim(derived, &old_name, &taken);
        host.rename_node(new, &name)
    }

    fn claim(&mut self, candidate: String, old_name: &str, taken: &HashSet<String>) -> String {
        if self.policy == NamingPolicy::Verbatim {
            return candidate;
        }
        let mut name = candidate.clone();
        let mut counter = 1;
        while name == old_name || self.issued.contains(&name) || taken.contains(&name) {
            name = format!("{}_{}", candidate, counter);
            counter += 1;
        }
        self.issued.insert(name.clone());
        name
    }
}

/// Names of every scene node except `skip`, the node about to be renamed.
fn scene_names(host: &dyn HostAdapter, skip: NodeRef) -> HashSet<String> {
    host.all_nodes()
        .into_iter()
        .filter(|&node| node != skip)
        .filter_map(|node| host.node_name(node).ok())
        .collect()
}

/// `aiStandard1` with token `RedshiftMaterial` becomes `RedshiftMaterial1`.
/// Names that do not contain the type get the token appended instead.
pub fn derive_name(old_name: &str, old_type: &str, token: &str) -> String {
    if !old_type.is_empty() && old_name.contains(old_type) {
        old_name.replace(old_type, token)
    } else {
        format!("{}_{}", old_name, token)
    }
}
