//! Opaque node handles and graph edges.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Handle to a node owned by the host scene.
///
/// The engine never owns node lifetime; a `NodeRef` is only meaningful to the
/// host adapter that issued it.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[serde(transparent)]
pub struct NodeRef(pub Uuid);

impl NodeRef {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for NodeRef {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // First block of the uuid is enough to tell nodes apart in logs.
        let text = self.0.simple().to_string();
        write!(f, "#{}", &text[..8])
    }
}

/// One attribute-level dependency discovered by the graph walker.
///
/// `parent.attribute` (slot `index` for array attributes) is fed by `child`,
/// optionally through the child's output `channel`.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Edge {
    pub parent: NodeRef,
    pub attribute: String,
    pub child: NodeRef,
    pub index: Option<usize>,
    pub channel: Option<String>,
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.index {
            Some(index) => write!(
                f,
                "{} -> {}.{}[{}]",
                self.child, self.parent, self.attribute, index
            ),
            None => write!(f, "{} -> {}.{}", self.child, self.parent, self.attribute),
        }
    }
}
