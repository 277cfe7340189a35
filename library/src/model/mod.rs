pub mod node;
pub mod tree;
pub mod value;

pub use node::{Edge, NodeRef};
pub use tree::{ConnectedTo, NodeTree, NodeTreeSpec, TreeValue};
pub use value::{AttributeValue, Color, FromAttribute, Plug, Scalar, ScalarKind, Vec3};
