use thiserror::Error;

use crate::host::HostError;
use crate::model::node::NodeRef;

#[derive(Error, Debug)]
pub enum ShadeportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML writing error: {0}")]
    TomlWrite(#[from] toml::ser::Error),
    #[error("Libloading error: {0}")]
    Libloading(#[from] libloading::Error),
    #[error("Glob pattern error: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("Host error: {0}")]
    Host(#[from] HostError),
    #[error("Plugin error: {0}")]
    Plugin(String),
    #[error("Sheet error: {0}")]
    Sheet(String),
    #[error("Conversion error: {0}")]
    Conversion(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<ConvertError> for ShadeportError {
    fn from(err: ConvertError) -> Self {
        ShadeportError::Conversion(err.0)
    }
}

/// Error returned by converter closures and hooks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ConvertError(pub String);

impl ConvertError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl From<HostError> for ConvertError {
    fn from(err: HostError) -> Self {
        ConvertError(err.to_string())
    }
}

/// Why one `(source_attr, target_attr)` mapping could not be applied.
#[derive(Debug, Clone, PartialEq)]
pub enum MappingCause {
    Host(HostError),
    Converter(ConvertError),
}

impl std::fmt::Display for MappingCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MappingCause::Host(err) => write!(f, "host rejected mapping: {}", err),
            MappingCause::Converter(err) => write!(f, "converter failed: {}", err),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeWriteFailure {
    pub old_node: NodeRef,
    pub new_node: NodeRef,
    pub source_attr: String,
    pub target_attr: String,
    pub cause: MappingCause,
}

impl std::fmt::Display for AttributeWriteFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}: {}",
            self.old_node, self.source_attr, self.new_node, self.target_attr, self.cause
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    Before,
    After,
    AssetJob,
    Rename,
}

impl std::fmt::Display for HookStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HookStage::Before => "before-hook",
            HookStage::After => "after-hook",
            HookStage::AssetJob => "asset job",
            HookStage::Rename => "rename",
        };
        write!(f, "{}", s)
    }
}

/// A lifecycle step that failed without aborting the node's conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct HookFailure {
    pub node: NodeRef,
    pub stage: HookStage,
    pub message: String,
}

impl std::fmt::Display for HookFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed for {}: {}", self.stage, self.node, self.message)
    }
}

/// A consumer edge the cleanup pass could not repoint.
#[derive(Debug, Clone, PartialEq)]
pub struct RewireFailure {
    pub old_node: NodeRef,
    pub new_node: NodeRef,
    pub consumer: NodeRef,
    pub attribute: String,
    pub index: Option<usize>,
    pub cause: HostError,
}

impl std::fmt::Display for RewireFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = match self.index {
            Some(index) => format!("{}.{}[{}]", self.consumer, self.attribute, index),
            None => format!("{}.{}", self.consumer, self.attribute),
        };
        write!(
            f,
            "could not repoint {} from {} to {}: {}",
            slot, self.old_node, self.new_node, self.cause
        )
    }
}

/// A `connected_to.ref_id` that matched no tagged node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference {
    pub node: NodeRef,
    pub ref_id: String,
}

impl std::fmt::Display for UnresolvedReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} references unknown ref_id '{}'",
            self.node, self.ref_id
        )
    }
}

/// An attribute or input the tree builder could not assign.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildFailure {
    pub node: NodeRef,
    pub key: String,
    pub cause: HostError,
}

impl std::fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}: {}", self.node, self.key, self.cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        assert!(
            ShadeportError::Sheet("x".into())
                .to_string()
                .starts_with("Sheet error:")
        );
        assert!(
            ShadeportError::from(ConvertError::new("boom"))
                .to_string()
                .contains("boom")
        );
    }

    #[test]
    fn test_rewire_failure_names_slot() {
        let failure = RewireFailure {
            old_node: NodeRef::new(),
            new_node: NodeRef::new(),
            consumer: NodeRef::new(),
            attribute: "materialList".into(),
            index: Some(2),
            cause: HostError::Fault("locked".into()),
        };
        let text = failure.to_string();
        assert!(text.contains("materialList[2]"));
        assert!(text.contains("locked"));
    }
}
