//! Rule tables: what a source node type turns into.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::assets::AssetJob;
use crate::error::{ConvertError, ShadeportError};
use crate::host::{HostAdapter, NodeView};
use crate::model::node::NodeRef;
use crate::model::value::AttributeValue;

pub type UnaryFn = dyn Fn(&AttributeValue) -> Result<AttributeValue, ConvertError> + Send + Sync;
pub type BinaryFn =
    dyn Fn(&AttributeValue, &NodeView<'_>) -> Result<AttributeValue, ConvertError> + Send + Sync;
pub type TernaryFn = dyn Fn(&AttributeValue, &NodeView<'_>, &NodeView<'_>) -> Result<AttributeValue, ConvertError>
    + Send
    + Sync;

pub type BeforeHook =
    Arc<dyn Fn(&mut dyn HostAdapter, NodeRef) -> Result<(), ShadeportError> + Send + Sync>;
pub type AfterHook =
    Arc<dyn Fn(&mut dyn HostAdapter, NodeRef, NodeRef) -> Result<(), ShadeportError> + Send + Sync>;
/// Reads a node and returns out-of-band work to run before the node's
/// type is mapped, or `None` when there is nothing to do.
pub type AssetJobFactory = Arc<
    dyn Fn(&dyn HostAdapter, NodeRef) -> Result<Option<Box<dyn AssetJob>>, ShadeportError>
        + Send
        + Sync,
>;

/// How one computed target value is derived.
///
/// The arity is chosen by whoever writes the rule; the engine never probes
/// a function to find out how many arguments it takes.
#[derive(Clone)]
pub enum Converter {
    Constant(AttributeValue),
    Unary(Arc<UnaryFn>),
    /// Value plus a read-only view of the old node.
    Binary(Arc<BinaryFn>),
    /// Value plus views of the old and the new node.
    Ternary(Arc<TernaryFn>),
}

impl Converter {
    pub fn constant(value: impl Into<AttributeValue>) -> Self {
        Converter::Constant(value.into())
    }

    pub fn unary<F>(f: F) -> Self
    where
        F: Fn(&AttributeValue) -> Result<AttributeValue, ConvertError> + Send + Sync + 'static,
    {
        Converter::Unary(Arc::new(f))
    }

    pub fn binary<F>(f: F) -> Self
    where
        F: Fn(&AttributeValue, &NodeView<'_>) -> Result<AttributeValue, ConvertError>
            + Send
            + Sync
            + 'static,
    {
        Converter::Binary(Arc::new(f))
    }

    pub fn ternary<F>(f: F) -> Self
    where
        F: Fn(&AttributeValue, &NodeView<'_>, &NodeView<'_>) -> Result<AttributeValue, ConvertError>
            + Send
            + Sync
            + 'static,
    {
        Converter::Ternary(Arc::new(f))
    }

    pub fn arity(&self) -> usize {
        match self {
            Converter::Constant(_) => 0,
            Converter::Unary(_) => 1,
            Converter::Binary(_) => 2,
            Converter::Ternary(_) => 3,
        }
    }

    pub fn evaluate(
        &self,
        value: &AttributeValue,
        old: &NodeView<'_>,
        new: &NodeView<'_>,
    ) -> Result<AttributeValue, ConvertError> {
        match self {
            Converter::Constant(constant) => Ok(constant.clone()),
            Converter::Unary(f) => f(value),
            Converter::Binary(f) => f(value, old),
            Converter::Ternary(f) => f(value, old, new),
        }
    }
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Converter::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Converter::Unary(_) => write!(f, "Unary(..)"),
            Converter::Binary(_) => write!(f, "Binary(..)"),
            Converter::Ternary(_) => write!(f, "Ternary(..)"),
        }
    }
}

#[derive(Clone, Debug)]
pub enum AttributeRule {
    /// Copy the value, or forward the connection, 1:1.
    Rename(String),
    /// Same as `Rename`, once per target.
    FanOut(Vec<String>),
    /// Derived static writes, applied in map order.
    Computed(IndexMap<String, Converter>),
}

impl AttributeRule {
    pub fn rename(target: &str) -> Self {
        AttributeRule::Rename(target.to_string())
    }

    pub fn fan_out<'a>(targets: impl IntoIterator<Item = &'a str>) -> Self {
        AttributeRule::FanOut(targets.into_iter().map(str::to_string).collect())
    }

    pub fn computed<'a>(converters: impl IntoIterator<Item = (&'a str, Converter)>) -> Self {
        AttributeRule::Computed(
            converters
                .into_iter()
                .map(|(target, converter)| (target.to_string(), converter))
                .collect(),
        )
    }

    /// Target attributes written by this rule, in write order.
    pub fn targets(&self) -> Vec<&str> {
        match self {
            AttributeRule::Rename(target) => vec![target.as_str()],
            AttributeRule::FanOut(targets) => targets.iter().map(String::as_str).collect(),
            AttributeRule::Computed(map) => map.keys().map(String::as_str).collect(),
        }
    }
}

/// Which token replaces the old type name in the derived node name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NameToken {
    #[default]
    TargetType,
    /// Secondary type with spaces replaced by underscores.
    SecondaryType,
}

#[derive(Clone, Default)]
pub struct ConversionRule {
    /// `None` makes the rule a passthrough: hooks only, no new node.
    pub target_type: Option<String>,
    pub secondary_type: Option<String>,
    pub name_token: NameToken,
    /// Passthrough rules only: apply `attribute_rules` to the old node.
    pub map_in_place: bool,
    pub attribute_rules: IndexMap<String, AttributeRule>,
    pub before_hook: Option<BeforeHook>,
    pub after_hook: Option<AfterHook>,
    pub asset_job: Option<AssetJobFactory>,
}

impl ConversionRule {
    pub fn to(target_type: &str) -> Self {
        Self {
            target_type: Some(target_type.to_string()),
            ..Self::default()
        }
    }

    pub fn passthrough() -> Self {
        Self::default()
    }

    /// A passthrough whose attribute rules write onto the old node itself.
    pub fn in_place() -> Self {
        Self {
            map_in_place: true,
            ..Self::default()
        }
    }

    pub fn secondary(mut self, secondary_type: &str) -> Self {
        self.secondary_type = Some(secondary_type.to_string());
        self
    }

    pub fn named_after_secondary(mut self) -> Self {
        self.name_token = NameToken::SecondaryType;
        self
    }

    pub fn attribute(mut self, source: &str, rule: AttributeRule) -> Self {
        self.attribute_rules.insert(source.to_string(), rule);
        self
    }

    pub fn rename(self, source: &str, target: &str) -> Self {
        self.attribute(source, AttributeRule::rename(target))
    }

    pub fn fan_out<'a>(self, source: &str, targets: impl IntoIterator<Item = &'a str>) -> Self {
        self.attribute(source, AttributeRule::fan_out(targets))
    }

    /// Adds one computed target, extending an existing computed rule for
    /// `source` if there is one.
    pub fn computed(mut self, source: &str, target: &str, converter: Converter) -> Self {
        match self.attribute_rules.get_mut(source) {
            Some(AttributeRule::Computed(map)) => {
                map.insert(target.to_string(), converter);
            }
            _ => {
                self.attribute_rules.insert(
                    source.to_string(),
                    AttributeRule::computed([(target, converter)]),
                );
            }
        }
        self
    }

    pub fn before<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut dyn HostAdapter, NodeRef) -> Result<(), ShadeportError> + Send + Sync + 'static,
    {
        self.before_hook = Some(Arc::new(hook));
        self
    }

    pub fn after<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut dyn HostAdapter, NodeRef, NodeRef) -> Result<(), ShadeportError>
            + Send
            + Sync
            + 'static,
    {
        self.after_hook = Some(Arc::new(hook));
        self
    }

    pub fn asset_job<F>(mut self, factory: F) -> Self
    where
        F: Fn(&dyn HostAdapter, NodeRef) -> Result<Option<Box<dyn AssetJob>>, ShadeportError>
            + Send
            + Sync
            + 'static,
    {
        self.asset_job = Some(Arc::new(factory));
        self
    }

    pub fn is_passthrough(&self) -> bool {
        self.target_type.is_none()
    }

    /// Token substituted for the old type name when naming the new node.
    pub fn name_token(&self) -> Option<String> {
        match self.name_token {
            NameToken::TargetType => self.target_type.clone(),
            NameToken::SecondaryType => self
                .secondary_type
                .as_ref()
                .map(|s| s.replace(' ', "_"))
                .or_else(|| self.target_type.clone()),
        }
    }
}

impl std::fmt::Debug for ConversionRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionRule")
            .field("target_type", &self.target_type)
            .field("secondary_type", &self.secondary_type)
            .field("name_token", &self.name_token)
            .field("map_in_place", &self.map_in_place)
            .field("attribute_rules", &self.attribute_rules)
            .field("before_hook", &self.before_hook.is_some())
            .field("after_hook", &self.after_hook.is_some())
            .field("asset_job", &self.asset_job.is_some())
            .finish()
    }
}

/// Source type name -> rule, in the order `auto_convert` processes types.
#[derive(Clone, Debug, Default)]
pub struct SpecSheet {
    rules: IndexMap<String, ConversionRule>,
}

impl SpecSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, source_type: &str, rule: ConversionRule) -> Self {
        self.insert(source_type, rule);
        self
    }

    /// Inserts or replaces; a replaced rule keeps its original position.
    pub fn insert(&mut self, source_type: &str, rule: ConversionRule) {
        self.rules.insert(source_type.to_string(), rule);
    }

    pub fn get(&self, source_type: &str) -> Option<&ConversionRule> {
        self.rules.get(source_type)
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConversionRule)> {
        self.rules.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Appends `other`'s rules; rules for types already present are replaced.
    pub fn merge(&mut self, other: SpecSheet) {
        self.rules.extend(other.rules);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
