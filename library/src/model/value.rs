//! Tagged representation of node attribute values.

use std::hash::{Hash, Hasher};

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::ConvertError;
use crate::model::node::NodeRef;

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Vec3 {
    pub x: OrderedFloat<f64>,
    pub y: OrderedFloat<f64>,
    pub z: OrderedFloat<f64>,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: OrderedFloat(x),
            y: OrderedFloat(y),
            z: OrderedFloat(z),
        }
    }

    pub fn splat(v: f64) -> Self {
        Self::new(v, v, v)
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x.into_inner(), self.y.into_inner(), self.z.into_inner()]
    }
}

/// Linear RGB colour as renderers store it (no alpha, unbounded floats).
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Color {
    pub r: OrderedFloat<f64>,
    pub g: OrderedFloat<f64>,
    pub b: OrderedFloat<f64>,
}

impl Color {
    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self {
            r: OrderedFloat(r),
            g: OrderedFloat(g),
            b: OrderedFloat(b),
        }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.r.into_inner(), self.g.into_inner(), self.b.into_inner()]
    }
}

impl From<Vec3> for Color {
    fn from(v: Vec3) -> Self {
        Self {
            r: v.x,
            g: v.y,
            b: v.z,
        }
    }
}

impl From<Color> for Vec3 {
    fn from(c: Color) -> Self {
        Self {
            x: c.r,
            y: c.g,
            z: c.b,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Bool,
    Int,
    Float,
    Vector3,
    Color,
    String,
    Enum,
}

impl std::fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::Vector3 => "vector3",
            ScalarKind::Color => "color",
            ScalarKind::String => "string",
            ScalarKind::Enum => "enum",
        };
        write!(f, "{}", s)
    }
}

/// A plain (non-connected) attribute payload.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Hash, Debug)]
#[serde(rename_all = "lowercase")]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Vector3(Vec3),
    Color(Color),
    String(String),
    /// Host enumeration stored by index.
    Enum(i64),
}

impl Scalar {
    pub fn kind(&self) -> ScalarKind {
        match self {
            Scalar::Bool(_) => ScalarKind::Bool,
            Scalar::Int(_) => ScalarKind::Int,
            Scalar::Float(_) => ScalarKind::Float,
            Scalar::Vector3(_) => ScalarKind::Vector3,
            Scalar::Color(_) => ScalarKind::Color,
            Scalar::String(_) => ScalarKind::String,
            Scalar::Enum(_) => ScalarKind::Enum,
        }
    }

    /// Re-expresses the payload as `kind`, the way hosts coerce on assignment.
    ///
    /// Numeric kinds (bool, int, float, enum) convert between each other and
    /// vector3/color convert between each other; everything else must match.
    pub fn coerce_to(&self, kind: ScalarKind) -> Option<Scalar> {
        if self.kind() == kind {
            return Some(self.clone());
        }
        match (self, kind) {
            (Scalar::Vector3(v), ScalarKind::Color) => Some(Scalar::Color((*v).into())),
            (Scalar::Color(c), ScalarKind::Vector3) => Some(Scalar::Vector3((*c).into())),
            (Scalar::Float(f), ScalarKind::Int | ScalarKind::Enum) => {
                if f.fract().abs() < f64::EPSILON {
                    let i = f.into_inner() as i64;
                    Some(if kind == ScalarKind::Int {
                        Scalar::Int(i)
                    } else {
                        Scalar::Enum(i)
                    })
                } else {
                    None
                }
            }
            (_, ScalarKind::Float) => self.as_f64().map(|f| Scalar::Float(OrderedFloat(f))),
            (_, ScalarKind::Int) => self.as_i64().map(Scalar::Int),
            (_, ScalarKind::Enum) => self.as_i64().map(Scalar::Enum),
            (_, ScalarKind::Bool) => self.as_f64().map(|f| Scalar::Bool(f != 0.0)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Float(v) => Some(v.into_inner()),
            Scalar::Int(v) | Scalar::Enum(v) => Some(*v as f64),
            Scalar::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(v) | Scalar::Enum(v) => Some(*v),
            Scalar::Bool(b) => Some(*b as i64),
            Scalar::Float(v) => {
                if v.fract().abs() < f64::EPSILON
                    && *v >= OrderedFloat(i64::MIN as f64)
                    && *v <= OrderedFloat(i64::MAX as f64)
                {
                    Some(v.into_inner() as i64)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

/// An upstream output: the node plus an optional output channel name.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Plug {
    pub node: NodeRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl Plug {
    pub fn new(node: NodeRef) -> Self {
        Self {
            node,
            channel: None,
        }
    }

    pub fn with_channel(node: NodeRef, channel: &str) -> Self {
        Self {
            node,
            channel: Some(channel.to_string()),
        }
    }

    /// Same channel, different node.
    pub fn retarget(&self, node: NodeRef) -> Self {
        Self {
            node,
            channel: self.channel.clone(),
        }
    }
}

impl std::fmt::Display for Plug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.channel {
            Some(channel) => write!(f, "{}.{}", self.node, channel),
            None => write!(f, "{}", self.node),
        }
    }
}

/// The value of one attribute on one node.
///
/// A `Connection` is a live upstream dependency: copying it re-wires rather
/// than snapshotting the upstream's current value. `Array` is a multi-slot
/// container whose insertion order is the slot index.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
#[serde(untagged)]
pub enum AttributeValue {
    Scalar(Scalar),
    Connection(Plug),
    Array(Vec<AttributeValue>),
}

impl Hash for AttributeValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            AttributeValue::Scalar(s) => s.hash(state),
            AttributeValue::Connection(p) => p.hash(state),
            AttributeValue::Array(items) => items.hash(state),
        }
    }
}

impl AttributeValue {
    pub fn is_connection(&self) -> bool {
        matches!(self, AttributeValue::Connection(_))
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            AttributeValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_plug(&self) -> Option<&Plug> {
        match self {
            AttributeValue::Connection(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[AttributeValue]> {
        match self {
            AttributeValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn get_as<T: FromAttribute>(&self) -> Option<T> {
        T::from_attribute(self)
    }

    /// Like [`get_as`](Self::get_as) but with an error that names the mismatch,
    /// for use inside converter closures.
    pub fn try_as<T: FromAttribute>(&self) -> Result<T, ConvertError> {
        T::from_attribute(self).ok_or_else(|| {
            ConvertError::new(format!(
                "expected {} but found {}",
                std::any::type_name::<T>(),
                self.describe()
            ))
        })
    }

    /// Short human-readable description used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            AttributeValue::Scalar(s) => format!("{} scalar", s.kind()),
            AttributeValue::Connection(p) => format!("connection from {}", p),
            AttributeValue::Array(items) => format!("array of {}", items.len()),
        }
    }
}

// Type-safe extraction from AttributeValue
pub trait FromAttribute: Sized {
    fn from_attribute(value: &AttributeValue) -> Option<Self>;
}

impl FromAttribute for f64 {
    fn from_attribute(value: &AttributeValue) -> Option<f64> {
        value.as_scalar()?.as_f64()
    }
}

impl FromAttribute for i64 {
    fn from_attribute(value: &AttributeValue) -> Option<i64> {
        value.as_scalar()?.as_i64()
    }
}

impl FromAttribute for bool {
    fn from_attribute(value: &AttributeValue) -> Option<bool> {
        match value.as_scalar()? {
            Scalar::Bool(b) => Some(*b),
            other => other.as_f64().map(|f| f != 0.0),
        }
    }
}

impl FromAttribute for String {
    fn from_attribute(value: &AttributeValue) -> Option<String> {
        match value.as_scalar()? {
            Scalar::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromAttribute for Vec3 {
    fn from_attribute(value: &AttributeValue) -> Option<Vec3> {
        match value.as_scalar()? {
            Scalar::Vector3(v) => Some(*v),
            Scalar::Color(c) => Some((*c).into()),
            _ => None,
        }
    }
}

impl FromAttribute for Color {
    fn from_attribute(value: &AttributeValue) -> Option<Color> {
        match value.as_scalar()? {
            Scalar::Color(c) => Some(*c),
            Scalar::Vector3(v) => Some((*v).into()),
            _ => None,
        }
    }
}

impl FromAttribute for NodeRef {
    fn from_attribute(value: &AttributeValue) -> Option<NodeRef> {
        value.as_plug().map(|p| p.node)
    }
}

impl From<Scalar> for AttributeValue {
    fn from(value: Scalar) -> Self {
        AttributeValue::Scalar(value)
    }
}

impl From<Plug> for AttributeValue {
    fn from(value: Plug) -> Self {
        AttributeValue::Connection(value)
    }
}

impl From<NodeRef> for AttributeValue {
    fn from(value: NodeRef) -> Self {
        AttributeValue::Connection(Plug::new(value))
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Scalar(Scalar::Float(OrderedFloat(value)))
    }
}

impl From<f32> for AttributeValue {
    fn from(value: f32) -> Self {
        AttributeValue::Scalar(Scalar::Float(OrderedFloat(value as f64)))
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Scalar(Scalar::Int(value))
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Scalar(Scalar::Int(value as i64))
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Scalar(Scalar::Bool(value))
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Scalar(Scalar::String(value))
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Scalar(Scalar::String(value.to_string()))
    }
}

impl From<Vec3> for AttributeValue {
    fn from(value: Vec3) -> Self {
        AttributeValue::Scalar(Scalar::Vector3(value))
    }
}

impl From<Color> for AttributeValue {
    fn from(value: Color) -> Self {
        AttributeValue::Scalar(Scalar::Color(value))
    }
}

impl From<Vec<AttributeValue>> for AttributeValue {
    fn from(value: Vec<AttributeValue>) -> Self {
        AttributeValue::Array(value)
    }
}

/// Literal form used by tree specs and sheet documents.
///
/// Numbers, booleans and strings map to their scalar kinds, a three-number
/// list or an `{x, y, z}` object becomes a vector, `{r, g, b}` a colour and
/// `{node, channel?}` a connection. Other lists become arrays. `null` and any
/// other object are rejected.
impl TryFrom<serde_json::Value> for AttributeValue {
    type Error = ConvertError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Null => Err(ConvertError::new("null is not an attribute value")),
            serde_json::Value::Bool(b) => Ok(AttributeValue::from(b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(AttributeValue::from(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(AttributeValue::from(f))
                } else {
                    Err(ConvertError::new(format!("number {} is out of range", n)))
                }
            }
            serde_json::Value::String(s) => Ok(AttributeValue::from(s)),
            serde_json::Value::Array(items) => {
                if items.len() == 3 && items.iter().all(|v| v.is_number()) {
                    let xyz: Vec<f64> = items.iter().filter_map(|v| v.as_f64()).collect();
                    return Ok(AttributeValue::from(Vec3::new(xyz[0], xyz[1], xyz[2])));
                }
                items
                    .into_iter()
                    .map(AttributeValue::try_from)
                    .collect::<Result<Vec<_>, _>>()
                    .map(AttributeValue::Array)
            }
            serde_json::Value::Object(o) => {
                if o.len() == 3 && ["x", "y", "z"].iter().all(|k| o.contains_key(*k)) {
                    if let (Some(x), Some(y), Some(z)) = (
                        o.get("x").and_then(|v| v.as_f64()),
                        o.get("y").and_then(|v| v.as_f64()),
                        o.get("z").and_then(|v| v.as_f64()),
                    ) {
                        return Ok(AttributeValue::from(Vec3::new(x, y, z)));
                    }
                }

                if o.len() == 3 && ["r", "g", "b"].iter().all(|k| o.contains_key(*k)) {
                    if let (Some(r), Some(g), Some(b)) = (
                        o.get("r").and_then(|v| v.as_f64()),
                        o.get("g").and_then(|v| v.as_f64()),
                        o.get("b").and_then(|v| v.as_f64()),
                    ) {
                        return Ok(AttributeValue::from(Color::new(r, g, b)));
                    }
                }

                let object = serde_json::Value::Object(o);
                serde_json::from_value::<AttributeValue>(object.clone())
                    .map_err(|_| ConvertError::new(format!("unsupported literal {}", object)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_literal_numbers_keep_their_kind() {
        assert_eq!(AttributeValue::try_from(json!(5)).unwrap(), AttributeValue::from(5i64));
        assert_eq!(AttributeValue::try_from(json!(0.5)).unwrap(), AttributeValue::from(0.5));
        assert_eq!(AttributeValue::try_from(json!(true)).unwrap(), AttributeValue::from(true));
    }

    #[test]
    fn test_literal_triplet_is_vector() {
        let value = AttributeValue::try_from(json!([1, 0.5, 0])).unwrap();
        assert_eq!(value.get_as::<Vec3>(), Some(Vec3::new(1.0, 0.5, 0.0)));

        let color = AttributeValue::try_from(json!({"r": 1.0, "g": 0.0, "b": 0.0})).unwrap();
        assert_eq!(color.get_as::<Color>(), Some(Color::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_literal_connection_object() {
        let node = NodeRef::new();
        let value = AttributeValue::try_from(json!({"node": node, "channel": "outColor"})).unwrap();
        assert_eq!(
            value,
            AttributeValue::Connection(Plug::with_channel(node, "outColor"))
        );
    }

    #[test]
    fn test_null_and_unknown_objects_are_rejected() {
        assert!(AttributeValue::try_from(json!(null)).is_err());
        assert!(AttributeValue::try_from(json!([1, null])).is_err());
        assert!(AttributeValue::try_from(json!({"type": "Ellipse", "atrs": {}})).is_err());
    }

    #[test]
    fn test_numeric_coercion() {
        let int = Scalar::Int(3);
        assert_eq!(
            int.coerce_to(ScalarKind::Float),
            Some(Scalar::Float(OrderedFloat(3.0)))
        );
        assert_eq!(Scalar::Float(OrderedFloat(2.5)).coerce_to(ScalarKind::Int), None);
        assert_eq!(
            Scalar::Float(OrderedFloat(1.0)).coerce_to(ScalarKind::Bool),
            Some(Scalar::Bool(true))
        );
        assert_eq!(Scalar::String("a".into()).coerce_to(ScalarKind::Float), None);
        assert_eq!(
            Scalar::Vector3(Vec3::splat(1.0)).coerce_to(ScalarKind::Color),
            Some(Scalar::Color(Color::new(1.0, 1.0, 1.0)))
        );
    }

    #[test]
    fn test_scene_json_shape() {
        let node = NodeRef::new();
        let value = AttributeValue::Array(vec![
            AttributeValue::from(1.5),
            AttributeValue::from(node),
        ]);
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json[0], json!({"float": 1.5}));
        assert_eq!(json[1]["node"], json!(node));
        let back: AttributeValue = serde_json::from_value(json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_try_as_reports_mismatch() {
        let err = AttributeValue::from("text").try_as::<f64>().unwrap_err();
        assert!(err.to_string().contains("string scalar"));
    }
}
