//! A closed set of value expressions for rules written as data.
//!
//! Every expression is a pure function of the source value, so it compiles
//! to a unary converter.

use serde::{Deserialize, Serialize};

use crate::convert::rule::Converter;
use crate::error::ConvertError;
use crate::model::value::{AttributeValue, Color, Scalar, Vec3};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "expr", rename_all = "snake_case")]
pub enum Expr {
    Identity,
    /// `value * scale + offset`, component-wise for vectors and colours.
    Affine {
        #[serde(default = "one")]
        scale: f64,
        #[serde(default)]
        offset: f64,
    },
    /// `2^value`.
    Exp2,
    Not,
    ClampMin {
        min: f64,
    },
    ClampMax {
        max: f64,
    },
    /// First matching `[key, result]` pair; `default` when nothing matches.
    Lookup {
        table: Vec<(serde_json::Value, serde_json::Value)>,
        #[serde(default)]
        default: Option<serde_json::Value>,
    },
    Equals {
        value: serde_json::Value,
        then: serde_json::Value,
        #[serde(rename = "else")]
        otherwise: serde_json::Value,
    },
    GreaterThan {
        threshold: f64,
        then: serde_json::Value,
        #[serde(rename = "else")]
        otherwise: serde_json::Value,
    },
    /// Average of a vector or colour's components.
    Mean,
    /// Number to a vector with three equal components.
    Splat,
    Chain {
        steps: Vec<Expr>,
    },
}

fn one() -> f64 {
    1.0
}

impl Expr {
    pub fn evaluate(&self, value: &AttributeValue) -> Result<AttributeValue, ConvertError> {
        match self {
            Expr::Identity => Ok(value.clone()),
            Expr::Affine { scale, offset } => map_numeric(value, |x| x * scale + offset),
            Expr::Exp2 => map_numeric(value, f64::exp2),
            Expr::Not => Ok(AttributeValue::from(number(value)? == 0.0)),
            Expr::ClampMin { min } => map_numeric(value, |x| x.max(*min)),
            Expr::ClampMax { max } => map_numeric(value, |x| x.min(*max)),
            Expr::Lookup { table, default } => {
                for (key, result) in table {
                    if same_value(value, &AttributeValue::try_from(key.clone())?) {
                        return AttributeValue::try_from(result.clone());
                    }
                }
                match default {
                    Some(d) => AttributeValue::try_from(d.clone()),
                    None => Err(ConvertError::new(format!(
                        "no lookup entry for {}",
                        value.describe()
                    ))),
                }
            }
            Expr::Equals {
                value: expected,
                then,
                otherwise,
            } => {
                let hit = same_value(value, &AttributeValue::try_from(expected.clone())?);
                AttributeValue::try_from(if hit { then } else { otherwise }.clone())
            }
            Expr::GreaterThan {
                threshold,
                then,
                otherwise,
            } => {
                let hit = number(value)? > *threshold;
                AttributeValue::try_from(if hit { then } else { otherwise }.clone())
            }
            Expr::Mean => {
                let [a, b, c] = triple(value)?;
                Ok(AttributeValue::from((a + b + c) / 3.0))
            }
            Expr::Splat => Ok(AttributeValue::from(Vec3::splat(number(value)?))),
            Expr::Chain { steps } => steps
                .iter()
                .try_fold(value.clone(), |acc, step| step.evaluate(&acc)),
        }
    }

    pub fn into_converter(self) -> Converter {
        Converter::unary(move |value| self.evaluate(value))
    }
}

fn number(value: &AttributeValue) -> Result<f64, ConvertError> {
    value
        .as_scalar()
        .and_then(Scalar::as_f64)
        .ok_or_else(|| ConvertError::new(format!("expected a number but found {}", value.describe())))
}

fn triple(value: &AttributeValue) -> Result<[f64; 3], ConvertError> {
    match value.as_scalar() {
        Some(Scalar::Vector3(v)) => Ok(v.to_array()),
        Some(Scalar::Color(c)) => Ok(c.to_array()),
        _ => Err(ConvertError::new(format!(
            "expected a vector or colour but found {}",
            value.describe()
        ))),
    }
}

fn map_numeric(
    value: &AttributeValue,
    f: impl Fn(f64) -> f64,
) -> Result<AttributeValue, ConvertError> {
    match value.as_scalar() {
        Some(Scalar::Vector3(v)) => {
            let [x, y, z] = v.to_array();
            Ok(AttributeValue::from(Vec3::new(f(x), f(y), f(z))))
        }
        Some(Scalar::Color(c)) => {
            let [r, g, b] = c.to_array();
            Ok(AttributeValue::from(Color::new(f(r), f(g), f(b))))
        }
        _ => Ok(AttributeValue::from(f(number(value)?))),
    }
}

/// Numbers compare by value regardless of kind; everything else exactly.
fn same_value(a: &AttributeValue, b: &AttributeValue) -> bool {
    let numeric = |v: &AttributeValue| match v.as_scalar() {
        Some(Scalar::String(_)) | None => None,
        Some(s) => s.as_f64(),
    };
    match (numeric(a), numeric(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}
