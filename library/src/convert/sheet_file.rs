//! Sheets written as TOML or JSON documents.
//!
//! ```toml
//! name = "arnold-to-redshift-lite"
//!
//! [[rule]]
//! source = "aiStandard"
//! target = "RedshiftMaterial"
//! secondary = "shader"
//!
//! [rule.attributes]
//! Kd = "diffuse_weight"
//! color = ["diffuse_color", "transl_color"]
//! specularAnisotropy = { computed = { refl_aniso = { expr = "affine", scale = 2.0, offset = -1.0 } } }
//!
//! [[rule]]
//! source = "file"
//! transcode = "fileTextureName"
//! ```

use std::path::Path;

use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::assets::texture::{TextureTranscoder, transcode_attribute};
use crate::convert::expr::Expr;
use crate::convert::rule::{AttributeRule, ConversionRule, Converter, SpecSheet};
use crate::error::ShadeportError;
use crate::model::value::AttributeValue;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct SheetDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "rule", alias = "rules")]
    pub rules: Vec<RuleDocument>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RuleDocument {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,
    #[serde(default)]
    pub name_after_secondary: bool,
    #[serde(default)]
    pub in_place: bool,
    /// Attribute holding a texture path to transcode before mapping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcode: Option<String>,
    #[serde(default)]
    pub attributes: IndexMap<String, AttributeDocument>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum AttributeDocument {
    Rename(String),
    FanOut(Vec<String>),
    Computed {
        computed: IndexMap<String, ComputedDocument>,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum ComputedDocument {
    Constant { constant: serde_json::Value },
    Expr(Expr),
}

impl SheetDocument {
    pub fn from_toml_str(text: &str) -> Result<Self, ShadeportError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ShadeportError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads a `.toml` or `.json` document.
    pub fn load(path: &Path) -> Result<Self, ShadeportError> {
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            Some("json") => Self::from_json_str(&text),
            _ => Err(ShadeportError::Sheet(format!(
                "unsupported sheet format: {}",
                path.display()
            ))),
        }
    }

    pub fn to_toml_string(&self) -> Result<String, ShadeportError> {
        Ok(toml::to_string(self)?)
    }

    /// Builds the runtime sheet. `transcoder` is required only when a rule
    /// asks for texture transcoding.
    pub fn compile(&self, transcoder: Option<&TextureTranscoder>) -> Result<SpecSheet, ShadeportError> {
        let mut sheet = SpecSheet::new();
        for doc in &self.rules {
            if sheet.get(&doc.source).is_some() {
                warn!("sheet: duplicate rule for '{}', later one wins", doc.source);
            }
            sheet.insert(&doc.source, doc.compile(transcoder)?);
        }
        debug!(
            "sheet: compiled {} rule(s) from {}",
            sheet.len(),
            self.name.as_deref().unwrap_or("<unnamed>")
        );
        Ok(sheet)
    }
}

impl RuleDocument {
    fn compile(&self, transcoder: Option<&TextureTranscoder>) -> Result<ConversionRule, ShadeportError> {
        let mut rule = match &self.target {
            Some(_) if self.in_place => {
                return Err(ShadeportError::Sheet(format!(
                    "rule for '{}' has a target type and in_place set",
                    self.source
                )));
            }
            Some(target) => ConversionRule::to(target),
            None if self.in_place => ConversionRule::in_place(),
            None => ConversionRule::passthrough(),
        };
        rule.secondary_type = self.secondary.clone();
        if self.name_after_secondary {
            rule = rule.named_after_secondary();
        }

        for (source_attr, attribute) in &self.attributes {
            let compiled = match attribute {
                AttributeDocument::Rename(target) => AttributeRule::Rename(target.clone()),
                AttributeDocument::FanOut(targets) => AttributeRule::FanOut(targets.clone()),
                AttributeDocument::Computed { computed } => AttributeRule::Computed(
                    computed
                        .iter()
                        .map(|(target, doc)| Ok((target.clone(), doc.compile(&self.source)?)))
                        .collect::<Result<_, ShadeportError>>()?,
                ),
            };
            rule = rule.attribute(source_attr, compiled);
        }

        if let Some(attr) = &self.transcode {
            let transcoder = transcoder.ok_or_else(|| {
                ShadeportError::Sheet(format!(
                    "rule for '{}' transcodes '{}' but no texture transcoder is configured",
                    self.source, attr
                ))
            })?;
            rule = rule.asset_job(transcode_attribute(transcoder.clone(), attr));
        }
        Ok(rule)
    }
}

impl ComputedDocument {
    fn compile(&self, source: &str) -> Result<Converter, ShadeportError> {
        match self {
            ComputedDocument::Constant { constant } => AttributeValue::try_from(constant.clone())
                .map(Converter::Constant)
                .map_err(|err| ShadeportError::Sheet(format!("rule for '{}': {}", source, err))),
            ComputedDocument::Expr(expr) => Ok(expr.clone().into_converter()),
        }
    }
}
