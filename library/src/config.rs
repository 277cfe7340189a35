use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::assets::TextureTranscoder;
use crate::assets::texture::DEFAULT_OUTPUT_EXTENSION;
use crate::convert::factory::NamingPolicy;
use crate::error::ShadeportError;
use crate::graph::cleanup::CleanupOptions;
use crate::plugin::SheetContext;
use crate::tree::builder::{BuilderOptions, DEFAULT_PRIMARY_INPUT, DEFAULT_TAG_KEY, TagScope};

const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct MigrationConfig {
    pub naming: NamingSettings,
    pub conversion: ConversionSettings,
    pub cleanup: CleanupSettings,
    pub builder: BuilderSettings,
    pub assets: AssetSettings,
    pub plugins: PluginSettings,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct NamingSettings {
    pub policy: NamingPolicy,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ConversionSettings {
    pub parallel_asset_jobs: bool,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            parallel_asset_jobs: true,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct CleanupSettings {
    pub cache_capacity: usize,
    pub include_replacements_as_roots: bool,
}

impl Default for CleanupSettings {
    fn default() -> Self {
        let options = CleanupOptions::default();
        Self {
            cache_capacity: options.cache_capacity,
            include_replacements_as_roots: options.include_replacements_as_roots,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct BuilderSettings {
    pub tag_scope: TagScope,
    pub deferred_references: bool,
    pub primary_input: String,
    pub tag_key: String,
}

impl Default for BuilderSettings {
    fn default() -> Self {
        Self {
            tag_scope: TagScope::default(),
            deferred_references: true,
            primary_input: DEFAULT_PRIMARY_INPUT.to_string(),
            tag_key: DEFAULT_TAG_KEY.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AssetSettings {
    /// Texture processor executable. Unset falls back to the Redshift
    /// processor under `$REDSHIFT_COREDATAPATH`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcoder: Option<PathBuf>,
    pub transcoder_args: Vec<String>,
    pub output_extension: String,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            transcoder: None,
            transcoder_args: Vec::new(),
            output_extension: DEFAULT_OUTPUT_EXTENSION.to_string(),
        }
    }
}

impl AssetSettings {
    /// `None` when no processor is configured or discoverable.
    pub fn transcoder(&self) -> Option<TextureTranscoder> {
        let base = match &self.transcoder {
            Some(program) => TextureTranscoder::new(program.clone()),
            None => match TextureTranscoder::redshift() {
                Ok(transcoder) => transcoder,
                Err(e) => {
                    info!("Texture transcoding disabled: {}", e);
                    return None;
                }
            },
        };
        Some(
            base.with_args(self.transcoder_args.clone())
                .with_output_extension(&self.output_extension),
        )
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct PluginSettings {
    pub directories: Vec<PathBuf>,
}

impl MigrationConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ShadeportError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ShadeportError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Loads `explicit` if given (errors propagate); otherwise the file in
    /// the platform config directory, falling back to defaults when it is
    /// absent or unreadable.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ShadeportError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Some(path) = default_config_path() {
            if path.exists() {
                match Self::load(&path) {
                    Ok(config) => {
                        info!("Loaded config from {}", path.display());
                        return Ok(config);
                    }
                    Err(e) => warn!("Failed to load config file, using defaults: {}", e),
                }
            }
        }
        Ok(Self::default())
    }

    pub fn save(&self, path: &Path) -> Result<(), ShadeportError> {
        let text = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, text)?;
        Ok(())
    }

    pub fn cleanup_options(&self) -> CleanupOptions {
        CleanupOptions {
            cache_capacity: self.cleanup.cache_capacity,
            include_replacements_as_roots: self.cleanup.include_replacements_as_roots,
        }
    }

    pub fn builder_options(&self) -> BuilderOptions {
        BuilderOptions {
            tag_scope: self.builder.tag_scope,
            deferred_references: self.builder.deferred_references,
            primary_input: self.builder.primary_input.clone(),
            tag_key: self.builder.tag_key.clone(),
        }
    }

    pub fn sheet_context(&self) -> SheetContext {
        SheetContext {
            transcoder: self.assets.transcoder(),
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("me", "shadeport", "shadeport")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
