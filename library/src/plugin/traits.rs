//! Core plugin traits.

use crate::assets::TextureTranscoder;
use crate::convert::rule::SpecSheet;
use crate::error::ShadeportError;
use crate::host::NodeSchema;

/// Base trait for all plugins.
pub trait Plugin: Send + Sync {
    fn id(&self) -> &'static str;
    fn name(&self) -> String;
    fn version(&self) -> (u32, u32, u32);
    fn impl_type(&self) -> String {
        "Native".to_string()
    }
}

/// Settings a plugin may need while assembling its sheet.
#[derive(Clone, Debug, Default)]
pub struct SheetContext {
    /// Needed by rules that transcode textures; `None` disables them.
    pub transcoder: Option<TextureTranscoder>,
}

/// A plugin that ships a conversion table between two renderers.
pub trait SheetPlugin: Plugin {
    fn source_renderer(&self) -> String;

    fn target_renderer(&self) -> String;

    fn description(&self) -> String {
        format!("{} to {}", self.source_renderer(), self.target_renderer())
    }

    fn spec_sheet(&self, ctx: &SheetContext) -> Result<SpecSheet, ShadeportError>;

    /// Declarations of the node types the sheet creates, for hosts that
    /// need them registered up front.
    fn node_schemas(&self) -> Vec<NodeSchema> {
        Vec::new()
    }
}

// Create function type for dynamic loading
pub type SheetPluginCreateFn = unsafe extern "C" fn() -> *mut dyn SheetPlugin;
