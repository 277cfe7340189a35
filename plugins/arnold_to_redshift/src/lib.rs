//! Arnold to Redshift conversion table for Maya scenes.

mod schemas;
mod sheet;

use shadeport::error::ShadeportError;
use shadeport::host::NodeSchema;
use shadeport::plugin::{Plugin, SheetContext, SheetPlugin};
use shadeport::SpecSheet;

pub use sheet::{arnold_to_redshift, temperature_to_color};

pub struct ArnoldToRedshiftPlugin;

impl Plugin for ArnoldToRedshiftPlugin {
    fn id(&self) -> &'static str {
        "arnold_to_redshift"
    }

    fn name(&self) -> String {
        "Arnold to Redshift".to_string()
    }

    fn version(&self) -> (u32, u32, u32) {
        (0, 1, 0)
    }
}

impl SheetPlugin for ArnoldToRedshiftPlugin {
    fn source_renderer(&self) -> String {
        "arnold".to_string()
    }

    fn target_renderer(&self) -> String {
        "redshift".to_string()
    }

    fn spec_sheet(&self, ctx: &SheetContext) -> Result<SpecSheet, ShadeportError> {
        Ok(arnold_to_redshift(ctx))
    }

    fn node_schemas(&self) -> Vec<NodeSchema> {
        schemas::redshift_schemas()
    }
}

#[allow(improper_ctypes_definitions)]
#[no_mangle]
pub extern "C" fn create_sheet_plugin() -> *mut dyn SheetPlugin {
    let plugin: Box<dyn SheetPlugin> = Box::new(ArnoldToRedshiftPlugin);
    Box::into_raw(plugin)
}
