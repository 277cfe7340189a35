pub mod document;
pub mod manager;
pub mod repository;
pub mod traits;

pub use document::DocumentSheetPlugin;
pub use manager::{PluginManager, SheetInfo};
pub use repository::PluginRepository;
pub use traits::{Plugin, SheetContext, SheetPlugin, SheetPluginCreateFn};
