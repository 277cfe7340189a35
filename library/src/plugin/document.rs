//! Sheet documents found on disk, exposed as plugins.

use std::path::{Path, PathBuf};

use crate::convert::rule::SpecSheet;
use crate::convert::sheet_file::SheetDocument;
use crate::error::ShadeportError;
use crate::plugin::traits::{Plugin, SheetContext, SheetPlugin};

pub struct DocumentSheetPlugin {
    document: SheetDocument,
    path: PathBuf,
    id_static: &'static str,
}

impl DocumentSheetPlugin {
    /// The plugin id is the document's `name`, or the file stem.
    pub fn load(path: &Path) -> Result<Self, ShadeportError> {
        let document = SheetDocument::load(path)?;
        let id = match &document.name {
            Some(name) => name.clone(),
            None => path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    ShadeportError::Sheet(format!("cannot derive a sheet id from {}", path.display()))
                })?,
        };

        // Leak the ID to satisfy &'static str requirement
        let id_static = Box::leak(id.into_boxed_str());

        Ok(Self {
            document,
            path: path.to_path_buf(),
            id_static,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Plugin for DocumentSheetPlugin {
    fn id(&self) -> &'static str {
        self.id_static
    }

    fn name(&self) -> String {
        self.id_static.to_string()
    }

    fn version(&self) -> (u32, u32, u32) {
        (0, 1, 0)
    }

    fn impl_type(&self) -> String {
        "Document".to_string()
    }
}

impl SheetPlugin for DocumentSheetPlugin {
    fn source_renderer(&self) -> String {
        "any".to_string()
    }

    fn target_renderer(&self) -> String {
        "any".to_string()
    }

    fn description(&self) -> String {
        self.document
            .description
            .clone()
            .unwrap_or_else(|| format!("sheet document {}", self.path.display()))
    }

    fn spec_sheet(&self, ctx: &SheetContext) -> Result<SpecSheet, ShadeportError> {
        self.document.compile(ctx.transcoder.as_ref())
    }
}
