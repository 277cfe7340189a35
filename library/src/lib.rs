//! Declarative migration of shading networks between renderers.
//!
//! A [`SpecSheet`] maps source node types to target types and attributes.
//! [`ConversionManager`] applies it through a [`HostAdapter`], and
//! [`clean_up`] repoints downstream consumers at the replacements.
//! [`TreeBuilder`] instantiates declarative node trees.

pub mod assets;
pub mod cache;
pub mod cli;
pub mod config;
pub mod convert;
pub mod error;
pub mod graph;
pub mod host;
pub mod model;
pub mod plugin;
pub mod tree;

pub use cli::run;
pub use config::MigrationConfig;
pub use convert::{ConversionManager, ConversionReport, ConversionRule, SpecSheet, auto_convert, convert};
pub use error::ShadeportError;
pub use graph::{clean_up, outputs};
pub use host::{HostAdapter, HostError, MemoryScene};
pub use model::{AttributeValue, NodeRef, NodeTree, NodeTreeSpec, Plug};
pub use plugin::{PluginManager, SheetPlugin};
pub use tree::{TreeBuilder, build};
