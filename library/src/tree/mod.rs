//! Authoring new networks from declarative descriptions.

pub mod builder;

pub use builder::{BuildOutput, BuilderOptions, TagScope, TreeBuilder, build};
