pub mod expr;
pub mod factory;
pub mod manager;
pub mod mapper;
pub mod rule;
pub mod sheet_file;

pub use expr::Expr;
pub use factory::{NamingPolicy, NodeFactory, derive_name};
pub use manager::{
    ConversionManager, ConversionReport, NodeConversion, Outcome, auto_convert, convert,
};
pub use mapper::{MappingOutcome, apply, map_attributes};
pub use rule::{
    AfterHook, AssetJobFactory, AttributeRule, BeforeHook, ConversionRule, Converter, NameToken,
    SpecSheet,
};
pub use sheet_file::SheetDocument;
