pub mod cleanup;
pub mod outputs;
pub mod walker;

pub use cleanup::{clean_up, clean_up_with, CleanupOptions, CleanupReport, Rewire};
pub use outputs::{outputs, Consumer, OutputsResolver};
pub use walker::{direct_edges, walk, Walker};
