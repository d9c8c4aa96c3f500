//! Configuration discovery, loading and normalization
//!
//! Config files of several formats are loaded into a common data tree, the
//! task and workspace sections are located by key, and every task is
//! normalized into a [`TaskTable`].

pub mod format;
pub mod makefile;
pub mod parse;
pub mod schema;
pub mod types;

// Re-export main types
pub use parse::*;
pub use schema::*;
pub use types::*;
