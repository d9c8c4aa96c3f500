//! CLI interface and argument parsing
//!
//! This module handles command-line parsing, task listing and shell
//! completion.

pub mod app;
pub mod list;
pub mod request;

// Re-export main types
pub use app::*;
pub use list::*;
pub use request::*;
