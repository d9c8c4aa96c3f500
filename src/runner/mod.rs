//! Task resolution and execution
//!
//! Requested tasks are resolved into flat lists of shell commands, which the
//! engine runs one at a time with layered environments.

pub mod command;
pub mod context;
pub mod engine;
pub mod env;
pub mod interpolate;
pub mod resolve;

// Re-export main types
pub use command::*;
pub use context::*;
pub use engine::*;
pub use env::*;
pub use interpolate::*;
pub use resolve::*;
