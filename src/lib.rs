//! rds - run dev scripts
//!
//! rds finds the task definitions a project already has (`ds.toml`,
//! `pyproject.toml`, `package.json`, `Cargo.toml`, `composer.json` or a
//! `Makefile`) and runs them with argument passing, composite tasks,
//! environment control and error suppression, optionally across every member
//! of a workspace.

// Public modules
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod runner;
pub mod workspace;

// Re-export commonly used types
pub use error::{RdsError, Result};

/// Current version of rds
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
