//! Error types for rds

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for rds operations
pub type Result<T> = std::result::Result<T, RdsError>;

/// Main error type for rds
#[derive(Error, Debug)]
pub enum RdsError {
    /// Configuration discovery and parsing errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Task reference resolution errors
    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    /// Workspace pattern errors
    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    /// Task execution errors
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Configuration discovery, loading and normalization errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No valid configuration file found (searched: {0})")]
    NotFound(String),

    #[error("Cannot find file: {0}")]
    MissingFile(PathBuf),

    #[error("Not sure how to read file: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Could not find task configuration in {0}")]
    NoTasks(PathBuf),

    #[error("Could not find workspace configuration in {0}")]
    NoWorkspace(PathBuf),

    #[error("Failed to parse {path}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid task '{name}' in {path}: {error}")]
    InvalidTask {
        name: String,
        path: PathBuf,
        error: String,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised while expanding a requested task into runnable steps
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Not enough arguments for task '{task}': ${index} is required")]
    MissingArgument { task: String, index: usize },

    #[error("Task cycle detected: {}", .0.join(" => "))]
    CycleDetected(Vec<String>),

    #[error("Task '{0}' is not defined")]
    UnknownTaskReference(String),

    #[error("Invalid task selector '{selector}': {error}")]
    InvalidSelector { selector: String, error: String },
}

/// Workspace member resolution errors
#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Invalid workspace pattern '{pattern}': {error}")]
    GlobSyntax { pattern: String, error: String },

    #[error("Failed to read workspace member {path}: {error}")]
    Member { path: PathBuf, error: String },

    #[error("No workspace members match {0}")]
    NoMatchingMembers(String),
}

/// Task execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Failed to start command '{command}': {error}")]
    Spawn { command: String, error: String },

    #[error("Cannot find env-file: {0}")]
    MissingEnvFile(PathBuf),

    #[error("Failed to read env-file {path}: {error}")]
    EnvFile { path: PathBuf, error: String },

    #[error("Cannot find directory: {0}")]
    MissingDirectory(PathBuf),
}

/// Argument interpolation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterpolationError {
    #[error("Not enough arguments provided: ${0} is required")]
    MissingArgument(usize),
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for resolution operations
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

/// Specialized result type for workspace operations
pub type WorkspaceResult<T> = std::result::Result<T, WorkspaceError>;

/// Specialized result type for execution operations
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;

/// Specialized result type for interpolation operations
pub type InterpolationResult<T> = std::result::Result<T, InterpolationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_path() {
        let err = ResolveError::CycleDetected(vec![
            "a".to_string(),
            "b".to_string(),
            "a".to_string(),
        ]);
        assert_eq!(err.to_string(), "Task cycle detected: a => b => a");
    }

    #[test]
    fn test_missing_argument_message() {
        let err = ResolveError::MissingArgument {
            task: "greet".to_string(),
            index: 2,
        };
        assert!(err.to_string().contains("$2"));
        assert!(err.to_string().contains("greet"));
    }

    #[test]
    fn test_errors_convert_into_rds_error() {
        let err: RdsError = ResolveError::UnknownTaskReference("nope".to_string()).into();
        assert!(matches!(err, RdsError::Resolve(_)));

        let err: RdsError = ConfigError::NoTasks(PathBuf::from("ds.toml")).into();
        assert!(matches!(err, RdsError::Config(_)));

        let err: RdsError = WorkspaceError::NoMatchingMembers("core".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Workspace error: No workspace members match core"
        );
    }
}
