//! Run-wide execution settings
//!
//! The context carries everything that applies to every command of a run:
//! where the config file lives, command-line environment overrides and
//! whether commands are actually spawned.

use crate::runner::env::EnvLayers;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

/// Execution context shared by all request items of a run
#[derive(Debug, Clone)]
pub struct Context {
    /// Base directory for tasks without their own `cwd`
    pub working_dir: PathBuf,

    /// Configuration file path, exported to commands
    pub config_path: Option<PathBuf>,

    /// Run-wide env file (`--env-file`)
    pub env_file: Option<PathBuf>,

    /// Run-wide variables (`--env`), highest precedence
    pub vars: HashMap<String, String>,

    /// Log commands instead of running them
    pub dry_run: bool,
}

impl Context {
    /// Create a new context with default settings
    pub fn new() -> Self {
        Context {
            working_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_path: None,
            env_file: None,
            vars: HashMap::new(),
            dry_run: false,
        }
    }

    /// Create a context with a specific working directory
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = dir;
        self
    }

    /// Set the configuration file path
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    /// Set the run-wide env file
    pub fn with_env_file(mut self, path: PathBuf) -> Self {
        self.env_file = Some(path);
        self
    }

    /// Set variables
    pub fn with_vars(mut self, vars: HashMap<String, String>) -> Self {
        self.vars = vars;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Interpreter used to run a command with the given environment
    ///
    /// `$SHELL -c` from the command's environment, `sh -c` when unset and
    /// `cmd /C` on Windows.
    pub fn interpreter_for(&self, env: &EnvLayers) -> Vec<String> {
        if cfg!(windows) {
            return vec!["cmd".to_string(), "/C".to_string()];
        }
        let shell = env
            .get("SHELL")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "sh".to_string());
        vec![shell, "-c".to_string()]
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
