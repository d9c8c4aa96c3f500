//! Environment layering for spawned commands
//!
//! Later layers override earlier ones. The process environment is always the
//! bottom layer and is inherited by the child, never modified.

use crate::error::{ExecutionError, ExecutionResult};
use std::collections::BTreeMap;
use std::path::Path;

/// Environment variable holding the directory a command runs for
pub const WORKSPACE_DIR_VAR: &str = "RDS_WORKSPACE_DIR";

/// Read `KEY=value` pairs from an env file
pub fn read_env_file(path: &Path) -> ExecutionResult<Vec<(String, String)>> {
    if !path.is_file() {
        return Err(ExecutionError::MissingEnvFile(path.to_path_buf()));
    }

    let env_error = |e: dotenvy::Error| ExecutionError::EnvFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    };
    dotenvy::from_path_iter(path)
        .map_err(env_error)?
        .map(|item| item.map_err(env_error))
        .collect()
}

/// Variables set on top of the inherited process environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvLayers {
    vars: BTreeMap<String, String>,
}

impl EnvLayers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layer of variables
    pub fn layer<I, K, V>(&mut self, vars: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.vars
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Add the contents of an env file as a layer
    pub fn layer_file(&mut self, path: &Path) -> ExecutionResult<&mut Self> {
        let vars = read_env_file(path)?;
        tracing::debug!(path = %path.display(), count = vars.len(), "loaded env file");
        Ok(self.layer(vars))
    }

    /// Look a variable up in the layers, falling back to the process environment
    pub fn get(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| std::env::var(key).ok())
    }

    /// Variables to set on the child process
    pub fn vars(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_read_env_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".env");
        fs::write(&path, "# comment\nA=1\nexport B=\"two words\"\n").unwrap();

        let vars = read_env_file(&path).unwrap();
        assert_eq!(
            vars,
            vec![
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "two words".to_string())
            ]
        );
    }

    #[test]
    fn test_missing_env_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = read_env_file(&temp_dir.path().join("nope.env"));
        assert!(matches!(result, Err(ExecutionError::MissingEnvFile(_))));
    }

    #[test]
    fn test_later_layers_win() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".env");
        fs::write(&path, "A=file\nB=file\n").unwrap();

        let mut env = EnvLayers::new();
        env.layer_file(&path).unwrap().layer([("B", "task"), ("C", "task")]);
        env.layer([("C", "cli")]);

        assert_eq!(env.get("A").as_deref(), Some("file"));
        assert_eq!(env.get("B").as_deref(), Some("task"));
        assert_eq!(env.get("C").as_deref(), Some("cli"));
    }

    #[test]
    fn test_get_falls_back_to_process_env() {
        let env = EnvLayers::new();
        assert_eq!(env.get("PATH"), std::env::var("PATH").ok());
    }
}
