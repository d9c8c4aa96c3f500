//! Command execution
//!
//! Spawns one shell command through the interpreter and waits for it.

use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::env::EnvLayers;
use std::path::Path;
use std::process::{Command as StdCommand, Stdio};

/// Exit code reported when a command was ended by a signal
pub const SIGNAL_EXIT_CODE: i32 = 1;

/// Run a shell command and return its exit code
pub fn execute_command(
    command_line: &str,
    working_dir: &Path,
    env: &EnvLayers,
    interpreter: &[String],
) -> ExecutionResult<i32> {
    if !working_dir.is_dir() {
        return Err(ExecutionError::MissingDirectory(working_dir.to_path_buf()));
    }
    let Some((program, interpreter_args)) = interpreter.split_first() else {
        return Err(ExecutionError::Spawn {
            command: command_line.to_string(),
            error: "no interpreter configured".to_string(),
        });
    };

    let mut command = StdCommand::new(program);
    command
        .args(interpreter_args)
        .arg(command_line)
        .current_dir(working_dir)
        .envs(env.vars())
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    let status = command.status().map_err(|e| ExecutionError::Spawn {
        command: command_line.to_string(),
        error: e.to_string(),
    })?;

    Ok(status.code().unwrap_or(SIGNAL_EXIT_CODE))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sh() -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string()]
    }

    #[test]
    fn test_execute_simple_command() {
        let temp_dir = TempDir::new().unwrap();
        let code = execute_command("true", temp_dir.path(), &EnvLayers::new(), &sh()).unwrap();
        assert_eq!(code, 0);
    }

    #[test]
    fn test_execute_failing_command() {
        let temp_dir = TempDir::new().unwrap();
        let code = execute_command("exit 3", temp_dir.path(), &EnvLayers::new(), &sh()).unwrap();
        assert_eq!(code, 3);
    }

    #[test]
    fn test_command_sees_env_and_cwd() {
        let temp_dir = TempDir::new().unwrap();
        let mut env = EnvLayers::new();
        env.layer([("GREETING", "hello")]);

        let code = execute_command("echo $GREETING > out.txt", temp_dir.path(), &env, &sh()).unwrap();
        assert_eq!(code, 0);
        let out = fs::read_to_string(temp_dir.path().join("out.txt")).unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[test]
    fn test_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let result = execute_command("true", &temp_dir.path().join("nope"), &EnvLayers::new(), &sh());
        assert!(matches!(result, Err(ExecutionError::MissingDirectory(_))));
    }

    #[test]
    fn test_spawn_failure() {
        let temp_dir = TempDir::new().unwrap();
        let interpreter = vec!["/definitely/not/a/shell".to_string(), "-c".to_string()];
        let result = execute_command("true", temp_dir.path(), &EnvLayers::new(), &interpreter);
        assert!(matches!(result, Err(ExecutionError::Spawn { .. })));
    }
}
