//! Task normalization and validation
//!
//! Turns the raw shapes found in a config file into normalized [`Task`]s and
//! enforces the task naming rules.

use crate::config::types::{
    strip_sigil, CommandLine, RawTask, RawTaskDetail, Task, ARG_START, DISABLED_PREFIX,
};
use crate::error::{ConfigError, ConfigResult};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Where a set of task definitions came from
#[derive(Debug, Clone, Copy)]
pub struct TaskSource<'a> {
    /// Config file path
    pub path: &'a Path,

    /// Key the tasks were found under (e.g. `tool.pdm.scripts`)
    pub key: &'a str,
}

impl TaskSource<'_> {
    fn base_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    fn is_pyproject(&self) -> bool {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("pyproject"))
    }

    fn invalid(&self, name: &str, error: impl Into<String>) -> ConfigError {
        ConfigError::InvalidTask {
            name: name.to_string(),
            path: self.path.to_path_buf(),
            error: error.into(),
        }
    }
}

/// Normalize a task name as written in a config file
///
/// Returns `None` for disabled tasks (empty, or starting with `#`). A leading
/// `+` is removed and reported as suppression; a trailing `:` is removed.
pub fn normalize_task_name(raw: &str) -> Option<(String, bool)> {
    let name = raw.trim();
    if name.is_empty() || name.starts_with(DISABLED_PREFIX) {
        return None;
    }

    let (suppressed, name) = strip_sigil(name);
    let name = name.strip_suffix(ARG_START).unwrap_or(name).trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), suppressed))
}

/// Build a task from a raw config value
pub fn build_task(name: &str, value: &Value, source: TaskSource<'_>) -> ConfigResult<Task> {
    let raw: RawTask = serde_json::from_value(value.clone())
        .map_err(|e| source.invalid(name, format!("unknown task type: {}", e)))?;

    let mut task = match raw {
        RawTask::Command(cmd) => Task::basic(name, cmd),
        // rye: a bare list is an argv command, not a composite task
        RawTask::Steps(parts) if source.key == "tool.rye.scripts" => {
            let mut task = Task::new(name);
            task.command = Some(CommandLine::Argv(parts));
            task
        }
        RawTask::Steps(steps) => Task::composite(name, steps),
        RawTask::Detail(detail) => build_detailed_task(name, detail, source)?,
    };
    task.origin = Some(source.path.to_path_buf());
    Ok(task)
}

fn build_detailed_task(
    name: &str,
    detail: RawTaskDetail,
    source: TaskSource<'_>,
) -> ConfigResult<Task> {
    let mut task = Task::new(name);
    task.help = detail.help.filter(|h| !h.is_empty());
    task.verbatim = detail.verbatim;

    let mut found = false;
    if let Some(steps) = detail.composite {
        found = true;
        task.steps = steps;
    }

    if let Some(cmd) = detail.cmd {
        found = true;
        let command = CommandLine::from(cmd);
        // a leading sigil on the command marks the whole task
        task.command = Some(match command {
            CommandLine::Shell(s) => {
                let (suppressed, s) = strip_sigil(&s);
                task.suppressed = suppressed;
                CommandLine::Shell(s.to_string())
            }
            argv => argv,
        });
    } else if let Some(call) = detail.call {
        if !source.is_pyproject() {
            return Err(source.invalid(name, "`call` is only supported in pyproject.toml"));
        }
        found = true;
        task.command = Some(CommandLine::Shell(python_call(&call)));
    }

    if !found {
        return Err(source.invalid(name, "expected one of `cmd`, `composite` or `call`"));
    }

    if let Some(keep_going) = detail.keep_going {
        task.suppressed = keep_going;
    }

    task.env = detail
        .env
        .into_iter()
        .map(|(k, v)| (k, env_value(v)))
        .collect();

    let base = source.base_dir();
    task.env_file = detail.env_file.map(|p| resolve_relative(base, &p));
    task.cwd = detail.cwd.map(|p| resolve_relative(base, &p));

    Ok(task)
}

/// Environment values may be written as numbers or booleans
fn env_value(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn resolve_relative(base: &Path, path: &str) -> PathBuf {
    let joined = base.join(path);
    joined.canonicalize().unwrap_or(joined)
}

/// Format a Python `call` target as a shell command
///
/// `pkg` runs the module; `pkg:fn` imports the package and calls `fn`
/// (adding `()` when no call is written).
pub fn python_call(call: &str) -> String {
    match call.split_once(':') {
        None => format!("python -m {}", call),
        Some((pkg, func)) => {
            let func = if func.ends_with(')') {
                func.to_string()
            } else {
                format!("{}()", func)
            };
            format!(
                "python -c 'import sys, {} as _1; sys.exit(_1.{})'",
                pkg, func
            )
        }
    }
}
