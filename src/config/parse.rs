//! Configuration file discovery and parsing

use crate::config::format::{get_key, load_value};
use crate::config::makefile::RECIPES_KEY;
use crate::config::schema::{build_task, normalize_task_name, TaskSource};
use crate::config::types::{ConfigFile, Task, TaskTable, WorkspaceSpec, DISABLED_PREFIX};
use crate::error::{ConfigError, ConfigResult};
use serde_json::{Map, Value};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file names to search for, in order, in each directory
pub const CONFIG_FILE_NAMES: &[&str] = &[
    "ds.toml",
    "pyproject.toml",
    "package.json",
    "Cargo.toml",
    "composer.json",
    "Makefile",
    "makefile",
    ".ds.toml",
];

/// Keys that may hold task definitions, in priority order
pub const TASK_KEYS: &[&str] = &[
    "scripts",                    // ds.toml, package.json, composer.json
    "tool.ds.scripts",            // pyproject.toml
    "tool.pdm.scripts",           // pyproject.toml
    "tool.rye.scripts",           // pyproject.toml
    "package.metadata.scripts",   // Cargo.toml
    "workspace.metadata.scripts", // Cargo.toml
    RECIPES_KEY,                  // Makefile
];

/// Keys that may hold workspace member patterns, in priority order
pub const WORKSPACE_KEYS: &[&str] = &[
    "workspace.members",          // ds.toml, Cargo.toml
    "tool.ds.workspace.members",  // pyproject.toml
    "tool.rye.workspace.members", // pyproject.toml
    "tool.uv.workspace.members",  // pyproject.toml
    "workspaces",                 // package.json
];

/// Environment variable holding the config file of the current run
pub const CONFIG_ENV_VAR: &str = "RDS_CONFIG_FILE";

/// Find a usable config file by searching the current and parent directories
pub fn find_config(require_workspace: bool) -> ConfigResult<ConfigFile> {
    find_config_from(
        env::current_dir().map_err(|e| {
            ConfigError::Invalid(format!("Failed to get current directory: {}", e))
        })?,
        require_workspace,
    )
}

/// Find a usable config file starting from a specific directory
///
/// Files without a task section (or without a workspace section when one is
/// required) are skipped and the search continues.
pub fn find_config_from(start_dir: PathBuf, require_workspace: bool) -> ConfigResult<ConfigFile> {
    let mut current_dir = start_dir.canonicalize().unwrap_or(start_dir);
    let mut searched_paths = Vec::new();

    loop {
        for file_name in CONFIG_FILE_NAMES {
            let config_path = current_dir.join(file_name);
            searched_paths.push(config_path.display().to_string());

            if !config_path.is_file() {
                continue;
            }
            tracing::debug!(path = %config_path.display(), "checking config file");
            match parse_config_file(&config_path, require_workspace) {
                Ok(config) => return Ok(config),
                Err(ConfigError::NoTasks(_)) | Err(ConfigError::NoWorkspace(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => return Err(ConfigError::NotFound(searched_paths.join(", "))),
        }
    }
}

/// Parse a configuration file from a path
pub fn parse_config_file(path: &Path, require_workspace: bool) -> ConfigResult<ConfigFile> {
    if !path.is_file() {
        return Err(ConfigError::MissingFile(path.to_path_buf()));
    }
    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let contents = fs::read_to_string(&path).map_err(|e| ConfigError::Parse {
        path: path.clone(),
        error: e.to_string(),
    })?;

    let data = load_value(&path, &contents)?;
    parse_config(&data, &path, require_workspace)
}

/// Build a config from an already loaded data tree
pub fn parse_config(data: &Value, path: &Path, require_workspace: bool) -> ConfigResult<ConfigFile> {
    let workspace = parse_workspace(data)?;
    if require_workspace && workspace.is_none() {
        return Err(ConfigError::NoWorkspace(path.to_path_buf()));
    }

    let tasks = parse_tasks(data, path)?;
    if !require_workspace && tasks.is_none() {
        return Err(ConfigError::NoTasks(path.to_path_buf()));
    }
    let (tasks_key, tasks) = match tasks {
        Some((key, table)) => (Some(key), table),
        None => (None, TaskTable::new()),
    };

    tracing::debug!(
        path = %path.display(),
        tasks = tasks.len(),
        workspace = workspace.is_some(),
        "parsed config"
    );

    Ok(ConfigFile {
        path: path.to_path_buf(),
        tasks_key,
        tasks,
        workspace,
    })
}

/// Find workspace member patterns and the matching excludes
pub fn parse_workspace(data: &Value) -> ConfigResult<Option<WorkspaceSpec>> {
    let Some((key, value)) = WORKSPACE_KEYS
        .iter()
        .find_map(|key| get_key(data, key).map(|v| (*key, v)))
    else {
        return Ok(None);
    };

    // yarn allows `"workspaces": {"packages": [...]}`
    let value = match value {
        Value::Object(map) => map.get("packages").unwrap_or(&Value::Null),
        other => other,
    };
    let members = string_list(value, key)?;

    let mut excludes = Vec::new();
    if let Some((parent, _)) = key.rsplit_once('.') {
        let exclude_key = format!("{}.exclude", parent);
        if let Some(value) = get_key(data, &exclude_key) {
            excludes = string_list(value, &exclude_key)?;
        }
    }

    Ok(Some(WorkspaceSpec {
        key: key.to_string(),
        members,
        excludes,
    }))
}

fn string_list(value: &Value, key: &str) -> ConfigResult<Vec<String>> {
    let invalid = || ConfigError::Invalid(format!("'{}' must be a list of strings", key));
    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|v| v.as_str().map(String::from).ok_or_else(invalid))
        .collect()
}

/// Find the task section and normalize every task in it
pub fn parse_tasks(data: &Value, path: &Path) -> ConfigResult<Option<(String, TaskTable)>> {
    let Some((key, section)) = TASK_KEYS
        .iter()
        .find_map(|key| get_key(data, key).map(|v| (*key, v)))
    else {
        return Ok(None);
    };

    let section = section
        .as_object()
        .ok_or_else(|| ConfigError::Invalid(format!("'{}' must be a table", key)))?;
    let source = TaskSource { path, key };
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();

    let mut table = TaskTable::new();
    for (raw_name, value) in section {
        let Some((name, suppressed)) = normalize_task_name(raw_name) else {
            continue;
        };

        let mut task = if file_name == "composer.json" {
            build_composer_task(&name, value, source)?
        } else {
            build_task(&name, value, source)?
        };
        task.suppressed |= suppressed;

        if file_name == "package.json" {
            // non-standard: `"#name": "help text"`
            let help_key = format!("{}{}", DISABLED_PREFIX, raw_name);
            if let Some(help) = section.get(&help_key).and_then(Value::as_str) {
                task.help = Some(help.to_string());
            }
        }
        table.insert(task);
    }

    if file_name == "composer.json" {
        apply_composer_extras(data, key, path, &mut table)?;
    }

    Ok(Some((key.to_string(), table)))
}

/// composer.json: `@name` references another script, `@putenv K=V` sets env
fn build_composer_task(name: &str, value: &Value, source: TaskSource<'_>) -> ConfigResult<Task> {
    let invalid = |error: &str| ConfigError::InvalidTask {
        name: name.to_string(),
        path: source.path.to_path_buf(),
        error: error.to_string(),
    };

    let mut task = match value {
        Value::String(cmd) => match cmd.strip_prefix('@') {
            Some(reference) => Task::composite(name, [reference]),
            None => Task::basic(name, cmd.as_str()),
        },
        Value::Array(items) => {
            let mut task = Task::new(name);
            for item in items {
                let step = item.as_str().ok_or_else(|| invalid("steps must be strings"))?;
                if let Some(rule) = step.strip_prefix("@putenv ") {
                    let (key, val) = rule.split_once('=').unwrap_or((rule, ""));
                    task.env.insert(key.trim().to_string(), val.to_string());
                } else {
                    task.steps.push(step.strip_prefix('@').unwrap_or(step).to_string());
                }
            }
            task
        }
        _ => return Err(invalid("expected a string or a list of strings")),
    };
    task.origin = Some(source.path.to_path_buf());
    Ok(task)
}

/// composer.json: `scripts-descriptions` and `scripts-aliases`
fn apply_composer_extras(
    data: &Value,
    key: &str,
    path: &Path,
    table: &mut TaskTable,
) -> ConfigResult<()> {
    let empty = Map::new();
    let descriptions = get_key(data, &format!("{}-descriptions", key))
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let mut described: Vec<Task> = Vec::new();
    for task in table.iter() {
        if let Some(help) = descriptions.get(&task.name).and_then(Value::as_str) {
            described.push(task.clone().with_help(help));
        }
    }
    for task in described {
        table.insert(task);
    }

    let aliases_key = format!("{}-aliases", key);
    if let Some(aliases) = get_key(data, &aliases_key).and_then(Value::as_object) {
        for (target, names) in aliases {
            for alias in string_list(names, &aliases_key)? {
                let mut task = Task::composite(alias, [target.as_str()]);
                task.origin = Some(path.to_path_buf());
                table.insert(task);
            }
        }
    }
    Ok(())
}
