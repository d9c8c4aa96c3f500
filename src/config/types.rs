//! Core configuration types
//!
//! This module defines the normalized task model every format adapter produces,
//! plus the raw serde shapes a task definition can take inside a config file.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Prefix that marks a task, step or request as error-suppressed
pub const SUPPRESS_SIGIL: &str = "+";

/// Prefix of a disabled task name
pub const DISABLED_PREFIX: &str = "#";

/// Explicit start of task arguments on the command line
pub const ARG_START: &str = ":";

/// Explicit end of task arguments on the command line
pub const ARG_END: &str = "--";

/// A shell command as written in a config file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    /// Shell-invocable string
    Shell(String),

    /// Argv-style list, joined with spaces when run
    Argv(Vec<String>),
}

impl CommandLine {
    /// Normalize to a single shell command string
    pub fn to_shell(&self) -> String {
        match self {
            CommandLine::Shell(cmd) => cmd.clone(),
            CommandLine::Argv(parts) => parts.join(" "),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.to_shell().trim().is_empty()
    }
}

/// Kind of task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// A single shell command
    Basic,

    /// An ordered list of task references and/or shell commands
    Composite,
}

/// A normalized task definition
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    /// Task name
    pub name: String,

    /// Shell command (for composite tasks, runs after all steps)
    pub command: Option<CommandLine>,

    /// Composite steps: task references (with optional inline args) or shell commands
    pub steps: Vec<String>,

    /// Environment variables for this task
    pub env: HashMap<String, String>,

    /// Environment file, resolved relative to the config file
    pub env_file: Option<PathBuf>,

    /// Working directory, resolved relative to the config file
    pub cwd: Option<PathBuf>,

    /// Description for listings
    pub help: Option<String>,

    /// Whether a non-zero exit code is ignored
    pub suppressed: bool,

    /// Whether the command should be shown exactly as written
    pub verbatim: bool,

    /// Config file this task came from
    pub origin: Option<PathBuf>,
}

impl Task {
    /// Create an empty task
    pub fn new(name: impl Into<String>) -> Self {
        Task {
            name: name.into(),
            command: None,
            steps: Vec::new(),
            env: HashMap::new(),
            env_file: None,
            cwd: None,
            help: None,
            suppressed: false,
            verbatim: false,
            origin: None,
        }
    }

    /// Create a basic task from a shell string; a leading `+` marks it suppressed
    pub fn basic(name: impl Into<String>, command: impl Into<String>) -> Self {
        let command: String = command.into();
        let (suppressed, command) = strip_sigil(&command);
        let mut task = Task::new(name);
        task.command = Some(CommandLine::Shell(command.to_string()));
        task.suppressed = suppressed;
        task
    }

    /// Create a composite task from its steps
    pub fn composite<I, S>(name: impl Into<String>, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut task = Task::new(name);
        task.steps = steps.into_iter().map(Into::into).collect();
        task
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_file = Some(path.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_suppressed(mut self, suppressed: bool) -> Self {
        self.suppressed = suppressed;
        self
    }

    /// Composite if it has any steps, basic otherwise
    pub fn kind(&self) -> TaskKind {
        if self.steps.is_empty() {
            TaskKind::Basic
        } else {
            TaskKind::Composite
        }
    }

    /// The command normalized to a shell string (empty if there is none)
    pub fn command_string(&self) -> String {
        self.command
            .as_ref()
            .map(CommandLine::to_shell)
            .unwrap_or_default()
    }
}

/// Split a leading suppression sigil off a command, step or task name
pub fn strip_sigil(s: &str) -> (bool, &str) {
    match s.strip_prefix(SUPPRESS_SIGIL) {
        Some(rest) => (true, rest),
        None => (false, s),
    }
}

/// All tasks from one config file, in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskTable {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
}

impl TaskTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task; a task with the same name is replaced in place
    pub fn insert(&mut self, task: Task) {
        match self.index.get(&task.name) {
            Some(&pos) => self.tasks[pos] = task,
            None => {
                self.index.insert(task.name.clone(), self.tasks.len());
                self.tasks.push(task);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.index.get(name).map(|&pos| &self.tasks[pos])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tasks in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// Task names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl FromIterator<Task> for TaskTable {
    fn from_iter<I: IntoIterator<Item = Task>>(iter: I) -> Self {
        let mut table = TaskTable::new();
        for task in iter {
            table.insert(task);
        }
        table
    }
}

/// Workspace member patterns found in a config file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceSpec {
    /// Key the patterns were found under
    pub key: String,

    /// Ordered member patterns, `!` prefix for negation
    pub members: Vec<String>,

    /// Patterns removed after all member patterns are applied
    pub excludes: Vec<String>,
}

/// A loaded and normalized config file
#[derive(Debug, Clone)]
pub struct ConfigFile {
    /// Path to the config file
    pub path: PathBuf,

    /// Key the tasks were found under
    pub tasks_key: Option<String>,

    /// Task definitions
    pub tasks: TaskTable,

    /// Workspace patterns, if the file defines a workspace
    pub workspace: Option<WorkspaceSpec>,
}

impl ConfigFile {
    /// Directory containing the config file
    pub fn base_dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// File name of the config file (used to look for member-local configs)
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }
}

/// A task definition as it appears in a config file
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawTask {
    /// Simple string command
    Command(String),

    /// List of steps (composite task)
    Steps(Vec<String>),

    /// Table with options
    Detail(RawTaskDetail),
}

/// A task table with options
///
/// Each option accepts the spelling used by pdm or rye as an alias. Using both
/// spellings in one table is rejected by serde as a duplicate field.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawTaskDetail {
    /// Description for listings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,

    /// Command to run
    #[serde(default, alias = "shell", skip_serializing_if = "Option::is_none")]
    pub cmd: Option<RawCommand>,

    /// Steps to run before `cmd`
    #[serde(default, alias = "chain", skip_serializing_if = "Option::is_none")]
    pub composite: Option<Vec<String>>,

    /// Python callable (pyproject.toml only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call: Option<String>,

    /// Environment variables
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, serde_json::Value>,

    /// Environment file, relative to the config file
    #[serde(default, alias = "env-file", skip_serializing_if = "Option::is_none")]
    pub env_file: Option<String>,

    /// Working directory, relative to the config file
    #[serde(default, alias = "working_dir", skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,

    /// Ignore a non-zero exit code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_going: Option<bool>,

    /// Show the command exactly as written
    #[serde(default)]
    pub verbatim: bool,
}

/// A command written as a string or an argv-style list
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawCommand {
    Shell(String),
    Argv(Vec<String>),
}

impl From<RawCommand> for CommandLine {
    fn from(raw: RawCommand) -> Self {
        match raw {
            RawCommand::Shell(cmd) => CommandLine::Shell(cmd),
            RawCommand::Argv(parts) => CommandLine::Argv(parts),
        }
    }
}
