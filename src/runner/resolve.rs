//! Task reference resolution
//!
//! Expands a requested task (or selector) into the flat, ordered list of shell
//! commands to run. Composite tasks are walked with an explicit work stack;
//! the names of the composites currently being expanded form the visiting
//! path used to detect cycles.

use crate::config::{strip_sigil, Task, TaskTable};
use crate::error::{InterpolationError, ResolveError, ResolveResult};
use crate::runner::interpolate::{interpolate, interpolate_command, split_args};
use glob::Pattern;
use std::collections::HashMap;
use std::path::PathBuf;

/// Characters that make a name a task selector
const GLOB_CHARS: &[char] = &['*', '?', '['];

/// Separator between entries of a selector list
const SELECTOR_SEPARATOR: char = ';';

/// Prefix of a selector entry that removes earlier matches
const SELECTOR_EXCLUDE: &str = "!";

/// A single shell command ready to run
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStep {
    /// Task the command belongs to
    pub task: String,

    /// Fully interpolated shell command
    pub command: String,

    /// Working directory, `None` for the run's base directory
    pub cwd: Option<PathBuf>,

    /// Environment variables (already layered over invoking composites)
    pub env: HashMap<String, String>,

    /// Environment file loaded below `env`
    pub env_file: Option<PathBuf>,

    /// Whether a non-zero exit code is ignored
    pub suppressed: bool,

    /// Whether the command is shown exactly as written
    pub verbatim: bool,
}

/// Settings a composite passes down to the tasks it invokes
#[derive(Debug, Clone, Default)]
struct Inherited {
    cwd: Option<PathBuf>,
    env: HashMap<String, String>,
    env_file: Option<PathBuf>,
    suppressed: bool,
}

enum Work<'a> {
    /// Expand a task invocation
    Enter {
        task: &'a Task,
        args: Vec<String>,
        inherited: Inherited,
    },

    /// Emit a literal shell command
    Emit(ResolvedStep),

    /// Leave a composite task
    Exit,
}

/// Whether a name is a glob selector rather than a plain task name
pub fn is_selector(name: &str) -> bool {
    name.contains(GLOB_CHARS) || name.contains(SELECTOR_SEPARATOR)
}

/// Match a selector against task names
///
/// The selector is a `;`-separated list of glob patterns applied in order; an
/// entry prefixed with `!` removes the tasks it matches from the selection.
/// Matches are returned in declaration order within each entry.
pub fn select_tasks<'a>(table: &'a TaskTable, selector: &str) -> ResolveResult<Vec<&'a Task>> {
    let mut selected: Vec<&'a Task> = Vec::new();

    for entry in selector
        .split(SELECTOR_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        let (exclude, pattern) = match entry.strip_prefix(SELECTOR_EXCLUDE) {
            Some(rest) => (true, rest),
            None => (false, entry),
        };
        let pattern = Pattern::new(pattern).map_err(|e| ResolveError::InvalidSelector {
            selector: selector.to_string(),
            error: e.to_string(),
        })?;

        if exclude {
            selected.retain(|task| !pattern.matches(&task.name));
            continue;
        }
        for task in table.iter() {
            if pattern.matches(&task.name) && !selected.iter().any(|t| t.name == task.name) {
                selected.push(task);
            }
        }
    }

    Ok(selected)
}

/// Find the tasks a requested name refers to
fn lookup<'a>(table: &'a TaskTable, name: &str) -> ResolveResult<Vec<&'a Task>> {
    if let Some(task) = table.get(name) {
        return Ok(vec![task]);
    }
    if is_selector(name) {
        let matches = select_tasks(table, name)?;
        if !matches.is_empty() {
            return Ok(matches);
        }
    }
    Err(ResolveError::UnknownTaskReference(name.to_string()))
}

/// Resolve a task name or selector into runnable steps
///
/// A leading `+` suppresses errors for every step of this invocation.
pub fn resolve(table: &TaskTable, name: &str, args: &[String]) -> ResolveResult<Vec<ResolvedStep>> {
    let (suppressed, name) = strip_sigil(name.trim());
    resolve_invocation(table, name, args, suppressed)
}

/// Resolve a name that has already had its sigil removed
pub fn resolve_invocation(
    table: &TaskTable,
    name: &str,
    args: &[String],
    suppressed: bool,
) -> ResolveResult<Vec<ResolvedStep>> {
    let tasks = lookup(table, name)?;

    let inherited = Inherited {
        suppressed,
        ..Inherited::default()
    };
    let mut stack: Vec<Work<'_>> = tasks
        .into_iter()
        .rev()
        .map(|task| Work::Enter {
            task,
            args: args.to_vec(),
            inherited: inherited.clone(),
        })
        .collect();

    let mut path: Vec<&str> = Vec::new();
    let mut steps = Vec::new();

    while let Some(work) = stack.pop() {
        match work {
            Work::Emit(step) => steps.push(step),
            Work::Exit => {
                path.pop();
            }
            Work::Enter {
                task,
                args,
                inherited,
            } => {
                let scope = Inherited {
                    cwd: task.cwd.clone().or(inherited.cwd),
                    env: layer(inherited.env, &task.env),
                    env_file: task.env_file.clone().or(inherited.env_file),
                    suppressed: inherited.suppressed || task.suppressed,
                };

                if task.steps.is_empty() {
                    if let Some(step) = literal_step(task, &task.command_string(), &args, &scope)? {
                        steps.push(step);
                    }
                    continue;
                }

                if let Some(pos) = path.iter().position(|n| *n == task.name) {
                    let mut cycle: Vec<String> = path[pos..].iter().map(|n| n.to_string()).collect();
                    cycle.push(task.name.clone());
                    return Err(ResolveError::CycleDetected(cycle));
                }
                tracing::debug!(task = %task.name, depth = path.len(), "expanding composite task");
                path.push(&task.name);
                stack.push(Work::Exit);

                // pushed in reverse so they pop in declaration order
                let mut children = Vec::new();
                for step in &task.steps {
                    children.extend(expand_step(table, task, step, &args, &scope)?);
                }
                if let Some(step) = literal_step(task, &task.command_string(), &args, &scope)? {
                    children.push(Work::Emit(step));
                }
                stack.extend(children.into_iter().rev());
            }
        }
    }

    tracing::debug!(task = %name, steps = steps.len(), "resolved task");
    Ok(steps)
}

/// Turn one composite step into work items
fn expand_step<'a>(
    table: &'a TaskTable,
    parent: &Task,
    step: &str,
    args: &[String],
    scope: &Inherited,
) -> ResolveResult<Vec<Work<'a>>> {
    let (forced, step) = strip_sigil(step.trim());
    let step = step.trim();
    let (first, rest) = match step.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim()),
        None => (step, ""),
    };
    if first.is_empty() {
        return Ok(Vec::new());
    }

    let mut inherited = scope.clone();
    inherited.suppressed |= forced;

    let Some(targets) = step_targets(table, first) else {
        let command = match literal_step(parent, step, args, &inherited)? {
            Some(command) => command,
            None => return Ok(Vec::new()),
        };
        return Ok(vec![Work::Emit(command)]);
    };

    let child_args = if rest.is_empty() {
        args.to_vec()
    } else {
        split_args(&interpolate(rest, args).map_err(|e| missing(parent, e))?)
    };

    Ok(targets
        .into_iter()
        .map(|task| Work::Enter {
            task,
            args: child_args.clone(),
            inherited: inherited.clone(),
        })
        .collect())
}

/// Tasks named by the first word of a composite step
///
/// `None` means the step is a shell command. A word that only looks like a
/// selector (`[`, `true;echo`) is a reference only when it matches a task.
fn step_targets<'a>(table: &'a TaskTable, first: &str) -> Option<Vec<&'a Task>> {
    if let Some(task) = table.get(first) {
        return Some(vec![task]);
    }
    if !is_selector(first) {
        return None;
    }
    select_tasks(table, first)
        .ok()
        .filter(|matches| !matches.is_empty())
}

/// A literal shell command run on behalf of `task`; blank commands emit nothing
fn literal_step(
    task: &Task,
    command: &str,
    args: &[String],
    scope: &Inherited,
) -> ResolveResult<Option<ResolvedStep>> {
    if command.trim().is_empty() {
        return Ok(None);
    }
    let command = interpolate_command(command, args).map_err(|e| missing(task, e))?;
    Ok(Some(ResolvedStep {
        task: task.name.clone(),
        command,
        cwd: scope.cwd.clone(),
        env: scope.env.clone(),
        env_file: scope.env_file.clone(),
        suppressed: scope.suppressed,
        verbatim: task.verbatim,
    }))
}

fn layer(mut base: HashMap<String, String>, over: &HashMap<String, String>) -> HashMap<String, String> {
    base.extend(over.iter().map(|(k, v)| (k.clone(), v.clone())));
    base
}

fn missing(task: &Task, error: InterpolationError) -> ResolveError {
    match error {
        InterpolationError::MissingArgument(index) => ResolveError::MissingArgument {
            task: task.name.clone(),
            index,
        },
    }
}
