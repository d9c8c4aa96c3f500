//! Task listing

use crate::config::{ConfigFile, Task, TaskKind};
use colored::Colorize;
use std::fmt::Write;

/// Render the tasks of a config file for `--list`
pub fn format_task_list(config: &ConfigFile) -> String {
    let mut out = String::new();
    let count = config.tasks.len();
    let _ = writeln!(
        out,
        "{}",
        format!(
            "# Found {} task{} in {}",
            count,
            if count == 1 { "" } else { "s" },
            config.path.display()
        )
        .dimmed()
    );

    for task in config.tasks.iter() {
        let _ = writeln!(out);
        let _ = write!(out, "{}", task.name.bold().cyan());
        if task.suppressed {
            let _ = write!(out, " {}", "(errors ignored)".yellow());
        }
        let _ = writeln!(out);
        if let Some(help) = &task.help {
            let _ = writeln!(out, "    {}", help.green());
        }
        for line in describe(task) {
            let _ = writeln!(out, "    {}", line);
        }
    }
    out
}

fn describe(task: &Task) -> Vec<String> {
    let mut lines = Vec::new();
    if task.kind() == TaskKind::Composite {
        lines.push(format!("[{}]", task.steps.join(", ")));
    }
    let command = task.command_string();
    if !command.trim().is_empty() {
        if task.verbatim {
            lines.extend(command.lines().map(String::from));
        } else {
            lines.push(command.trim().to_string());
        }
    }
    lines
}
