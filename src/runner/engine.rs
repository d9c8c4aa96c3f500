//! Sequential execution of requested tasks
//!
//! Each request item is resolved completely before any of its commands are
//! spawned. Commands run one at a time; the first failing command that is not
//! suppressed stops the rest of the request.

use crate::config::{TaskTable, CONFIG_ENV_VAR};
use crate::error::{RdsError, ResolveError, Result};
use crate::runner::command::execute_command;
use crate::runner::context::Context;
use crate::runner::env::{EnvLayers, WORKSPACE_DIR_VAR};
use crate::runner::resolve::{resolve_invocation, ResolvedStep};
use std::path::{Path, PathBuf};

/// One requested task invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestItem {
    /// Task name or selector, without the suppression sigil
    pub task: String,

    /// Arguments passed to the task
    pub args: Vec<String>,

    /// Whether failures of this invocation are ignored
    pub suppressed: bool,
}

impl RequestItem {
    pub fn new(task: impl Into<String>) -> Self {
        RequestItem {
            task: task.into(),
            args: Vec::new(),
            suppressed: false,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_suppressed(mut self, suppressed: bool) -> Self {
        self.suppressed = suppressed;
        self
    }
}

/// Ordered task invocations from one command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub items: Vec<RequestItem>,
}

impl ExecutionRequest {
    pub fn new(items: Vec<RequestItem>) -> Self {
        ExecutionRequest { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Final state of a request item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    /// Never started because an earlier item failed
    Pending,

    /// Every command exited with 0
    Succeeded,

    /// A command failed (or the item could not be resolved)
    Failed,

    /// Something failed, but the failure was ignored
    Suppressed,
}

/// Outcome of the whole request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Aborted,
}

/// A command that was run (or would have been, in a dry run)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub task: String,
    pub command: String,

    /// Exit code the command actually returned
    pub code: i32,

    pub suppressed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemReport {
    pub task: String,
    pub state: ItemState,
    pub steps: Vec<StepReport>,

    /// Resolution error of a suppressed item
    pub error: Option<ResolveError>,
}

impl ItemReport {
    fn pending(item: &RequestItem) -> Self {
        ItemReport {
            task: item.task.clone(),
            state: ItemState::Pending,
            steps: Vec::new(),
            error: None,
        }
    }
}

/// Result of running a request in one directory
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub items: Vec<ItemReport>,
    pub status: RunStatus,

    /// First failing exit code, or 0
    pub exit_code: i32,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// A workspace member ready to run a request
#[derive(Debug, Clone)]
pub struct MemberPlan {
    /// Member path relative to the workspace root
    pub name: String,

    /// Directory the member's commands run in
    pub dir: PathBuf,

    /// Config file the member's tasks came from
    pub config_path: PathBuf,

    /// Tasks available to the member
    pub tasks: TaskTable,
}

/// Result of running a request in one member
#[derive(Debug)]
pub struct MemberReport {
    pub name: String,
    pub dir: PathBuf,
    pub outcome: Result<RunReport>,
}

impl MemberReport {
    pub fn exit_code(&self) -> i32 {
        match &self.outcome {
            Ok(report) => report.exit_code,
            Err(_) => 1,
        }
    }
}

/// Result of running a request across the workspace
#[derive(Debug)]
pub struct WorkspaceReport {
    pub members: Vec<MemberReport>,

    /// First non-zero member exit code, or 0
    pub exit_code: i32,
}

/// Runs execution requests
pub struct Engine {
    ctx: Context,
}

impl Engine {
    pub fn new(ctx: Context) -> Self {
        Engine { ctx }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Run a request against a task table in `base_dir`
    ///
    /// An unsuppressed resolution error, a missing env file or a command that
    /// cannot be spawned is returned as an error. Non-zero exit codes are not
    /// errors; they are reported in the [`RunReport`].
    pub fn execute(
        &self,
        table: &TaskTable,
        request: &ExecutionRequest,
        base_dir: &Path,
    ) -> Result<RunReport> {
        self.run(table, request, base_dir, self.ctx.config_path.as_deref())
    }

    /// Replay a request in every member, in order
    ///
    /// A failing member does not stop later members.
    pub fn execute_workspace(
        &self,
        request: &ExecutionRequest,
        members: &[MemberPlan],
    ) -> WorkspaceReport {
        let mut reports = Vec::with_capacity(members.len());
        let mut exit_code = 0;

        for member in members {
            tracing::info!(member = %member.name, "running in workspace member");
            let outcome = self.run(&member.tasks, request, &member.dir, Some(&member.config_path));
            let report = MemberReport {
                name: member.name.clone(),
                dir: member.dir.clone(),
                outcome,
            };

            match &report.outcome {
                Ok(run) if !run.success() => {
                    tracing::error!(member = %member.name, code = run.exit_code, "member failed");
                }
                Err(e) => tracing::error!(member = %member.name, error = %e, "member failed"),
                Ok(_) => {}
            }
            if exit_code == 0 {
                exit_code = report.exit_code();
            }
            reports.push(report);
        }

        WorkspaceReport {
            members: reports,
            exit_code,
        }
    }

    fn run(
        &self,
        table: &TaskTable,
        request: &ExecutionRequest,
        base_dir: &Path,
        config_path: Option<&Path>,
    ) -> Result<RunReport> {
        let mut run_env = EnvLayers::new();
        if let Some(path) = &self.ctx.env_file {
            run_env.layer_file(path)?;
        }
        run_env.layer(self.ctx.vars.iter().map(|(k, v)| (k.clone(), v.clone())));

        let mut items: Vec<ItemReport> = request.items.iter().map(ItemReport::pending).collect();
        let mut exit_code = 0;
        let mut status = RunStatus::Completed;

        for (item, report) in request.items.iter().zip(items.iter_mut()) {
            tracing::debug!(task = %item.task, args = ?item.args, "resolving");
            let steps = match resolve_invocation(table, &item.task, &item.args, item.suppressed) {
                Ok(steps) => steps,
                Err(e) if item.suppressed => {
                    tracing::warn!(task = %item.task, error = %e, "ignoring unresolvable task");
                    report.state = ItemState::Suppressed;
                    report.error = Some(e);
                    continue;
                }
                Err(e) => return Err(RdsError::Resolve(e)),
            };

            report.state = ItemState::Succeeded;
            for step in &steps {
                let code = self.run_step(step, base_dir, config_path, &run_env)?;
                report.steps.push(StepReport {
                    task: step.task.clone(),
                    command: step.command.clone(),
                    code,
                    suppressed: step.suppressed,
                });
                if code == 0 {
                    continue;
                }

                if step.suppressed {
                    tracing::warn!(task = %step.task, code, "ignoring failed command");
                    report.state = ItemState::Suppressed;
                    continue;
                }
                tracing::error!(task = %step.task, code, "command failed");
                report.state = ItemState::Failed;
                exit_code = code;
                break;
            }

            if report.state == ItemState::Failed {
                status = RunStatus::Aborted;
                break;
            }
        }

        Ok(RunReport {
            items,
            status,
            exit_code,
        })
    }

    fn run_step(
        &self,
        step: &ResolvedStep,
        base_dir: &Path,
        config_path: Option<&Path>,
        run_env: &EnvLayers,
    ) -> Result<i32> {
        let working_dir = step.cwd.clone().unwrap_or_else(|| base_dir.to_path_buf());

        let mut env = EnvLayers::new();
        if let Some(path) = config_path {
            env.layer([(CONFIG_ENV_VAR, path.to_string_lossy())]);
        }
        env.layer([(WORKSPACE_DIR_VAR, base_dir.to_string_lossy())]);
        if let Some(path) = &step.env_file {
            env.layer_file(path)?;
        }
        env.layer(step.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        env.layer(run_env.vars());

        if step.verbatim {
            tracing::info!(task = %step.task, "\n{}", step.command);
        } else {
            tracing::info!(task = %step.task, "{}", step.command.trim());
        }

        if self.ctx.dry_run {
            return Ok(0);
        }
        let interpreter = self.ctx.interpreter_for(&env);
        Ok(execute_command(&step.command, &working_dir, &env, &interpreter)?)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::Task;
    use std::fs;
    use tempfile::TempDir;

    fn engine() -> Engine {
        Engine::new(Context::new())
    }

    fn request(items: &[&str]) -> ExecutionRequest {
        ExecutionRequest::new(
            items
                .iter()
                .map(|name| match name.strip_prefix('+') {
                    Some(rest) => RequestItem::new(rest).with_suppressed(true),
                    None => RequestItem::new(*name),
                })
                .collect(),
        )
    }

    fn table(tasks: Vec<Task>) -> TaskTable {
        tasks.into_iter().collect()
    }

    #[test]
    fn test_suppressed_failure_keeps_going() {
        let temp_dir = TempDir::new().unwrap();
        let t = table(vec![
            Task::basic("a", "exit 1"),
            Task::basic("b", "touch b.txt"),
        ]);

        let report = engine().execute(&t, &request(&["+a", "b"]), temp_dir.path()).unwrap();
        assert_eq!(report.exit_code, 0);
        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.items[0].state, ItemState::Suppressed);
        assert_eq!(report.items[0].steps[0].code, 1);
        assert!(temp_dir.path().join("b.txt").exists());
    }

    #[test]
    fn test_failure_aborts_request() {
        let temp_dir = TempDir::new().unwrap();
        let t = table(vec![
            Task::basic("a", "exit 1"),
            Task::basic("b", "touch b.txt"),
        ]);

        let report = engine().execute(&t, &request(&["a", "b"]), temp_dir.path()).unwrap();
        assert_eq!(report.exit_code, 1);
        assert_eq!(report.status, RunStatus::Aborted);
        assert_eq!(report.items[0].state, ItemState::Failed);
        assert_eq!(report.items[1].state, ItemState::Pending);
        assert!(!temp_dir.path().join("b.txt").exists());
    }

    #[test]
    fn test_first_failing_code_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let t = table(vec![Task::composite("all", ["exit 7", "exit 9"])]);
        let report = engine().execute(&t, &request(&["all"]), temp_dir.path()).unwrap();
        assert_eq!(report.exit_code, 7);
        assert_eq!(report.items[0].steps.len(), 1);
    }

    #[test]
    fn test_resolution_error_aborts_before_spawning() {
        let temp_dir = TempDir::new().unwrap();
        let t = table(vec![Task::basic("a", "touch a.txt")]);

        let result = engine().execute(&t, &request(&["a", "missing"]), temp_dir.path());
        assert!(matches!(
            result,
            Err(RdsError::Resolve(ResolveError::UnknownTaskReference(_)))
        ));
        // items before the failing one have already run
        assert!(temp_dir.path().join("a.txt").exists());
    }

    #[test]
    fn test_suppressed_resolution_error_is_recorded() {
        let temp_dir = TempDir::new().unwrap();
        let t = table(vec![Task::basic("a", "true")]);

        let report = engine()
            .execute(&t, &request(&["+missing", "a"]), temp_dir.path())
            .unwrap();
        assert_eq!(report.exit_code, 0);
        assert!(report.items[0].error.is_some());
        assert_eq!(report.items[1].state, ItemState::Succeeded);
    }

    #[test]
    fn test_env_precedence() {
        let temp_dir = TempDir::new().unwrap();
        let task_env = temp_dir.path().join("task.env");
        let run_env = temp_dir.path().join("run.env");
        fs::write(&task_env, "A=task-file\nB=task-file\nC=task-file\nD=task-file\n").unwrap();
        fs::write(&run_env, "C=run-file\nD=run-file\n").unwrap();

        let t = table(vec![Task::basic("show", "echo $A $B $C $D > out.txt")
            .with_env_file(&task_env)
            .with_env("B", "task")
            .with_env("C", "task")
            .with_env("D", "task")]);

        let ctx = Context::new()
            .with_env_file(run_env)
            .with_vars([("D".to_string(), "cli".to_string())].into_iter().collect());
        let report = Engine::new(ctx)
            .execute(&t, &request(&["show"]), temp_dir.path())
            .unwrap();
        assert!(report.success());

        let out = fs::read_to_string(temp_dir.path().join("out.txt")).unwrap();
        assert_eq!(out.trim(), "task-file task run-file cli");
    }

    #[test]
    fn test_exports_config_and_workspace_dir() {
        let temp_dir = TempDir::new().unwrap();
        let t = table(vec![Task::basic(
            "show",
            "echo $RDS_CONFIG_FILE $RDS_WORKSPACE_DIR > out.txt",
        )]);
        let ctx = Context::new().with_config_path(PathBuf::from("/p/ds.toml"));

        Engine::new(ctx)
            .execute(&t, &request(&["show"]), temp_dir.path())
            .unwrap();
        let out = fs::read_to_string(temp_dir.path().join("out.txt")).unwrap();
        assert_eq!(out.trim(), format!("/p/ds.toml {}", temp_dir.path().display()));
    }

    #[test]
    fn test_task_cwd() {
        let temp_dir = TempDir::new().unwrap();
        let sub = temp_dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        let t = table(vec![Task::basic("mark", "touch here.txt").with_cwd(&sub)]);

        engine().execute(&t, &request(&["mark"]), temp_dir.path()).unwrap();
        assert!(sub.join("here.txt").exists());
    }

    #[test]
    fn test_dry_run_spawns_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let t = table(vec![Task::basic("a", "touch a.txt && exit 1")]);

        let report = Engine::new(Context::new().with_dry_run(true))
            .execute(&t, &request(&["a"]), temp_dir.path())
            .unwrap();
        assert!(report.success());
        assert_eq!(report.items[0].steps[0].command, "touch a.txt && exit 1");
        assert!(!temp_dir.path().join("a.txt").exists());
    }

    #[test]
    fn test_workspace_replays_request_per_member() {
        let temp_dir = TempDir::new().unwrap();
        let mut plans = Vec::new();
        for (name, cmd) in [("a", "exit 4"), ("b", "touch ran.txt")] {
            let dir = temp_dir.path().join(name);
            fs::create_dir(&dir).unwrap();
            plans.push(MemberPlan {
                name: name.to_string(),
                config_path: dir.join("ds.toml"),
                dir,
                tasks: table(vec![Task::basic("go", cmd)]),
            });
        }

        let report = engine().execute_workspace(&request(&["go"]), &plans);
        assert_eq!(report.exit_code, 4);
        assert_eq!(report.members.len(), 2);
        assert_eq!(report.members[1].exit_code(), 0);
        assert!(temp_dir.path().join("b/ran.txt").exists());
    }

    #[test]
    fn test_workspace_member_errors_do_not_stop_others() {
        let temp_dir = TempDir::new().unwrap();
        let plans = vec![
            MemberPlan {
                name: "empty".to_string(),
                dir: temp_dir.path().to_path_buf(),
                config_path: temp_dir.path().join("ds.toml"),
                tasks: TaskTable::new(),
            },
            MemberPlan {
                name: "ok".to_string(),
                dir: temp_dir.path().to_path_buf(),
                config_path: temp_dir.path().join("ds.toml"),
                tasks: table(vec![Task::basic("go", "touch ok.txt")]),
            },
        ];

        let report = engine().execute_workspace(&request(&["go"]), &plans);
        assert_eq!(report.exit_code, 1);
        assert!(report.members[0].outcome.is_err());
        assert!(temp_dir.path().join("ok.txt").exists());
    }
}
