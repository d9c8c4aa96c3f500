//! Main CLI application

use crate::cli::list::format_task_list;
use crate::cli::request::parse_request;
use crate::config::{find_config_from, parse_config_file, ConfigFile, CONFIG_ENV_VAR};
use crate::error::{ConfigError, WorkspaceError};
use crate::logging::{init_logging, Verbosity};
use crate::runner::{Context, Engine, ExecutionRequest, MemberPlan};
use crate::workspace::{filter_members, resolve_workspace};
use anyhow::{anyhow, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use clap_complete::Shell;
use std::collections::HashMap;
use std::env;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

/// Settings collected from the command line
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub verbosity: Option<Verbosity>,
    pub dry_run: bool,
    pub list: bool,
    pub cwd: Option<PathBuf>,
    pub file: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
    pub env: HashMap<String, String>,
    pub workspace: Vec<String>,
    pub request: ExecutionRequest,
}

/// Build the clap command
pub fn build_command() -> Command {
    Command::new("rds")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Run dev scripts")
        .after_help(
            "Tasks run in order. A failing task stops the run unless it is prefixed \
             with `+`.\nUse `name:` (or a lone `:`) to start task arguments and `--` to end them.",
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Show debug messages")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print verbose output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print command output and errors")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Print no output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Show which tasks would be run, but don't run them")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list")
                .short('l')
                .long("list")
                .help("List available tasks and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("cwd")
                .long("cwd")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .help("Set the starting working directory (default: config file directory)"),
        )
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .help("File with task and workspace definitions (default: search in parents)"),
        )
        .arg(
            Arg::new("env-file")
                .long("env-file")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .help("File with environment variables, read before --env values"),
        )
        .arg(
            Arg::new("env")
                .short('e')
                .long("env")
                .value_name("NAME=VALUE")
                .action(ArgAction::Append)
                .help("Set an environment variable (may be repeated)"),
        )
        .arg(
            Arg::new("workspace")
                .short('w')
                .long("workspace")
                .value_name("GLOB")
                .action(ArgAction::Append)
                .help("Run tasks in matching workspace members ('*' for all)"),
        )
        .arg(
            Arg::new("completions")
                .long("completions")
                .value_name("SHELL")
                .value_parser(value_parser!(Shell))
                .help("Print a shell completion script and exit"),
        )
        .arg(
            Arg::new("tasks")
                .value_name("TASK")
                .num_args(0..)
                .trailing_var_arg(true)
                .help("Tasks to run, with optional arguments"),
        )
}

/// Turn parsed matches into options
pub fn parse_options(matches: &ArgMatches) -> Result<Options> {
    let mut env = HashMap::new();
    for pair in matches.get_many::<String>("env").into_iter().flatten() {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("--env expects NAME=VALUE, got '{}'", pair))?;
        env.insert(key.to_string(), value.to_string());
    }

    let tasks: Vec<&String> = matches.get_many::<String>("tasks").into_iter().flatten().collect();

    Ok(Options {
        verbosity: get_verbosity(matches),
        dry_run: matches.get_flag("dry-run"),
        list: matches.get_flag("list"),
        cwd: matches.get_one::<PathBuf>("cwd").map(|p| absolute(p)),
        file: matches.get_one::<PathBuf>("file").map(|p| absolute(p)),
        env_file: matches.get_one::<PathBuf>("env-file").map(|p| absolute(p)),
        env,
        workspace: matches
            .get_many::<String>("workspace")
            .into_iter()
            .flatten()
            .cloned()
            .collect(),
        request: parse_request(&tasks),
    })
}

/// Get verbosity level from matches
fn get_verbosity(matches: &ArgMatches) -> Option<Verbosity> {
    if matches.get_flag("debug") {
        Some(Verbosity::Debug)
    } else if matches.get_flag("silent") {
        Some(Verbosity::Silent)
    } else if matches.get_flag("quiet") {
        Some(Verbosity::Quiet)
    } else if matches.get_flag("verbose") {
        Some(Verbosity::Verbose)
    } else {
        None
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    env::current_dir()
        .map(|dir| dir.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Load the config file named on the command line, in the environment, or
/// found by searching upwards
fn load_config(options: &Options) -> crate::Result<ConfigFile> {
    let require_workspace = !options.workspace.is_empty();
    let file = options
        .file
        .clone()
        .or_else(|| env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));

    let config = match file {
        Some(path) => parse_config_file(&path, require_workspace)?,
        None => {
            let start = match &options.cwd {
                Some(cwd) => cwd.clone(),
                None => env::current_dir()?,
            };
            find_config_from(start, require_workspace)?
        }
    };
    tracing::debug!(path = %config.path.display(), "using config");
    Ok(config)
}

/// Resolve, select and load the workspace members to run in
fn plan_members(config: &ConfigFile, selectors: &[String]) -> crate::Result<Vec<MemberPlan>> {
    let spec = config
        .workspace
        .as_ref()
        .ok_or_else(|| ConfigError::NoWorkspace(config.path.clone()))?;
    let config_name = config.file_name().unwrap_or_default();
    let base_dir = config.base_dir();

    let members = resolve_workspace(&spec.members, &spec.excludes, &base_dir, config_name)?;
    let selected = filter_members(&members, selectors)?;
    if selected.is_empty() {
        return Err(WorkspaceError::NoMatchingMembers(selectors.join(", ")).into());
    }

    let mut plans = Vec::with_capacity(selected.len());
    for member in selected {
        let dir = member.resolved_absolute_path.clone();
        let own_path = dir.join(config_name);
        let (config_path, tasks) = if member.has_own_config {
            match parse_config_file(&own_path, false) {
                Ok(own) => (own.path, own.tasks),
                Err(ConfigError::NoTasks(_)) => {
                    tracing::debug!(member = %member.display_path(), "member config has no tasks; using workspace tasks");
                    (config.path.clone(), config.tasks.clone())
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            (config.path.clone(), config.tasks.clone())
        };

        plans.push(MemberPlan {
            name: member.display_path(),
            dir,
            config_path,
            tasks,
        });
    }
    Ok(plans)
}

/// Run with already parsed options; returns the exit code
pub fn run_with(options: Options) -> Result<i32> {
    let config = load_config(&options)?;

    if options.list || options.request.is_empty() {
        print!("{}", format_task_list(&config));
        return Ok(0);
    }

    let mut ctx = Context::new()
        .with_working_dir(options.cwd.clone().unwrap_or_else(|| config.base_dir()))
        .with_config_path(config.path.clone())
        .with_vars(options.env.clone())
        .with_dry_run(options.dry_run);
    if let Some(path) = &options.env_file {
        ctx = ctx.with_env_file(path.clone());
    }
    let engine = Engine::new(ctx);

    if !options.workspace.is_empty() {
        let plans = plan_members(&config, &options.workspace)?;
        let report = engine.execute_workspace(&options.request, &plans);
        for member in &report.members {
            if let Err(e) = &member.outcome {
                eprintln!("Error in {}: {}", member.name, e);
            }
        }
        return Ok(report.exit_code);
    }

    let working_dir = engine.context().working_dir.clone();
    let report = engine.execute(&config.tasks, &options.request, &working_dir)?;
    Ok(report.exit_code)
}

/// Run the CLI application with provided arguments
pub fn run_from<I, T>(args: I) -> Result<i32>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut command = build_command();
    let matches = command.clone().get_matches_from(args);

    if let Some(shell) = matches.get_one::<Shell>("completions").copied() {
        clap_complete::generate(shell, &mut command, "rds", &mut io::stdout());
        return Ok(0);
    }

    let options = parse_options(&matches)?;
    init_logging(options.verbosity)?;
    run_with(options)
}

/// Run the CLI application with the process arguments
pub fn run() -> Result<i32> {
    run_from(env::args_os())
}
