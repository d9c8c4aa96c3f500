//! Integration tests for task execution
#![cfg(unix)]

mod common;

use common::{create_test_config, read_trimmed};
use rds::config::parse_config_file;
use rds::error::{RdsError, ResolveError};
use rds::runner::{Context, Engine, ExecutionRequest, RequestItem, RunReport, RunStatus};
use tempfile::TempDir;

fn run(config_name: &str, content: &str, items: Vec<RequestItem>) -> (TempDir, rds::Result<RunReport>) {
    let (temp_dir, path) = create_test_config(config_name, content);
    let config = parse_config_file(&path, false).unwrap();
    let engine = Engine::new(Context::new().with_config_path(config.path.clone()));
    let report = engine.execute(&config.tasks, &ExecutionRequest::new(items), &config.base_dir());
    (temp_dir, report)
}

#[test]
fn test_execute_simple_task() {
    let (dir, report) = run(
        "ds.toml",
        "[scripts]\nhello = \"echo hello > out.txt\"\n",
        vec![RequestItem::new("hello")],
    );
    assert!(report.unwrap().success());
    assert_eq!(read_trimmed(dir.path(), "out.txt"), "hello");
}

#[test]
fn test_execute_task_with_arguments() {
    let (dir, report) = run(
        "ds.toml",
        r#"
[scripts]
greet = "echo Hello, ${1:-World} > out.txt"
plain = "echo > args.txt"
"#,
        vec![
            RequestItem::new("greet").with_args(["Rust"]),
            RequestItem::new("plain").with_args(["a", "b c"]),
        ],
    );
    assert!(report.unwrap().success());
    assert_eq!(read_trimmed(dir.path(), "out.txt"), "Hello, Rust");
    // args are appended to a command without placeholders
    assert_eq!(read_trimmed(dir.path(), "args.txt"), "a b c");
}

#[test]
fn test_execute_task_with_failing_command() {
    let (dir, report) = run(
        "ds.toml",
        "[scripts]\nfail = \"exit 2\"\nafter = \"touch after.txt\"\n",
        vec![RequestItem::new("fail"), RequestItem::new("after")],
    );
    let report = report.unwrap();
    assert_eq!(report.exit_code, 2);
    assert_eq!(report.status, RunStatus::Aborted);
    assert!(!dir.path().join("after.txt").exists());
}

#[test]
fn test_suppressed_task_keeps_going() {
    let (dir, report) = run(
        "ds.toml",
        "[scripts]\n\"+fail\" = \"exit 2\"\nafter = \"touch after.txt\"\n",
        vec![RequestItem::new("fail"), RequestItem::new("after")],
    );
    assert_eq!(report.unwrap().exit_code, 0);
    assert!(dir.path().join("after.txt").exists());
}

#[test]
fn test_composite_task_runs_in_order() {
    let (dir, report) = run(
        "ds.toml",
        r#"
[scripts]
one = "echo one >> log.txt"
two = "echo two >> log.txt"
both = ["one", "echo middle >> log.txt", "two"]
"#,
        vec![RequestItem::new("both")],
    );
    assert!(report.unwrap().success());
    assert_eq!(read_trimmed(dir.path(), "log.txt"), "one\nmiddle\ntwo");
}

#[test]
fn test_composite_step_suppression() {
    let (dir, report) = run(
        "ds.toml",
        r#"
[scripts]
a = "exit 1"
b = "touch b.txt"
soft = ["+a", "b"]
hard = ["a", "b"]
"#,
        vec![RequestItem::new("soft")],
    );
    assert_eq!(report.unwrap().exit_code, 0);
    assert!(dir.path().join("b.txt").exists());

    let (dir, report) = run(
        "ds.toml",
        "[scripts]\na = \"exit 1\"\nb = \"touch b.txt\"\nhard = [\"a\", \"b\"]\n",
        vec![RequestItem::new("hard")],
    );
    assert_eq!(report.unwrap().exit_code, 1);
    assert!(!dir.path().join("b.txt").exists());
}

#[test]
fn test_cycle_is_reported_before_running() {
    let (dir, report) = run(
        "ds.toml",
        r#"
[scripts]
a = ["touch ran.txt", "b"]
b = ["a"]
"#,
        vec![RequestItem::new("a")],
    );
    match report {
        Err(RdsError::Resolve(ResolveError::CycleDetected(path))) => {
            assert_eq!(path, vec!["a", "b", "a"]);
        }
        other => panic!("expected a cycle, got {:?}", other),
    }
    assert!(!dir.path().join("ran.txt").exists());
}

#[test]
fn test_task_env_and_cwd_from_config() {
    let (dir, path) = create_test_config(
        "ds.toml",
        r#"
[scripts.show]
cmd = "echo $GREETING > out.txt"
cwd = "sub"
env = { GREETING = "hi" }
"#,
    );
    std::fs::create_dir(dir.path().join("sub")).unwrap();

    let config = parse_config_file(&path, false).unwrap();
    let report = Engine::new(Context::new())
        .execute(
            &config.tasks,
            &ExecutionRequest::new(vec![RequestItem::new("show")]),
            &config.base_dir(),
        )
        .unwrap();
    assert!(report.success());
    assert_eq!(read_trimmed(dir.path(), "sub/out.txt"), "hi");
}

#[test]
fn test_makefile_recipes() {
    let (dir, report) = run(
        "Makefile",
        "build: clean\n\techo built >> log.txt\n\nclean:\n\t-rm -f missing.txt\n\techo cleaned >> log.txt\n",
        vec![RequestItem::new("build")],
    );
    assert!(report.unwrap().success());
    assert_eq!(read_trimmed(dir.path(), "log.txt"), "cleaned\nbuilt");
}

#[test]
fn test_package_json_scripts() {
    let (dir, report) = run(
        "package.json",
        r##"{"scripts": {"#hi": "Say hi", "hi": "echo hi > out.txt"}}"##,
        vec![RequestItem::new("hi")],
    );
    assert!(report.unwrap().success());
    assert_eq!(read_trimmed(dir.path(), "out.txt"), "hi");
}
