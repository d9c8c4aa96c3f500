//! Task tokens on the command line
//!
//! ```text
//! rds clean --all -- build test: --no-gpu
//! ```
//! A bare word starts a task. `name:` or a standalone `:` starts its
//! arguments explicitly; a token starting with `-` starts them implicitly.
//! `--` ends the arguments. A `+` prefix suppresses the task's errors.

use crate::config::{strip_sigil, ARG_END, ARG_START};
use crate::runner::{ExecutionRequest, RequestItem};

/// Prefix of a token that starts arguments implicitly
const OPTION_PREFIX: &str = "-";

/// Build an execution request from task tokens
pub fn parse_request<S: AsRef<str>>(tokens: &[S]) -> ExecutionRequest {
    let mut items: Vec<RequestItem> = Vec::new();
    let mut has_task = false;
    let mut in_args = false;

    for token in tokens.iter().map(AsRef::as_ref) {
        if has_task && token == ARG_START {
            in_args = true;
            continue;
        }
        if token == ARG_END {
            has_task = false;
            in_args = false;
            continue;
        }
        if has_task && token.starts_with(OPTION_PREFIX) {
            in_args = true;
        }
        if in_args {
            if let Some(item) = items.last_mut() {
                item.args.push(token.to_string());
            }
            continue;
        }

        let name = match token.strip_suffix(ARG_START) {
            Some(name) if !name.is_empty() => {
                in_args = true;
                name
            }
            _ => token,
        };
        if name == ARG_START || name.is_empty() {
            continue;
        }

        let (suppressed, name) = strip_sigil(name);
        items.push(RequestItem::new(name).with_suppressed(suppressed));
        has_task = true;
    }

    ExecutionRequest::new(items)
}
