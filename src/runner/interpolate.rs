//! Argument interpolation for task commands
//!
//! Commands may refer to the arguments a task was called with:
//! - `$1`, `${1}` - a positional argument (1-indexed, required)
//! - `${1:-default}` - a positional argument with a fallback
//! - `$@`, `${@:-default}` - the arguments not claimed by a positional reference
//! - `{args}`, `{args:default}` - the pdm spelling of `$@`
//!
//! `$0` is never treated as a placeholder.

use crate::error::{InterpolationError, InterpolationResult};
use regex::{Captures, Regex};
use std::sync::LazyLock;

static ARG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(@|[1-9][0-9]*)|\$\{(@|[1-9][0-9]*)(?::-(.*?))?\}|\{args(?::(.*?))?\}")
        .expect("argument pattern is valid")
});

const REST: &str = "@";

/// Whether a template refers to any argument
pub fn has_placeholders(template: &str) -> bool {
    ARG_RE.is_match(template)
}

/// Interpolate `args` into `template`
///
/// Remaining arguments (`$@`) are the ones after the highest positional index
/// referenced anywhere in the template, or all of them when there is none.
pub fn interpolate(template: &str, args: &[String]) -> InterpolationResult<String> {
    let highest = ARG_RE
        .captures_iter(template)
        .filter_map(|caps| position(&caps))
        .max()
        .unwrap_or(0);
    let rest = &args[highest.min(args.len())..];

    let mut missing = None;
    let result = ARG_RE.replace_all(template, |caps: &Captures| {
        let default = caps.get(3).or_else(|| caps.get(4)).map(|m| m.as_str());
        match position(caps) {
            None => {
                if rest.is_empty() {
                    default.unwrap_or_default().to_string()
                } else {
                    join_quoted(rest)
                }
            }
            Some(index) => match (args.get(index - 1), default) {
                (Some(arg), _) => arg.clone(),
                (None, Some(default)) => default.to_string(),
                (None, None) => {
                    missing.get_or_insert(index);
                    String::new()
                }
            },
        }
    });

    match missing {
        Some(index) => Err(InterpolationError::MissingArgument(index)),
        None => Ok(result.into_owned()),
    }
}

/// Interpolate a task command
///
/// Like [`interpolate`], except that a template without any placeholder gets
/// the arguments appended to the end.
pub fn interpolate_command(template: &str, args: &[String]) -> InterpolationResult<String> {
    if args.is_empty() || has_placeholders(template) {
        return interpolate(template, args);
    }
    Ok(format!("{} {}", template.trim_end(), join_quoted(args)))
}

/// Positional index of a match, `None` for the remaining-arguments form
fn position(caps: &Captures) -> Option<usize> {
    let name = caps.get(1).or_else(|| caps.get(2))?.as_str();
    if name == REST {
        return None;
    }
    // indices too large for usize can never be satisfied
    Some(name.parse().unwrap_or(usize::MAX))
}

fn join_quoted(args: &[String]) -> String {
    args.iter()
        .map(|arg| shell_quote(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Quote an argument so the shell reads it back as a single word
///
/// Arguments made only of safe characters are returned as-is.
pub fn shell_quote(value: &str) -> String {
    if value.is_empty() {
        return "''".to_string();
    }
    let safe = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./-_".contains(c));
    if safe {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(ch);
        }
    }
    out.push('\'');
    out
}

/// Split an inline argument string into words
///
/// Understands single quotes, double quotes and backslash escapes; does not
/// expand anything.
pub fn split_args(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' => {
                in_word = true;
                for c in chars.by_ref() {
                    if c == '\'' {
                        break;
                    }
                    current.push(c);
                }
            }
            '"' => {
                in_word = true;
                while let Some(c) = chars.next() {
                    match c {
                        '"' => break,
                        '\\' => match chars.next() {
                            Some(n @ ('"' | '\\' | '$' | '`')) => current.push(n),
                            Some(n) => {
                                current.push('\\');
                                current.push(n);
                            }
                            None => current.push('\\'),
                        },
                        c => current.push(c),
                    }
                }
            }
            '\\' => {
                in_word = true;
                if let Some(c) = chars.next() {
                    current.push(c);
                }
            }
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }
    if in_word {
        words.push(current);
    }
    words
}
