//! Workspace member resolution
//!
//! Member patterns are globs relative to the config file's directory, applied
//! strictly in order: a plain pattern adds the directories it matches, a
//! `!pattern` removes members it matches, and a later plain pattern can add a
//! removed member back (at the end). The exclude list is applied last.

use crate::error::{WorkspaceError, WorkspaceResult};
use glob::{MatchOptions, Pattern};
use globset::Glob;
use std::path::{Path, PathBuf};

/// Prefix of a negated pattern or selector
const NEGATION: &str = "!";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A directory that belongs to the workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceMember {
    /// Pattern that (last) included this member
    pub pattern_source: String,

    /// Path relative to the workspace root
    pub relative_path: PathBuf,

    /// Canonical absolute path
    pub resolved_absolute_path: PathBuf,

    /// Whether the member has a config file of the same name as the root
    pub has_own_config: bool,
}

impl WorkspaceMember {
    /// Relative path with `/` separators, as patterns see it
    pub fn display_path(&self) -> String {
        self.relative_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Last component of the member's path
    pub fn dir_name(&self) -> String {
        self.resolved_absolute_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// A validated member pattern
struct MemberPattern {
    source: String,
    negated: bool,
    relative: String,
    pattern: Pattern,
}

impl MemberPattern {
    fn parse(source: &str, force_negated: bool) -> WorkspaceResult<Self> {
        let (negated, raw) = match source.strip_prefix(NEGATION) {
            Some(rest) => (true, rest),
            None => (force_negated, source),
        };
        let relative = raw
            .trim()
            .trim_start_matches("./")
            .trim_end_matches('/')
            .to_string();
        let pattern = Pattern::new(&relative).map_err(|e| WorkspaceError::GlobSyntax {
            pattern: source.to_string(),
            error: e.to_string(),
        })?;
        Ok(MemberPattern {
            source: source.to_string(),
            negated,
            relative,
            pattern,
        })
    }

    fn matches(&self, member: &WorkspaceMember) -> bool {
        self.pattern
            .matches_with(&member.display_path(), MATCH_OPTIONS)
    }
}

/// Expand ordered member patterns against `base_dir`
///
/// `config_name` is the root config's file name; a member containing a file
/// of that name is flagged with `has_own_config`.
pub fn resolve_workspace(
    patterns: &[String],
    excludes: &[String],
    base_dir: &Path,
    config_name: &str,
) -> WorkspaceResult<Vec<WorkspaceMember>> {
    // every pattern is validated before the filesystem is touched
    let mut ordered = patterns
        .iter()
        .map(|p| MemberPattern::parse(p, false))
        .collect::<WorkspaceResult<Vec<_>>>()?;
    for exclude in excludes {
        ordered.push(MemberPattern::parse(exclude, true)?);
    }

    let base_dir = base_dir.canonicalize().map_err(|e| WorkspaceError::Member {
        path: base_dir.to_path_buf(),
        error: e.to_string(),
    })?;
    let base_glob = Pattern::escape(&base_dir.to_string_lossy());

    let mut members: Vec<WorkspaceMember> = Vec::new();
    for pattern in &ordered {
        if pattern.negated {
            let before = members.len();
            members.retain(|m| !pattern.matches(m));
            tracing::debug!(pattern = %pattern.source, removed = before - members.len(), "applied workspace exclusion");
            continue;
        }

        let full = format!("{}/{}", base_glob, pattern.relative);
        let entries = glob::glob_with(&full, MATCH_OPTIONS).map_err(|e| WorkspaceError::GlobSyntax {
            pattern: pattern.source.clone(),
            error: e.to_string(),
        })?;

        let mut added = 0;
        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable workspace path");
                    continue;
                }
            };
            if !path.is_dir() {
                continue;
            }
            let resolved = path.canonicalize().map_err(|e| WorkspaceError::Member {
                path: path.clone(),
                error: e.to_string(),
            })?;
            if members.iter().any(|m| m.resolved_absolute_path == resolved) {
                continue;
            }

            let relative_path = path
                .strip_prefix(&base_dir)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| path.clone());
            members.push(WorkspaceMember {
                pattern_source: pattern.source.clone(),
                relative_path,
                has_own_config: resolved.join(config_name).is_file(),
                resolved_absolute_path: resolved,
            });
            added += 1;
        }

        if added == 0 {
            tracing::warn!(pattern = %pattern.source, "workspace pattern matched no new directories");
        }
    }

    tracing::debug!(count = members.len(), "resolved workspace members");
    Ok(members)
}

/// Select members by `--workspace` globs
///
/// A selector matches a member's relative path or its directory name. A
/// `!selector` removes members selected so far. The result keeps member order.
pub fn filter_members(
    members: &[WorkspaceMember],
    selectors: &[String],
) -> WorkspaceResult<Vec<WorkspaceMember>> {
    let mut selected = vec![false; members.len()];

    for selector in selectors {
        let (negated, raw) = match selector.strip_prefix(NEGATION) {
            Some(rest) => (true, rest),
            None => (false, selector.as_str()),
        };
        let matcher = Glob::new(raw.trim().trim_end_matches('/'))
            .map_err(|e| WorkspaceError::GlobSyntax {
                pattern: selector.clone(),
                error: e.to_string(),
            })?
            .compile_matcher();

        for (member, flag) in members.iter().zip(selected.iter_mut()) {
            if matcher.is_match(member.display_path()) || matcher.is_match(member.dir_name()) {
                *flag = !negated;
            }
        }
    }

    Ok(members
        .iter()
        .zip(selected)
        .filter(|(_, keep)| *keep)
        .map(|(member, _)| member.clone())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn layout() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        for dir in ["members/a", "members/b", "members/x", "other/deep/c"] {
            fs::create_dir_all(temp_dir.path().join(dir)).unwrap();
        }
        fs::write(temp_dir.path().join("members/notes.txt"), "not a dir").unwrap();
        fs::write(temp_dir.path().join("members/b/ds.toml"), "[scripts]\n").unwrap();
        temp_dir
    }

    fn paths(members: &[WorkspaceMember]) -> Vec<String> {
        members.iter().map(WorkspaceMember::display_path).collect()
    }

    #[test]
    fn test_negation_removes_member() {
        let root = layout();
        let members = resolve_workspace(
            &strings(&["members/*", "!members/x"]),
            &[],
            root.path(),
            "ds.toml",
        )
        .unwrap();
        assert_eq!(paths(&members), vec!["members/a", "members/b"]);
    }

    #[test]
    fn test_reinclude_appends_at_end() {
        let root = layout();
        let members = resolve_workspace(
            &strings(&["members/*", "!members/x", "members/x"]),
            &[],
            root.path(),
            "ds.toml",
        )
        .unwrap();
        assert_eq!(paths(&members), vec!["members/a", "members/b", "members/x"]);
    }

    #[test]
    fn test_excludes_apply_last() {
        let root = layout();
        let members = resolve_workspace(
            &strings(&["members/*"]),
            &strings(&["members/a"]),
            root.path(),
            "ds.toml",
        )
        .unwrap();
        assert_eq!(paths(&members), vec!["members/b", "members/x"]);
    }

    #[test]
    fn test_only_directories_and_no_duplicates() {
        let root = layout();
        let members = resolve_workspace(
            &strings(&["members/*", "members/a", "./members/b/"]),
            &[],
            root.path(),
            "ds.toml",
        )
        .unwrap();
        assert_eq!(paths(&members), vec!["members/a", "members/b", "members/x"]);
        assert_eq!(members[0].pattern_source, "members/*");
    }

    #[test]
    fn test_star_does_not_cross_separators() {
        let root = layout();
        let members = resolve_workspace(&strings(&["other/*"]), &[], root.path(), "ds.toml").unwrap();
        assert_eq!(paths(&members), vec!["other/deep"]);

        let members = resolve_workspace(&strings(&["other/**/c"]), &[], root.path(), "ds.toml").unwrap();
        assert_eq!(paths(&members), vec!["other/deep/c"]);
    }

    #[test]
    fn test_has_own_config() {
        let root = layout();
        let members = resolve_workspace(&strings(&["members/*"]), &[], root.path(), "ds.toml").unwrap();
        let flags: Vec<_> = members.iter().map(|m| m.has_own_config).collect();
        assert_eq!(flags, vec![false, true, false]);
    }

    #[test]
    fn test_bad_pattern_fails_before_matching() {
        let root = layout();
        let result = resolve_workspace(
            &strings(&["members/*", "members/[a"]),
            &[],
            root.path(),
            "ds.toml",
        );
        assert!(matches!(result, Err(WorkspaceError::GlobSyntax { .. })));
    }

    #[test]
    fn test_filter_members() {
        let root = layout();
        let members = resolve_workspace(&strings(&["members/*"]), &[], root.path(), "ds.toml").unwrap();

        let all = filter_members(&members, &strings(&["*"])).unwrap();
        assert_eq!(all.len(), 3);

        let some = filter_members(&members, &strings(&["x", "members/a", "x"])).unwrap();
        assert_eq!(paths(&some), vec!["members/a", "members/x"]);

        let most = filter_members(&members, &strings(&["*", "!b"])).unwrap();
        assert_eq!(paths(&most), vec!["members/a", "members/x"]);

        assert!(filter_members(&members, &[]).unwrap().is_empty());
    }
}
