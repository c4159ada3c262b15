//! Upstream file editor.
//!
//! # Responsibilities
//! - Disable an instance's entry by prefixing the marker
//! - Restore a marked entry by stripping the marker
//! - Leave every other byte of the file untouched
//!
//! # Design Decisions
//! - Whole-file read, pure rewrite, single atomic write
//! - Dry-run computes the same result but never writes
//! - Missing file is "nothing to do", not a crash

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::UpstreamConfig;
use crate::observability::metrics;
use crate::storage::write_atomic;
use crate::upstream::entry::{EntryGrammar, EntryState, UpstreamEntry, UpstreamLine};

/// Errors that can occur while editing the upstream file.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The file could not be opened for reading.
    #[error("upstream config not found: {0}")]
    ConfigNotFound(PathBuf),

    /// Reading or writing failed.
    #[error("upstream config I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Which way an edit goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Disable,
    Enable,
}

impl Edit {
    fn as_str(self) -> &'static str {
        match self {
            Edit::Disable => "disable",
            Edit::Enable => "enable",
        }
    }
}

/// Mutates the load balancer's upstream file one instance at a time.
#[derive(Debug, Clone)]
pub struct UpstreamEditor {
    path: PathBuf,
    grammar: EntryGrammar,
}

impl UpstreamEditor {
    pub fn new(path: impl Into<PathBuf>, grammar: EntryGrammar) -> Self {
        Self {
            path: path.into(),
            grammar,
        }
    }

    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self::new(config.path.clone(), EntryGrammar::from(config))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Disable the live entry for `instance`. Returns whether a change was
    /// (or, with `commit = false`, would be) made. Failures are logged and
    /// reported as `false`.
    pub fn disable(&self, instance: &str, commit: bool) -> bool {
        self.apply_logged(Edit::Disable, instance, commit)
    }

    /// Restore the marked entry for `instance`. Same semantics as
    /// [`disable`](Self::disable).
    pub fn enable(&self, instance: &str, commit: bool) -> bool {
        self.apply_logged(Edit::Enable, instance, commit)
    }

    pub fn try_disable(&self, instance: &str, commit: bool) -> Result<bool, UpstreamError> {
        self.apply(Edit::Disable, instance, commit)
    }

    pub fn try_enable(&self, instance: &str, commit: bool) -> Result<bool, UpstreamError> {
        self.apply(Edit::Enable, instance, commit)
    }

    /// Every routing entry in the file, active or disabled.
    pub fn entries(&self) -> Result<Vec<UpstreamEntry>, UpstreamError> {
        let content = self.read()?;
        let entries = content
            .lines()
            .enumerate()
            .filter_map(|(i, line)| {
                let (instance, state) = match self.grammar.classify(line) {
                    UpstreamLine::Active { address } => (address, EntryState::Active),
                    UpstreamLine::Disabled { instance, .. } => (instance, EntryState::Disabled),
                    UpstreamLine::Other => return None,
                };
                Some(UpstreamEntry {
                    line: i + 1,
                    instance: instance.to_string(),
                    state,
                    text: line.to_string(),
                })
            })
            .collect();
        Ok(entries)
    }

    fn apply_logged(&self, edit: Edit, instance: &str, commit: bool) -> bool {
        match self.apply(edit, instance, commit) {
            Ok(changed) => {
                metrics::record_upstream_edit(edit.as_str(), if changed { "changed" } else { "unchanged" });
                changed
            }
            Err(e) => {
                tracing::error!(instance = %instance, action = edit.as_str(), error = %e, "Upstream edit failed");
                metrics::record_upstream_edit(edit.as_str(), "error");
                false
            }
        }
    }

    fn apply(&self, edit: Edit, instance: &str, commit: bool) -> Result<bool, UpstreamError> {
        let content = self.read()?;
        let rewritten = match edit {
            Edit::Disable => rewrite_disable(&self.grammar, &content, instance),
            Edit::Enable => rewrite_enable(&self.grammar, &content, instance),
        };

        let Some(rewritten) = rewritten else {
            tracing::debug!(instance = %instance, action = edit.as_str(), "No matching upstream entry");
            return Ok(false);
        };

        if !commit {
            tracing::info!(
                instance = %instance,
                action = edit.as_str(),
                path = %self.path.display(),
                "Dry-run: upstream entry would change"
            );
            return Ok(true);
        }

        write_atomic(&self.path, rewritten.as_bytes()).map_err(|source| UpstreamError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::info!(
            instance = %instance,
            action = edit.as_str(),
            path = %self.path.display(),
            "Upstream updated"
        );
        Ok(true)
    }

    fn read(&self) -> Result<String, UpstreamError> {
        fs::read_to_string(&self.path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => UpstreamError::ConfigNotFound(self.path.clone()),
            _ => UpstreamError::Io {
                path: self.path.clone(),
                source,
            },
        })
    }
}

/// Mark every live entry whose address is exactly `instance`. `None` when
/// there is no such entry.
pub fn rewrite_disable(grammar: &EntryGrammar, content: &str, instance: &str) -> Option<String> {
    rewrite_lines(content, |line| match grammar.classify(line) {
        UpstreamLine::Active { address } if address == instance => {
            Some(grammar.disable_line(instance, line))
        }
        _ => None,
    })
}

/// Strip the marker from every entry disabled for `instance`. `None` when
/// there is no such entry.
pub fn rewrite_enable(grammar: &EntryGrammar, content: &str, instance: &str) -> Option<String> {
    rewrite_lines(content, |line| match grammar.classify(line) {
        UpstreamLine::Disabled { instance: marked, payload } if marked == instance => {
            Some(grammar.enable_line(payload))
        }
        _ => None,
    })
}

fn rewrite_lines<F>(content: &str, mut rewrite: F) -> Option<String>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut changed = false;
    let mut out = String::with_capacity(content.len() + 64);

    for line in content.split_inclusive('\n') {
        match rewrite(line) {
            Some(new_line) => {
                out.push_str(&new_line);
                changed = true;
            }
            None => out.push_str(line),
        }
    }

    changed.then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const UPSTREAM: &str = "upstream inventory {\n    least_conn;\n    server svc-1:8000;\n    server svc-10:8000 max_fails=0;\n    server svc-2:8000;\n}\n";

    fn setup(content: &str) -> (tempfile::TempDir, UpstreamEditor) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upstream.conf");
        fs::write(&path, content).unwrap();
        let editor = UpstreamEditor::new(path, EntryGrammar::default());
        (dir, editor)
    }

    fn read(editor: &UpstreamEditor) -> String {
        fs::read_to_string(editor.path()).unwrap()
    }

    #[test]
    fn test_disable_rewrites_only_target() {
        let (_dir, editor) = setup(UPSTREAM);
        assert!(editor.disable("svc-1:8000", true));
        assert_eq!(
            read(&editor),
            "upstream inventory {\n    least_conn;\n# disabled-by:svc-1:8000 server svc-1:8000;\n    server svc-10:8000 max_fails=0;\n    server svc-2:8000;\n}\n"
        );
    }

    #[test]
    fn test_exact_match_not_prefix() {
        let (_dir, editor) = setup(UPSTREAM);
        assert!(!editor.disable("svc-1", true));
        assert!(editor.disable("svc-10:8000", true));
        let content = read(&editor);
        assert!(content.contains("    server svc-1:8000;\n"));
        assert!(content.contains("# disabled-by:svc-10:8000 server svc-10:8000 max_fails=0;\n"));
    }

    #[test]
    fn test_disable_is_idempotent() {
        let (_dir, editor) = setup(UPSTREAM);
        assert!(editor.disable("svc-2:8000", true));
        let after_first = read(&editor);
        assert!(!editor.disable("svc-2:8000", true));
        assert_eq!(read(&editor), after_first);
    }

    #[test]
    fn test_round_trip() {
        let (_dir, editor) = setup(UPSTREAM);
        assert!(editor.disable("svc-10:8000", true));
        assert!(editor.enable("svc-10:8000", true));
        assert_eq!(read(&editor), UPSTREAM);
        assert!(!editor.enable("svc-10:8000", true));
    }

    #[test]
    fn test_round_trip_normalizes_indent() {
        let (_dir, editor) = setup("upstream a {\n\t\tserver x:1 backup;\r\n}\n");
        assert!(editor.disable("x:1", true));
        assert!(editor.enable("x:1", true));
        assert_eq!(read(&editor), "upstream a {\n    server x:1 backup;\r\n}\n");
    }

    #[test]
    fn test_dry_run_never_writes() {
        let (_dir, editor) = setup(UPSTREAM);
        for _ in 0..3 {
            assert!(editor.disable("svc-1:8000", false));
            assert!(!editor.enable("svc-1:8000", false));
        }
        assert_eq!(read(&editor), UPSTREAM);

        assert!(editor.disable("svc-1:8000", true));
        let disabled = read(&editor);
        assert!(!editor.disable("svc-1:8000", false));
        assert!(editor.enable("svc-1:8000", false));
        assert_eq!(read(&editor), disabled);
    }

    #[test]
    fn test_unknown_instance() {
        let (_dir, editor) = setup(UPSTREAM);
        assert!(!editor.disable("svc-9:8000", true));
        assert!(!editor.enable("svc-9:8000", true));
        assert_eq!(read(&editor), UPSTREAM);
    }

    #[test]
    fn test_duplicate_entries_all_disabled() {
        let (_dir, editor) = setup("server a:1;\nserver a:1 backup;\nserver b:1;\n");
        assert!(editor.disable("a:1", true));
        assert_eq!(
            read(&editor),
            "# disabled-by:a:1 server a:1;\n# disabled-by:a:1 server a:1 backup;\nserver b:1;\n"
        );
        assert!(editor.enable("a:1", true));
        assert_eq!(read(&editor), "    server a:1;\n    server a:1 backup;\nserver b:1;\n");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.conf");
        let editor = UpstreamEditor::new(&path, EntryGrammar::default());

        assert!(matches!(
            editor.try_disable("svc-1:8000", true),
            Err(UpstreamError::ConfigNotFound(_))
        ));
        assert!(!editor.disable("svc-1:8000", true));
        assert!(!editor.enable("svc-1:8000", true));
        assert!(!path.exists());
    }

    #[test]
    fn test_last_line_without_newline() {
        let (_dir, editor) = setup("server a:1;");
        assert!(editor.disable("a:1", true));
        assert_eq!(read(&editor), "# disabled-by:a:1 server a:1;");
    }

    #[test]
    fn test_entries() {
        let (_dir, editor) = setup(UPSTREAM);
        editor.disable("svc-2:8000", true);

        let entries = editor.entries().unwrap();
        let summary: Vec<_> = entries
            .iter()
            .map(|e| (e.line, e.instance.as_str(), e.state))
            .collect();
        assert_eq!(
            summary,
            vec![
                (3, "svc-1:8000", EntryState::Active),
                (4, "svc-10:8000", EntryState::Active),
                (5, "svc-2:8000", EntryState::Disabled),
            ]
        );
    }
}
