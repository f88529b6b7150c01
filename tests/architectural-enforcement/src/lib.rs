//! Architectural Enforcement
//!
//! Source scanners shared by the integration tests in `tests/`:
//! - No sleep() calls in production code
//! - No blocking I/O inside async functions
//!
//! The scanners are line based. Each file is cut at its first `#[cfg(test)]`
//! line, which is where the crate keeps its unit test modules.

use std::fs;
use std::path::{Path, PathBuf};

/// Source roots checked by the tests, relative to the workspace root
pub const PRODUCTION_ROOTS: &[&str] = &["tutor/core/src", "tutor/cli/src"];

/// Workspace root, two levels above this package
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// A production source file, with test modules already cut away
pub struct SourceFile {
    /// Path as found on disk
    pub path: PathBuf,
    /// Production lines in order
    pub lines: Vec<String>,
}

impl SourceFile {
    /// Build from file contents
    #[must_use]
    pub fn from_content(path: PathBuf, content: &str) -> Self {
        let lines = content
            .lines()
            .take_while(|line| line.trim() != "#[cfg(test)]")
            .map(str::to_string)
            .collect();
        Self { path, lines }
    }

    /// Format a finding for the failure report
    #[must_use]
    pub fn violation(&self, idx: usize, what: &str) -> String {
        format!(
            "{}:{} - {what}: {}",
            self.path.display(),
            idx + 1,
            self.lines[idx].trim()
        )
    }
}

/// Every `.rs` file under the production roots
///
/// Panics when a root is missing so a moved crate cannot silently pass.
#[must_use]
pub fn production_sources() -> Vec<SourceFile> {
    let root = workspace_root();
    let mut files = Vec::new();

    for dir in PRODUCTION_ROOTS {
        let path = root.join(dir);
        assert!(path.exists(), "source root {} not found", path.display());

        for entry in walkdir::WalkDir::new(&path)
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.path().extension().and_then(|s| s.to_str()) != Some("rs") {
                continue;
            }
            if let Ok(content) = fs::read_to_string(entry.path()) {
                files.push(SourceFile::from_content(entry.path().to_path_buf(), &content));
            }
        }
    }
    files
}

/// Code portion of a line (line comments removed)
#[must_use]
pub fn code_part(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

/// Kind of function a line sits in
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FnKind {
    /// `async fn`
    Async,
    /// plain `fn`
    Sync,
}

/// Classify a function declaration line
#[must_use]
pub fn fn_declaration(line: &str) -> Option<FnKind> {
    let mut rest = line.trim();
    for prefix in ["pub(crate) ", "pub(super) ", "pub "] {
        if let Some(stripped) = rest.strip_prefix(prefix) {
            rest = stripped;
            break;
        }
    }
    if rest.starts_with("async fn ") {
        Some(FnKind::Async)
    } else if rest.starts_with("fn ") {
        Some(FnKind::Sync)
    } else {
        None
    }
}

/// Nearest enclosing function declaration above `idx`
#[must_use]
pub fn enclosing_fn(lines: &[String], idx: usize) -> Option<FnKind> {
    lines[..=idx].iter().rev().find_map(|line| fn_declaration(line))
}

/// Whether `idx` belongs to a periodic `interval` loop
#[must_use]
pub fn is_interval_context(lines: &[String], idx: usize) -> bool {
    let start = idx.saturating_sub(20);
    let end = (idx + 5).min(lines.len());
    lines[start..end]
        .iter()
        .any(|line| line.contains(".tick()") || line.contains("interval"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(code: &[&str]) -> Vec<String> {
        code.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_test_modules_are_cut() {
        let file = SourceFile::from_content(
            PathBuf::from("x.rs"),
            "fn a() {}\n#[cfg(test)]\nmod tests { fn b() { sleep(1) } }\n",
        );
        assert_eq!(file.lines, vec!["fn a() {}".to_string()]);
    }

    #[test]
    fn test_fn_declarations() {
        assert_eq!(fn_declaration("    pub async fn load(&self) {"), Some(FnKind::Async));
        assert_eq!(fn_declaration("pub(crate) fn parse() {"), Some(FnKind::Sync));
        assert_eq!(fn_declaration("    lookup: impl Fn(&str) -> Option<String>,"), None);
    }

    #[test]
    fn test_enclosing_fn() {
        let code = lines(&[
            "pub fn load() {",
            "    let s = std::fs::read_to_string(p);",
            "}",
            "async fn fetch() {",
            "    let s = std::fs::read_to_string(p);",
            "}",
        ]);
        assert_eq!(enclosing_fn(&code, 1), Some(FnKind::Sync));
        assert_eq!(enclosing_fn(&code, 4), Some(FnKind::Async));
    }

    #[test]
    fn test_comments_are_ignored() {
        assert_eq!(code_part("let x = 1; // sleep(5)"), "let x = 1; ");
    }
}
