//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - Runners are the only code that waits (no sleep anywhere else)
//! - No `unwrap()` / `expect()` in production code
//! - The engine crate stays free of CLI and subscriber dependencies
//!
//! The helpers here walk the workspace sources; the rules live in `tests/`.

use std::fs;
use std::path::{Path, PathBuf};

/// Workspace root (two levels above this package)
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// A production source file, with its `#[cfg(test)]` tail removed
pub struct SourceFile {
    /// Path relative to the workspace root
    pub path: PathBuf,
    /// Lines before the first `#[cfg(test)]`
    pub lines: Vec<String>,
}

impl SourceFile {
    /// Code lines with trailing `//` comments stripped, numbered from 1
    pub fn code_lines(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines.iter().enumerate().filter_map(|(idx, line)| {
            let code = line.split("//").next().unwrap_or(line);
            if code.trim().is_empty() {
                None
            } else {
                Some((idx + 1, code))
            }
        })
    }

    /// Whether the path ends with `suffix`
    #[must_use]
    pub fn is(&self, suffix: &str) -> bool {
        self.path.ends_with(suffix)
    }
}

/// Every `.rs` file under `dir` (relative to the workspace root)
#[must_use]
pub fn production_sources(dir: &str) -> Vec<SourceFile> {
    let root = workspace_root();
    let base = root.join(dir);
    if !base.exists() {
        return Vec::new();
    }

    let mut files: Vec<SourceFile> = walkdir::WalkDir::new(&base)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .filter_map(|e| {
            let content = fs::read_to_string(e.path()).ok()?;
            let lines = content
                .lines()
                .take_while(|l| !l.trim_start().starts_with("#[cfg(test)]"))
                .map(str::to_string)
                .collect();
            let path = e.path().strip_prefix(&root).unwrap_or(e.path()).to_path_buf();
            Some(SourceFile { path, lines })
        })
        .collect();

    files.sort_by(|a, b| a.path.cmp(&b.path));
    files
}

/// Format a violation the way the test reports print them
#[must_use]
pub fn violation(file: &SourceFile, line: usize, code: &str) -> String {
    format!("{}:{} - {}", file.path.display(), line, code.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_root_has_manifest() {
        assert!(workspace_root().join("Cargo.toml").exists());
    }

    #[test]
    fn test_finds_core_sources() {
        let files = production_sources("stage/core/src");
        assert!(files.iter().any(|f| f.is("stage/core/src/lib.rs")));
    }
}
