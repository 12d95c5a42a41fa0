//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - No sleep() calls in production code
//! - Async I/O once the runtime is up
//! - Playback runs on the virtual clock, never the wall clock
//! - Randomness flows through the jitter source
//!
//! The helpers here load production sources; the rules live under `tests/`.

use std::fs;
use std::path::{Path, PathBuf};

/// Source roots of the production crates, relative to the workspace root
pub const PRODUCTION_ROOTS: &[&str] = &["oracle/core/src", "oracle/console/src"];

/// A production source file with its test module cut off
pub struct SourceFile {
    /// Path relative to the workspace root
    pub path: PathBuf,
    /// Lines before the first `#[cfg(test)]`
    pub lines: Vec<String>,
}

impl SourceFile {
    /// Whether the path ends with the given components (e.g. `config/mod.rs`)
    pub fn is(&self, suffix: &str) -> bool {
        self.path.ends_with(suffix)
    }

    /// Non-comment code lines with 1-based line numbers
    pub fn code_lines(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines.iter().enumerate().filter_map(|(idx, line)| {
            let trimmed = line.trim_start();
            if trimmed.starts_with("//") {
                return None;
            }
            let code = line.split("//").next().unwrap_or(line);
            Some((idx + 1, code))
        })
    }
}

/// Workspace root, found from this package's manifest directory
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .canonicalize()
        .expect("workspace root exists")
}

/// Every `.rs` file under the production roots
pub fn production_sources() -> Vec<SourceFile> {
    let root = workspace_root();
    let mut files = Vec::new();

    for dir in PRODUCTION_ROOTS {
        let path = root.join(dir);
        assert!(path.exists(), "missing source root {}", path.display());

        for entry in walkdir::WalkDir::new(&path)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.path().extension().and_then(|s| s.to_str()) != Some("rs") {
                continue;
            }
            let Ok(content) = fs::read_to_string(entry.path()) else {
                continue;
            };
            let lines = content
                .lines()
                .take_while(|line| !line.trim().starts_with("#[cfg(test)]"))
                .map(String::from)
                .collect();
            files.push(SourceFile {
                path: entry
                    .path()
                    .strip_prefix(&root)
                    .unwrap_or(entry.path())
                    .to_path_buf(),
                lines,
            });
        }
    }

    files
}

/// Report violations and fail
pub fn fail_on(violations: &[String], headline: &str) {
    if violations.is_empty() {
        return;
    }

    eprintln!("\n❌ {headline}\n");
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    panic!(
        "\nFound {} violation(s) in production code.\nFix these before merging!",
        violations.len()
    );
}
