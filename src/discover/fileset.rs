//! File set resolution: for a partition, the list of source files the
//! extractors will parse. Grounded on the teacher's
//! `parse::walker::FileWalker` (an `ignore::WalkBuilder` over the project
//! root), generalized from a fixed code-extension allowlist to
//! config-driven include/exclude globs plus the always-excluded directories
//! this spec hardcodes.

use std::path::{Path, PathBuf};

use glob::Pattern;
use ignore::WalkBuilder;

use crate::core::config::{ExtractionConfig, TestFileMode};

const ALWAYS_EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    ".next",
    ".turbo",
    "coverage",
    "cache",
];

const TEST_FILE_MARKERS: &[&str] = &[
    ".test.",
    ".spec.",
    "__tests__",
    "__mocks__",
    "/test/",
    "/tests/",
];

pub fn is_test_file(path: &Path) -> bool {
    let s = path.to_string_lossy().replace('\\', "/");
    TEST_FILE_MARKERS.iter().any(|m| s.contains(m))
}

fn is_excluded_dir(path: &Path) -> bool {
    path.components().any(|c| {
        c.as_os_str()
            .to_str()
            .map(|s| ALWAYS_EXCLUDED_DIRS.contains(&s))
            .unwrap_or(false)
    })
}

fn compile_globs<S: AsRef<str>>(patterns: &[S]) -> Vec<Pattern> {
    patterns
        .iter()
        .filter_map(|p| Pattern::new(p.as_ref()).ok())
        .collect()
}

fn matches_any(globs: &[Pattern], relative: &str) -> bool {
    globs.is_empty() || globs.iter().any(|g| g.matches(relative))
}

/// Which extractor family a resolved file should feed, per the test-file
/// gating policy (`testFileHandling.{mode, strategy}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRoute {
    /// Feed the regular (non-test) extractors only.
    Extractors,
    /// Feed the tests extractor only.
    Tests,
    /// Feed both.
    Both,
    /// Excluded from every extractor.
    Excluded,
}

#[derive(Debug, Clone)]
pub struct ResolvedFile {
    pub path: PathBuf,
    pub route: FileRoute,
}

/// Resolves the file set for one partition root against `config`'s
/// include/exclude globs, test-file gating policy, and the always-excluded
/// directories. `extra_include` widens matching for extractors that need
/// broader coverage (e.g. routes, which also look at non-`src` app-router
/// trees) without touching the base `include` list.
pub fn resolve_file_set(
    partition_root: &Path,
    config: &ExtractionConfig,
    extra_include: &[&str],
) -> Vec<ResolvedFile> {
    let include_globs = compile_globs(&config.include);
    let extra_globs = compile_globs(extra_include);
    let exclude_globs = compile_globs(&config.exclude);

    let walker = WalkBuilder::new(partition_root)
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .require_git(false)
        .build();

    let mut out = Vec::new();
    for entry in walker.flatten() {
        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        if is_excluded_dir(path) {
            continue;
        }

        let relative = path
            .strip_prefix(partition_root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");

        if exclude_globs.iter().any(|g| g.matches(&relative)) {
            continue;
        }
        if !matches_any(&include_globs, &relative) && !matches_any(&extra_globs, &relative) {
            continue;
        }

        let route = classify_route(path, &config.test_file_handling.mode, config);
        if route == FileRoute::Excluded {
            continue;
        }
        out.push(ResolvedFile {
            path: path.to_path_buf(),
            route,
        });
    }

    out.sort_by(|a, b| a.path.cmp(&b.path));
    out
}

fn classify_route(
    path: &Path,
    mode: &TestFileMode,
    config: &ExtractionConfig,
) -> FileRoute {
    if !is_test_file(path) {
        return FileRoute::Extractors;
    }
    match mode {
        TestFileMode::Exclude => FileRoute::Excluded,
        TestFileMode::Include => match config.test_file_handling.strategy {
            crate::core::config::TestFileStrategy::Extractors => FileRoute::Extractors,
            crate::core::config::TestFileStrategy::Tests => FileRoute::Tests,
            crate::core::config::TestFileStrategy::Both => FileRoute::Both,
        },
        TestFileMode::Annotate => match config.test_file_handling.strategy {
            crate::core::config::TestFileStrategy::Extractors => FileRoute::Extractors,
            crate::core::config::TestFileStrategy::Tests => FileRoute::Tests,
            crate::core::config::TestFileStrategy::Both => FileRoute::Both,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{TestFileHandling, TestFileStrategy};
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn node_modules_is_always_excluded() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("src/a.ts"), "export const a = 1;");
        write(
            &temp.path().join("node_modules/pkg/index.js"),
            "module.exports = {};",
        );

        let config = ExtractionConfig::default();
        let files = resolve_file_set(temp.path(), &config, &[]);
        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("src/a.ts"));
    }

    #[test]
    fn exclude_mode_drops_test_files_entirely() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("src/a.ts"), "export const a = 1;");
        write(&temp.path().join("src/a.test.ts"), "test('x', () => {});");

        let mut config = ExtractionConfig::default();
        config.test_file_handling = TestFileHandling {
            mode: TestFileMode::Exclude,
            strategy: TestFileStrategy::Both,
        };
        let files = resolve_file_set(temp.path(), &config, &[]);
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn both_strategy_routes_test_file_to_both() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("src/a.test.ts"), "test('x', () => {});");

        let config = ExtractionConfig::default();
        let files = resolve_file_set(temp.path(), &config, &[]);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].route, FileRoute::Both);
    }
}
