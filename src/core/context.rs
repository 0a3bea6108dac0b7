//! `ExtractionContext`: the explicit value replacing the module-level mutable
//! caches (parsed tree, file text, function ranges, package.json, regex
//! matcher) that a direct port would otherwise carry. Its lifecycle matches
//! one extraction run; dropping it (or calling `clear_caches`) releases every
//! tree it owns, since each tree is uniquely owned by the cache and every
//! extractor only ever borrows a read-only reference into it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tree_sitter::Tree;

use crate::core::config::ExtractionConfig;

/// A function's byte range within its file, used by extractors that need to
/// know which function a given match falls inside without re-walking the
/// tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionRange {
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_line: u32,
    pub end_line: u32,
}

/// Caches and cancellation state shared across every extractor in a single
/// run. Grounded on the teacher's `trace::context::FileCache`, generalized
/// from a byte-bounded file-text cache into the full set of per-file caches
/// the extraction pipeline shares.
pub struct ExtractionContext {
    config: ExtractionConfig,
    parsed_trees: RwLock<HashMap<PathBuf, Arc<Tree>>>,
    file_text: RwLock<HashMap<PathBuf, Arc<str>>>,
    function_ranges: RwLock<HashMap<PathBuf, Arc<Vec<FunctionRange>>>>,
    package_json: RwLock<HashMap<PathBuf, Arc<serde_json::Value>>>,
    cancelled: AtomicBool,
}

impl ExtractionContext {
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            config,
            parsed_trees: RwLock::new(HashMap::new()),
            file_text: RwLock::new(HashMap::new()),
            function_ranges: RwLock::new(HashMap::new()),
            package_json: RwLock::new(HashMap::new()),
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn cached_tree(&self, path: &Path) -> Option<Arc<Tree>> {
        self.parsed_trees.read().get(path).cloned()
    }

    pub fn insert_tree(&self, path: PathBuf, tree: Tree) -> Arc<Tree> {
        let tree = Arc::new(tree);
        self.parsed_trees.write().insert(path, tree.clone());
        tree
    }

    pub fn cached_text(&self, path: &Path) -> Option<Arc<str>> {
        self.file_text.read().get(path).cloned()
    }

    pub fn insert_text(&self, path: PathBuf, text: String) -> Arc<str> {
        let text: Arc<str> = Arc::from(text);
        self.file_text.write().insert(path, text.clone());
        text
    }

    pub fn cached_function_ranges(&self, path: &Path) -> Option<Arc<Vec<FunctionRange>>> {
        self.function_ranges.read().get(path).cloned()
    }

    pub fn insert_function_ranges(
        &self,
        path: PathBuf,
        ranges: Vec<FunctionRange>,
    ) -> Arc<Vec<FunctionRange>> {
        let ranges = Arc::new(ranges);
        self.function_ranges.write().insert(path, ranges.clone());
        ranges
    }

    pub fn cached_package_json(&self, path: &Path) -> Option<Arc<serde_json::Value>> {
        self.package_json.read().get(path).cloned()
    }

    pub fn insert_package_json(
        &self,
        path: PathBuf,
        value: serde_json::Value,
    ) -> Arc<serde_json::Value> {
        let value = Arc::new(value);
        self.package_json.write().insert(path, value.clone());
        value
    }

    /// Releases every cached tree, file text, function range, and
    /// package.json parse. Does not reset the cancellation flag.
    pub fn clear_caches(&self) {
        self.parsed_trees.write().clear();
        self.file_text.write().clear();
        self.function_ranges.write().clear();
        self.package_json.write().clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            trees: self.parsed_trees.read().len(),
            texts: self.file_text.read().len(),
            function_ranges: self.function_ranges.read().len(),
            package_jsons: self.package_json.read().len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub trees: usize,
    pub texts: usize,
    pub function_ranges: usize,
    pub package_jsons: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_cache_round_trips() {
        let ctx = ExtractionContext::new(ExtractionConfig::default());
        let path = PathBuf::from("src/a.ts");
        assert!(ctx.cached_text(&path).is_none());
        ctx.insert_text(path.clone(), "const x = 1;".to_string());
        assert_eq!(ctx.cached_text(&path).unwrap().as_ref(), "const x = 1;");
    }

    #[test]
    fn clear_caches_empties_every_table() {
        let ctx = ExtractionContext::new(ExtractionConfig::default());
        ctx.insert_text(PathBuf::from("a.ts"), "x".to_string());
        ctx.insert_package_json(PathBuf::from("package.json"), serde_json::json!({}));
        let stats_before = ctx.cache_stats();
        assert_eq!(stats_before.texts, 1);
        assert_eq!(stats_before.package_jsons, 1);

        ctx.clear_caches();
        let stats_after = ctx.cache_stats();
        assert_eq!(stats_after.texts, 0);
        assert_eq!(stats_after.package_jsons, 0);
    }

    #[test]
    fn cancellation_flag_is_observable() {
        let ctx = ExtractionContext::new(ExtractionConfig::default());
        assert!(!ctx.is_cancelled());
        ctx.cancel();
        assert!(ctx.is_cancelled());
    }
}
