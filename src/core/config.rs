//! Extraction configuration: every recognized option, with defaults that
//! match the documented baseline. Loading a partial TOML/JSON document and
//! merging it onto `ExtractionConfig::default()` is how an external driver
//! is expected to use this (config *loading* itself — file discovery, CLI
//! flag merge — lives outside the core).

use serde::{Deserialize, Serialize};

/// Test-file gating mode: whether test files are scanned at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestFileMode {
    Exclude,
    Include,
    Annotate,
}

impl Default for TestFileMode {
    fn default() -> Self {
        TestFileMode::Annotate
    }
}

/// Which extractors a gated test file is routed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestFileStrategy {
    Extractors,
    Tests,
    Both,
}

impl Default for TestFileStrategy {
    fn default() -> Self {
        TestFileStrategy::Both
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TestFileHandling {
    pub mode: TestFileMode,
    pub strategy: TestFileStrategy,
}

impl Default for TestFileHandling {
    fn default() -> Self {
        Self {
            mode: TestFileMode::default(),
            strategy: TestFileStrategy::default(),
        }
    }
}

/// Treatment of generated files (e.g. `*.generated.ts`, Prisma client output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratedFileMode {
    Exclude,
    Include,
}

impl Default for GeneratedFileMode {
    fn default() -> Self {
        GeneratedFileMode::Exclude
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratedFileHandling {
    pub mode: GeneratedFileMode,
}

impl Default for GeneratedFileHandling {
    fn default() -> Self {
        Self {
            mode: GeneratedFileMode::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitioningConfig {
    pub enabled: bool,
}

impl Default for PartitioningConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// User-supplied regexes merged with the default cache-operation catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CachePatterns {
    pub get: Vec<String>,
    pub set: Vec<String>,
    pub delete: Vec<String>,
}

impl Default for CachePatterns {
    fn default() -> Self {
        Self {
            get: Vec::new(),
            set: Vec::new(),
            delete: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataflowLimits {
    pub max_file_bytes: u64,
    pub max_file_lines: usize,
}

impl Default for DataflowLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: 1_048_576,
            max_file_lines: 20_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub test_patterns: Vec<String>,
    pub service_patterns: Vec<String>,
    pub authz_functions: Vec<String>,
    pub cache_patterns: CachePatterns,
    pub webhook_providers: Vec<String>,
    pub job_frameworks: Vec<String>,
    pub test_file_handling: TestFileHandling,
    pub partitioning: PartitioningConfig,
    pub generated_file_handling: GeneratedFileHandling,
    pub dataflow: DataflowLimits,
    /// Hard cap on call-graph node count; a resource-exhaustion guard, not a
    /// correctness boundary. Overridable via `SCHECK_MAX_CALLGRAPH_NODES`.
    pub max_callgraph_nodes: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            include: vec!["src/**/*.{ts,tsx,js,jsx,mjs,cjs}".to_string()],
            exclude: default_exclude(),
            test_patterns: Vec::new(),
            service_patterns: Vec::new(),
            authz_functions: Vec::new(),
            cache_patterns: CachePatterns::default(),
            webhook_providers: Vec::new(),
            job_frameworks: Vec::new(),
            test_file_handling: TestFileHandling::default(),
            partitioning: PartitioningConfig::default(),
            generated_file_handling: GeneratedFileHandling::default(),
            dataflow: DataflowLimits::default(),
            max_callgraph_nodes: 500_000,
        }
    }
}

fn default_exclude() -> Vec<String> {
    [
        "**/node_modules/**",
        "**/.git/**",
        "**/dist/**",
        "**/build/**",
        "**/.next/**",
        "**/.turbo/**",
        "**/coverage/**",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl ExtractionConfig {
    /// Applies the environment-variable overrides documented for the
    /// observability surface (§6.3): the call-graph node cap is the one
    /// option with a direct env override, read the same way the teacher's
    /// `Config::daemon_port` reads `GREPPY_DAEMON_PORT`.
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(raw) = std::env::var("SCHECK_MAX_CALLGRAPH_NODES") {
            if let Ok(n) = raw.parse() {
                self.max_callgraph_nodes = n;
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_baseline() {
        let cfg = ExtractionConfig::default();
        assert_eq!(cfg.max_callgraph_nodes, 500_000);
        assert!(cfg.exclude.iter().any(|p| p.contains("node_modules")));
        assert_eq!(cfg.test_file_handling.mode, TestFileMode::Annotate);
        assert_eq!(cfg.test_file_handling.strategy, TestFileStrategy::Both);
        assert!(cfg.partitioning.enabled);
        assert_eq!(cfg.generated_file_handling.mode, GeneratedFileMode::Exclude);
        assert_eq!(cfg.dataflow.max_file_bytes, 1_048_576);
    }

    #[test]
    fn partial_toml_merges_onto_defaults() {
        let partial = r#"
            include = ["app/**/*.ts"]
        "#;
        let cfg: ExtractionConfig = toml::from_str(partial).unwrap();
        assert_eq!(cfg.include, vec!["app/**/*.ts".to_string()]);
        assert_eq!(cfg.max_callgraph_nodes, 500_000);
    }

    #[test]
    fn env_override_applies_callgraph_cap() {
        std::env::set_var("SCHECK_MAX_CALLGRAPH_NODES", "12345");
        let cfg = ExtractionConfig::default().apply_env_overrides();
        assert_eq!(cfg.max_callgraph_nodes, 12345);
        std::env::remove_var("SCHECK_MAX_CALLGRAPH_NODES");
    }
}
