//! The root value produced by a run: `schemaVersion`, scan metadata, every
//! extractor's output, the call graph, the data-flow graph, and the RLS
//! artifact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};
use crate::model::callgraph::CallGraph;
use crate::model::dataflow::DataFlowGraph;
use crate::model::records::{
    AuthzCall, CacheOperation, JobHandler, MembershipMutation, Route, Service, TestFact,
    TransactionScope, WebhookHandler,
};
use crate::model::rls::RlsArtifact;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl SchemaVersion {
    pub const CURRENT: SchemaVersion = SchemaVersion {
        major: 1,
        minor: 0,
        patch: 0,
    };
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A consumer's declared compatibility window: field additions bump minor
/// (backward compatible), renames/removals bump major.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompatRange {
    pub min_major: u32,
    pub min_minor: u32,
    pub max_major: u32,
}

impl CompatRange {
    pub fn check(&self, found: SchemaVersion) -> Result<()> {
        let ok = found.major >= self.min_major
            && found.major <= self.max_major
            && (found.major > self.min_major || found.minor >= self.min_minor);
        if ok {
            Ok(())
        } else {
            Err(Error::SchemaMismatch {
                found: found.to_string(),
                required: format!(
                    "(minMajor={}, minMinor={}, maxMajor={})",
                    self.min_major, self.min_minor, self.max_major
                ),
            })
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodebaseInfo {
    pub root: String,
    pub files_scanned: usize,
    pub frameworks: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub schema_version: SchemaVersion,
    pub extracted_at: DateTime<Utc>,
    pub target_path: String,
    pub codebase: CodebaseInfo,
    pub services: Vec<Service>,
    pub routes: Vec<Route>,
    pub authz_calls: Vec<AuthzCall>,
    pub webhook_handlers: Vec<WebhookHandler>,
    pub transaction_scopes: Vec<TransactionScope>,
    pub cache_operations: Vec<CacheOperation>,
    pub membership_mutations: Vec<MembershipMutation>,
    pub job_handlers: Vec<JobHandler>,
    pub tests: Vec<TestFact>,
    pub call_graph: CallGraph,
    pub data_flows: DataFlowGraph,
    pub rls_artifact: RlsArtifact,
}

impl Artifact {
    /// Stable sort on `(file, line, kind)` within each array, applied once
    /// at assembly time so two runs on identical inputs emit byte-identical
    /// JSON regardless of extractor scheduling order.
    pub fn normalize(&mut self) {
        self.services.sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));
        self.routes
            .sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));
        self.authz_calls
            .sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));
        self.webhook_handlers
            .sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));
        self.transaction_scopes
            .sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));
        self.cache_operations
            .sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));
        self.membership_mutations
            .sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));
        self.job_handlers
            .sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));
        self.tests
            .sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn service(file: &str, line: u32) -> Service {
        Service {
            file: file.to_string(),
            line,
            name: "svc".to_string(),
            exports: Vec::new(),
            directives: Vec::new(),
        }
    }

    #[test]
    fn normalize_sorts_by_file_then_line_regardless_of_insertion_order() {
        let mut services = vec![service("b.ts", 1), service("a.ts", 20), service("a.ts", 5)];
        services.sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));
        assert_eq!(
            services.iter().map(|s| (s.file.as_str(), s.line)).collect::<Vec<_>>(),
            vec![("a.ts", 5), ("a.ts", 20), ("b.ts", 1)]
        );
    }

    #[test]
    fn compat_range_accepts_matching_minor() {
        let range = CompatRange {
            min_major: 1,
            min_minor: 0,
            max_major: 1,
        };
        assert!(range
            .check(SchemaVersion {
                major: 1,
                minor: 2,
                patch: 0
            })
            .is_ok());
    }

    #[test]
    fn compat_range_rejects_newer_major() {
        let range = CompatRange {
            min_major: 1,
            min_minor: 0,
            max_major: 1,
        };
        let err = range
            .check(SchemaVersion {
                major: 2,
                minor: 0,
                patch: 0,
            })
            .unwrap_err();
        assert_eq!(err.code(), "E_SCHEMA_MISMATCH");
    }
}
