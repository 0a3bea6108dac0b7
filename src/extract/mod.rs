//! Extractor orchestration: discovers the file set for a target root, fans
//! the per-file AST walks out across a rayon pool (grounded on the
//! teacher's `trace::builder::build_index_parallel`), then assembles every
//! extractor's output into a single `Artifact`.

pub mod ast;
pub mod authz;
pub mod cache_ops;
pub mod callgraph_builder;
pub mod dataflow;
pub mod jobs;
pub mod membership;
pub mod rls;
pub mod routes;
pub mod services;
pub mod tests_extractor;
pub mod transactions;
pub mod webhooks;

use std::path::{Path, PathBuf};

use chrono::Utc;
use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use serde_json::Value;

use crate::core::config::ExtractionConfig;
use crate::core::error::{Error, Result};
use crate::discover::{discover_partitions, resolve_file_set, FileRoute};
use crate::extract::ast::{detect_language, parse_source, ParsedFile};
use crate::model::artifact::{Artifact, CodebaseInfo, SchemaVersion};
use crate::model::dataflow::DataFlowGraph;
use crate::model::records::{
    AuthzCall, CacheOperation, JobHandler, MembershipMutation, Route, Service, TestFact,
    TransactionScope, WebhookHandler,
};
use crate::model::rls::{MultiTenantTable, Query, RlsPolicy};

const ROUTE_EXTRA_INCLUDE: &[&str] = &[
    "app/**/*.{ts,tsx,js,jsx}",
    "pages/**/*.{ts,tsx,js,jsx}",
    "server/**/*.{ts,tsx,js,jsx}",
    "src/**/*.{ts,tsx,js,jsx,mjs,cjs}",
];

/// One parsed file's contribution from every per-file extractor, collected
/// inside the parallel stage and merged sequentially afterward.
struct PerFileRecords {
    relative_path: String,
    parsed: ParsedFile,
    services: Vec<Service>,
    authz_calls: Vec<AuthzCall>,
    cache_operations: Vec<CacheOperation>,
    membership_mutations: Vec<MembershipMutation>,
    job_handlers: Vec<JobHandler>,
    tests: Vec<TestFact>,
    transaction_scopes: Vec<TransactionScope>,
    webhook_handlers: Vec<WebhookHandler>,
    routes: Vec<Route>,
    data_flows: Option<DataFlowGraph>,
    queries: Vec<Query>,
}

fn process_file(relative_path: String, source: String, config: &ExtractionConfig, route: FileRoute) -> Option<PerFileRecords> {
    let lang = detect_language(Path::new(&relative_path))?;
    let parsed = parse_source(&source, lang)?;

    let service_patterns: Vec<glob::Pattern> = config
        .service_patterns
        .iter()
        .filter_map(|p| glob::Pattern::new(p).ok())
        .collect();

    let tests = if matches!(route, FileRoute::Tests | FileRoute::Both) {
        tests_extractor::extract(&relative_path, &parsed)
    } else {
        Vec::new()
    };

    let job_handlers = if jobs::is_job_candidate(&relative_path) {
        jobs::extract(&relative_path, &parsed)
    } else {
        Vec::new()
    };

    let records = PerFileRecords {
        services: services::extract(&relative_path, &service_patterns, &parsed),
        authz_calls: authz::extract(&relative_path, &parsed, &config.authz_functions),
        cache_operations: cache_ops::extract(&relative_path, &parsed, &config.cache_patterns),
        membership_mutations: membership::extract(&relative_path, &parsed),
        job_handlers,
        tests,
        transaction_scopes: transactions::extract(&relative_path, &parsed),
        webhook_handlers: webhooks::extract(&relative_path, &parsed),
        routes: routes::extract(&relative_path, &parsed),
        data_flows: dataflow::extract(&relative_path, &parsed, &config.dataflow),
        queries: rls::extract_queries(&relative_path, &parsed),
        relative_path,
        parsed,
    };
    Some(records)
}

static MIGRATION_GLOB: Lazy<Vec<glob::Pattern>> = Lazy::new(|| {
    ["**/migrations/**/*.sql", "**/supabase/migrations/**/*.sql", "**/db/migrations/**/*.sql"]
        .iter()
        .map(|p| glob::Pattern::new(p).expect("migration glob compiles"))
        .collect()
});

static RLS_HELPER_FN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)CREATE\s+(OR\s+REPLACE\s+)?FUNCTION\s+\w*(tenant|org|rls)\w*").unwrap());

fn is_migration_file(relative: &str) -> bool {
    MIGRATION_GLOB.iter().any(|g| g.matches(relative))
}

fn is_prisma_schema(relative: &str) -> bool {
    relative.ends_with("schema.prisma")
}

/// Every file under `target_root` outside the JS/TS include globs that the
/// RLS extractor still needs: Prisma schemas and SQL migrations.
fn collect_rls_source_files(target_root: &Path) -> Vec<(String, String)> {
    let walker = ignore::WalkBuilder::new(target_root)
        .hidden(true)
        .git_ignore(true)
        .require_git(false)
        .build();

    let mut out = Vec::new();
    for entry in walker.flatten() {
        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        let relative = path
            .strip_prefix(target_root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        if relative.contains("node_modules/") {
            continue;
        }
        if is_prisma_schema(&relative) || is_migration_file(&relative) {
            if let Ok(text) = std::fs::read_to_string(path) {
                out.push((relative, text));
            }
        }
    }
    out.sort();
    out
}

fn read_package_json(path: &Path) -> Option<Value> {
    let text = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&text).ok()
}

/// Runs the full extraction pipeline over `target_root` and returns the
/// assembled, normalized `Artifact`.
pub fn run(target_root: &Path, config: &ExtractionConfig) -> Result<Artifact> {
    if !target_root.exists() {
        return Err(Error::TargetNotFound { path: target_root.to_path_buf() });
    }
    if !target_root.is_dir() {
        return Err(Error::TargetNotADirectory { path: target_root.to_path_buf() });
    }

    let partitions = discover_partitions(target_root);

    let mut resolved_files: Vec<(PathBuf, FileRoute)> = Vec::new();
    for partition in &partitions {
        for resolved in resolve_file_set(&partition.root, config, ROUTE_EXTRA_INCLUDE) {
            resolved_files.push((resolved.path, resolved.route));
        }
    }
    resolved_files.sort_by(|a, b| a.0.cmp(&b.0));
    resolved_files.dedup_by(|a, b| a.0 == b.0);

    let loaded: Vec<(String, String, FileRoute)> = resolved_files
        .into_iter()
        .filter_map(|(path, route)| {
            let relative = path
                .strip_prefix(target_root)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            std::fs::read_to_string(&path).ok().map(|text| (relative, text, route))
        })
        .collect();

    let files_scanned = loaded.len();

    let serial = std::env::var("SCHECK_COLLECTOR_SERIAL").as_deref() == Ok("1");
    let per_file: Vec<PerFileRecords> = if serial {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .map_err(|e| Error::InvariantViolation { message: e.to_string() })?;
        pool.install(|| {
            loaded
                .into_par_iter()
                .filter_map(|(relative, text, route)| process_file(relative, text, config, route))
                .collect()
        })
    } else {
        loaded
            .into_par_iter()
            .filter_map(|(relative, text, route)| process_file(relative, text, config, route))
            .collect()
    };

    let mut services = Vec::new();
    let mut authz_calls = Vec::new();
    let mut cache_operations = Vec::new();
    let mut membership_mutations = Vec::new();
    let mut job_handlers = Vec::new();
    let mut tests = Vec::new();
    let mut transaction_scopes = Vec::new();
    let mut webhook_handlers = Vec::new();
    let mut routes_out = Vec::new();
    let mut data_flows = DataFlowGraph::default();
    let mut queries: Vec<Query> = Vec::new();
    let mut callgraph_input: Vec<(String, ParsedFile)> = Vec::new();
    let mut source_samples: Vec<String> = Vec::new();

    for record in per_file {
        services.extend(record.services);
        authz_calls.extend(record.authz_calls);
        cache_operations.extend(record.cache_operations);
        membership_mutations.extend(record.membership_mutations);
        job_handlers.extend(record.job_handlers);
        tests.extend(record.tests);
        transaction_scopes.extend(record.transaction_scopes);
        webhook_handlers.extend(record.webhook_handlers);
        routes_out.extend(record.routes);
        queries.extend(record.queries);
        if let Some(flows) = record.data_flows {
            data_flows.sources.extend(flows.sources);
            data_flows.sinks.extend(flows.sinks);
            data_flows.transforms.extend(flows.transforms);
            data_flows.flows.extend(flows.flows);
        }
        if source_samples.len() < 200 {
            source_samples.push(record.parsed.source.clone());
        }
        callgraph_input.push((record.relative_path, record.parsed));
    }

    let call_graph = callgraph_builder::build(&callgraph_input, config.max_callgraph_nodes);
    membership::cross_link_cache_keys(&mut membership_mutations, &cache_operations);

    // --- RLS: Prisma schemas + SQL migrations, outside the JS/TS file set ---
    let rls_sources = collect_rls_source_files(target_root);
    let mut multi_tenant_tables: Vec<MultiTenantTable> = Vec::new();
    let mut rls_policies: Vec<RlsPolicy> = Vec::new();
    let mut enabled_tables: Vec<String> = Vec::new();
    let mut has_rls_context_helper = false;
    for (relative, text) in &rls_sources {
        if is_prisma_schema(relative) {
            multi_tenant_tables.extend(rls::extract_prisma_schema(relative, text));
        } else if is_migration_file(relative) {
            let (policies, enabled) = rls::extract_sql_migration(relative, text);
            rls_policies.extend(policies);
            enabled_tables.extend(enabled);
            if RLS_HELPER_FN.is_match(text) {
                has_rls_context_helper = true;
            }
        }
    }

    // --- Framework detection ---
    let package_json = partitions
        .first()
        .and_then(|p| p.package_json_path.as_ref())
        .and_then(|p| read_package_json(p));
    let detection = crate::discover::detect_frameworks(target_root, package_json.as_ref(), &source_samples);
    let uses_supabase = detection.frameworks.iter().any(|f| f == "supabase");
    let primary_framework = detection.frameworks.first().cloned().unwrap_or_default();

    let rls_artifact = rls::finalize(
        multi_tenant_tables,
        rls_policies,
        queries,
        enabled_tables,
        primary_framework,
        uses_supabase,
        has_rls_context_helper,
    );

    let mut artifact = Artifact {
        schema_version: SchemaVersion::CURRENT,
        extracted_at: Utc::now(),
        target_path: target_root.to_string_lossy().to_string(),
        codebase: CodebaseInfo {
            root: target_root.to_string_lossy().to_string(),
            files_scanned,
            frameworks: detection.frameworks,
        },
        services,
        routes: routes_out,
        authz_calls,
        webhook_handlers,
        transaction_scopes,
        cache_operations,
        membership_mutations,
        job_handlers,
        tests,
        call_graph,
        data_flows,
        rls_artifact,
    };
    artifact.normalize();
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn run_on_missing_target_returns_target_not_found() {
        let config = ExtractionConfig::default();
        let err = run(Path::new("/does/not/exist/anywhere"), &config).unwrap_err();
        assert_eq!(err.code(), "E_TARGET_NOT_FOUND");
    }

    #[test]
    fn run_produces_an_artifact_with_extracted_records() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("src/routes")).unwrap();
        std::fs::write(
            temp.path().join("src/routes/webhooks.ts"),
            r#"
export async function handleStripeWebhook(req, res) {
  const event = stripe.webhooks.constructEvent(req.body, req.headers['stripe-signature'], secret);
  const eventId = event.id;
  if (await db.processedEvent.findUnique({ where: { id: eventId } })) {
    return res.status(200).send('ok');
  }
  switch (event.type) {
    case 'payment_intent.succeeded':
      await db.order.update({ where: { id: event.data.object.id }, data: { status: 'paid' } });
      break;
  }
  res.status(200).send('ok');
}
"#,
        )
        .unwrap();

        let config = ExtractionConfig::default();
        let artifact = run(temp.path(), &config).unwrap();
        assert_eq!(artifact.codebase.files_scanned, 1);
        assert_eq!(artifact.webhook_handlers.len(), 1);
        assert_eq!(artifact.webhook_handlers[0].provider, "stripe");
    }

    #[test]
    fn two_runs_on_identical_input_emit_identical_artifact_json() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("src/services")).unwrap();
        std::fs::write(
            temp.path().join("src/services/orders.ts"),
            r#"
export class OrderService {
  async cancel(orderId) {
    await requireRole(['admin']);
    return db.order.update({ where: { id: orderId }, data: { status: 'cancelled' } });
  }
}
"#,
        )
        .unwrap();

        let config = ExtractionConfig::default();
        let mut first = run(temp.path(), &config).unwrap();
        let second = run(temp.path(), &config).unwrap();
        // extracted_at legitimately differs between runs; only the facts need to match.
        first.extracted_at = second.extracted_at;
        let first_json = serde_json::to_string(&first).unwrap();
        let second_json = serde_json::to_string(&second).unwrap();
        assert_eq!(first_json, second_json);
    }
}
