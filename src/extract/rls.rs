//! Row-level-security extractor: three independent subroutines — Prisma
//! schema parsing, SQL migration parsing, and ORM/Supabase query scanning —
//! whose outputs are reconciled by `RlsArtifact::apply_post_pass`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::extract::ast::{call_sites, enclosing_function, function_spans, ParsedFile};
use crate::model::rls::{
    MultiTenantTable, PolicyOperation, PolicyType, Query, QueryOperation, RlsArtifact, RlsPolicy,
};

struct TenantRule {
    regex: Regex,
    label: &'static str,
}

static TENANT_RULES: Lazy<Vec<TenantRule>> = Lazy::new(|| {
    vec![
        TenantRule { regex: Regex::new(r"(?i)organization_?id").unwrap(), label: "organizationId" },
        TenantRule { regex: Regex::new(r"(?i)\borg_id\b").unwrap(), label: "org_id" },
        TenantRule { regex: Regex::new(r"(?i)tenant_?id").unwrap(), label: "tenantId" },
        TenantRule { regex: Regex::new(r"(?i)team_?id").unwrap(), label: "teamId" },
        TenantRule { regex: Regex::new(r"(?i)workspace_?id").unwrap(), label: "workspaceId" },
        TenantRule { regex: Regex::new(r"(?i)account_?id").unwrap(), label: "accountId" },
        TenantRule { regex: Regex::new(r"(?i)company_?id").unwrap(), label: "companyId" },
        TenantRule { regex: Regex::new(r"(?i)user_?id").unwrap(), label: "userId" },
        TenantRule { regex: Regex::new(r"(?i)owner_?id").unwrap(), label: "ownerId" },
        TenantRule { regex: Regex::new(r"(?i)created_?by_?id").unwrap(), label: "createdById" },
        TenantRule { regex: Regex::new(r"(?i)author_?id").unwrap(), label: "authorId" },
    ]
});

fn detect_tenant_pattern(text: &str) -> Option<(&'static str, String)> {
    TENANT_RULES.iter().find_map(|rule| {
        rule.regex.find(text).map(|m| (rule.label, m.as_str().to_string()))
    })
}

static PRIMARY_KEY_FILTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"where:\s*\{\s*id\b|\.eq\(\s*['"]id['"]"#).unwrap());

// --- Subroutine 1: Prisma schema -------------------------------------------------

static MODEL_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)model\s+(\w+)\s*\{([^}]*)\}").unwrap());
static FIELD_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*(\w+)\s+(\w+)").unwrap());
const RELATION_MODELS: &[&str] = &["Organization", "Tenant", "Team", "Workspace", "Account", "Company"];

pub fn extract_prisma_schema(relative_path: &str, schema_text: &str) -> Vec<MultiTenantTable> {
    let mut out = Vec::new();
    for model_cap in MODEL_BLOCK.captures_iter(schema_text) {
        let table = model_cap[1].to_string();
        let body = &model_cap[2];
        let line = schema_text[..model_cap.get(0).unwrap().start()].lines().count() as u32 + 1;

        let mut tenant_hit = None;
        let mut related = Vec::new();
        for field_cap in FIELD_LINE.captures_iter(body) {
            let field_name = &field_cap[1];
            let field_type = &field_cap[2];
            if tenant_hit.is_none() {
                if let Some((label, matched)) = detect_tenant_pattern(field_name) {
                    tenant_hit = Some((field_name.to_string(), label, matched));
                }
            }
            if RELATION_MODELS.contains(&field_type) && !related.contains(&field_type.to_string()) {
                related.push(field_type.to_string());
            }
        }

        let Some((tenant_column, tenant_pattern, _)) = tenant_hit else {
            continue;
        };
        out.push(MultiTenantTable {
            file: relative_path.to_string(),
            line,
            table,
            tenant_column,
            tenant_pattern: tenant_pattern.to_string(),
            has_rls_policy: false,
            has_query_filtering: false,
            related_tables: if related.is_empty() { None } else { Some(related) },
            framework: "prisma".to_string(),
        });
    }
    out
}

// --- Subroutine 2: SQL migrations -------------------------------------------------

static ALTER_ENABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)ALTER\s+TABLE\s+"?(\w+)"?\s+ENABLE\s+ROW\s+LEVEL\s+SECURITY"#).unwrap());
static CREATE_POLICY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)CREATE\s+POLICY\s+"?(\w+)"?\s+ON\s+"?(\w+)"?\s*(.*?);"#).unwrap());
static FOR_CLAUSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)FOR\s+(SELECT|INSERT|UPDATE|DELETE|ALL)").unwrap());
static SESSION_CONTEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"current_setting\(|auth\.uid\(\)|auth\.jwt\(\)").unwrap());

fn policy_operation(raw: &str) -> PolicyOperation {
    match raw.to_uppercase().as_str() {
        "SELECT" => PolicyOperation::Select,
        "INSERT" => PolicyOperation::Insert,
        "UPDATE" => PolicyOperation::Update,
        "DELETE" => PolicyOperation::Delete,
        _ => PolicyOperation::All,
    }
}

/// Returns the parsed policies plus the set of tables a bare
/// `ALTER TABLE ... ENABLE ROW LEVEL SECURITY` touched (which may have no
/// accompanying `CREATE POLICY` in the same migration).
pub fn extract_sql_migration(relative_path: &str, sql_text: &str) -> (Vec<RlsPolicy>, Vec<String>) {
    let enabled_tables: Vec<String> = ALTER_ENABLE
        .captures_iter(sql_text)
        .map(|c| c[1].to_string())
        .collect();

    let mut policies = Vec::new();
    for cap in CREATE_POLICY.captures_iter(sql_text) {
        let policy_name = cap[1].to_string();
        let table = cap[2].to_string();
        let body = cap[3].to_string();
        let line = sql_text[..cap.get(0).unwrap().start()].lines().count() as u32 + 1;

        let has_using = body.to_uppercase().contains("USING");
        let has_with_check = body.to_uppercase().contains("WITH CHECK");
        let policy_type = match (has_using, has_with_check) {
            (true, true) => PolicyType::Both,
            (false, true) => PolicyType::WithCheck,
            _ => PolicyType::Using,
        };
        let operations: Vec<PolicyOperation> =
            FOR_CLAUSE.captures_iter(&body).map(|c| policy_operation(&c[1])).collect();
        let tenant_column = detect_tenant_pattern(&body).map(|(_, matched)| matched);

        policies.push(RlsPolicy {
            file: relative_path.to_string(),
            line,
            table,
            policy_name,
            policy_type,
            tenant_column,
            uses_session_context: SESSION_CONTEXT.is_match(&body),
            session_context_pattern: SESSION_CONTEXT.find(&body).map(|m| m.as_str().to_string()),
            operations: if operations.is_empty() { None } else { Some(operations) },
        });
    }
    (policies, enabled_tables)
}

// --- Subroutine 3: ORM/Supabase queries -------------------------------------------------

const PRISMA_OBJECTS: &[&str] = &["prisma", "db", "tx", "client"];

fn prisma_verb(callee: &str) -> Option<QueryOperation> {
    match callee {
        "findMany" | "findUnique" | "findFirst" | "count" | "aggregate" => Some(QueryOperation::Select),
        "create" | "createMany" | "upsert" => Some(QueryOperation::Insert),
        "update" | "updateMany" => Some(QueryOperation::Update),
        "delete" | "deleteMany" => Some(QueryOperation::Delete),
        _ => None,
    }
}

fn supabase_verb(callee: &str) -> Option<QueryOperation> {
    match callee {
        "select" => Some(QueryOperation::Select),
        "insert" | "upsert" => Some(QueryOperation::Insert),
        "update" => Some(QueryOperation::Update),
        "delete" => Some(QueryOperation::Delete),
        _ => None,
    }
}

static SUPABASE_FROM: Lazy<Regex> = Lazy::new(|| Regex::new(r#"supabase\.from\(\s*['"]([^'"]+)['"]"#).unwrap());

pub fn extract_queries(relative_path: &str, parsed: &ParsedFile) -> Vec<Query> {
    let spans = function_spans(parsed);
    let lines: Vec<&str> = parsed.source.lines().collect();
    let mut out = Vec::new();

    for call in call_sites(parsed) {
        let Some(object) = &call.object else { continue };

        let (table, operation, framework) = if let Some((root, table)) = object.split_once('.') {
            if PRISMA_OBJECTS.contains(&root) {
                match prisma_verb(&call.callee) {
                    Some(op) => (table.to_string(), op, "prisma"),
                    None => continue,
                }
            } else {
                continue;
            }
        } else if let Some(cap) = SUPABASE_FROM.captures(object) {
            match supabase_verb(&call.callee) {
                Some(op) => (cap[1].to_string(), op, "supabase"),
                None => continue,
            }
        } else {
            continue;
        };

        let line_text = lines.get((call.line.saturating_sub(1)) as usize).copied().unwrap_or("");
        let has_tenant_filter = detect_tenant_pattern(&call.text).is_some()
            || PRIMARY_KEY_FILTER.is_match(&call.text)
            || PRIMARY_KEY_FILTER.is_match(line_text);

        out.push(Query {
            file: relative_path.to_string(),
            line: call.line,
            table,
            operation,
            has_tenant_filter,
            tenant_filter_expression: detect_tenant_pattern(&call.text).map(|(_, m)| m),
            containing_function: enclosing_function(&spans, call.line).map(|f| f.name.clone()),
            framework: framework.to_string(),
        });
    }
    out.sort_by_key(|q| q.line);
    out
}

/// Assembles the full artifact from each subroutine's output and applies
/// the lifecycle post-pass, including the bare `ENABLE ROW LEVEL SECURITY`
/// tables that never accumulate a matching `CREATE POLICY`.
pub fn finalize(
    multi_tenant_tables: Vec<MultiTenantTable>,
    rls_policies: Vec<RlsPolicy>,
    queries: Vec<Query>,
    enabled_tables: Vec<String>,
    framework: String,
    uses_supabase: bool,
    has_rls_context_helper: bool,
) -> RlsArtifact {
    let mut artifact = RlsArtifact {
        multi_tenant_tables,
        rls_policies,
        queries,
        framework,
        uses_supabase,
        has_rls_context_helper,
    };
    artifact.apply_post_pass();

    let enabled_lower: std::collections::HashSet<String> =
        enabled_tables.iter().map(|t| t.to_lowercase()).collect();
    for table in &mut artifact.multi_tenant_tables {
        if enabled_lower.contains(&table.table.to_lowercase()) {
            table.has_rls_policy = true;
        }
    }
    artifact
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ast::{parse_source, SourceLang};

    #[test]
    fn prisma_schema_finds_tenant_column_and_relations() {
        let schema = r#"
model Order {
  id             String @id
  organizationId String
  organization   Organization @relation(fields: [organizationId], references: [id])
}
"#;
        let tables = extract_prisma_schema("prisma/schema.prisma", schema);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].table, "Order");
        assert_eq!(tables[0].tenant_column, "organizationId");
        assert_eq!(tables[0].related_tables.as_ref().unwrap(), &["Organization".to_string()]);
    }

    #[test]
    fn migration_enables_rls_and_creates_policy() {
        let sql = r#"
ALTER TABLE "order" ENABLE ROW LEVEL SECURITY;
CREATE POLICY tenant_isolation ON "order"
  FOR SELECT
  USING (organization_id = current_setting('app.org_id')::text);
"#;
        let (policies, enabled) = extract_sql_migration("migrations/0001.sql", sql);
        assert_eq!(enabled, vec!["order".to_string()]);
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].policy_type, PolicyType::Using);
        assert!(policies[0].uses_session_context);
        assert_eq!(policies[0].operations.as_ref().unwrap(), &[PolicyOperation::Select]);
    }

    #[test]
    fn prisma_query_without_tenant_filter_is_flagged() {
        let src = "async function listOrders(){ return db.order.findMany({}); }";
        let parsed = parse_source(src, SourceLang::TypeScript).unwrap();
        let queries = extract_queries("src/orders.ts", &parsed);
        assert_eq!(queries.len(), 1);
        assert!(!queries[0].has_tenant_filter);
    }
}
