//! Row-level-security artifact: multi-tenant table inventory, the RLS
//! policies a migration actually enables, and the ORM/Supabase queries
//! checked against them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiTenantTable {
    pub file: String,
    pub line: u32,
    pub table: String,
    pub tenant_column: String,
    pub tenant_pattern: String,
    pub has_rls_policy: bool,
    pub has_query_filtering: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_tables: Option<Vec<String>>,
    pub framework: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyType {
    Using,
    WithCheck,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PolicyOperation {
    Select,
    Insert,
    Update,
    Delete,
    All,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RlsPolicy {
    pub file: String,
    pub line: u32,
    pub table: String,
    pub policy_name: String,
    pub policy_type: PolicyType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_column: Option<String>,
    pub uses_session_context: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_context_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operations: Option<Vec<PolicyOperation>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryOperation {
    Select,
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub file: String,
    pub line: u32,
    pub table: String,
    pub operation: QueryOperation,
    pub has_tenant_filter: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_filter_expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub containing_function: Option<String>,
    pub framework: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RlsArtifact {
    pub multi_tenant_tables: Vec<MultiTenantTable>,
    pub rls_policies: Vec<RlsPolicy>,
    pub queries: Vec<Query>,
    pub framework: String,
    pub uses_supabase: bool,
    pub has_rls_context_helper: bool,
}

impl RlsArtifact {
    /// Lifecycle step 3: flips `hasQueryFiltering` on tables whose queries
    /// include a tenant filter, and `hasRLSPolicy` for tables a migration's
    /// `CREATE POLICY` referenced (case-insensitive table-name match).
    pub fn apply_post_pass(&mut self) {
        let filtered_tables: std::collections::HashSet<String> = self
            .queries
            .iter()
            .filter(|q| q.has_tenant_filter)
            .map(|q| q.table.to_lowercase())
            .collect();
        let policy_tables: std::collections::HashSet<String> = self
            .rls_policies
            .iter()
            .map(|p| p.table.to_lowercase())
            .collect();

        for table in &mut self.multi_tenant_tables {
            let name = table.table.to_lowercase();
            if filtered_tables.contains(&name) {
                table.has_query_filtering = true;
            }
            if policy_tables.contains(&name) {
                table.has_rls_policy = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_pass_flips_query_filtering_and_rls_policy() {
        let mut artifact = RlsArtifact {
            multi_tenant_tables: vec![MultiTenantTable {
                file: "schema.prisma".into(),
                line: 10,
                table: "Order".into(),
                tenant_column: "organizationId".into(),
                tenant_pattern: "organizationId".into(),
                has_rls_policy: false,
                has_query_filtering: false,
                related_tables: None,
                framework: "prisma".into(),
            }],
            rls_policies: vec![RlsPolicy {
                file: "migrations/0001.sql".into(),
                line: 3,
                table: "order".into(),
                policy_name: "tenant_isolation".into(),
                policy_type: PolicyType::Using,
                tenant_column: Some("organization_id".into()),
                uses_session_context: true,
                session_context_pattern: Some("current_setting".into()),
                operations: Some(vec![PolicyOperation::Select]),
            }],
            queries: vec![Query {
                file: "src/orders.ts".into(),
                line: 20,
                table: "order".into(),
                operation: QueryOperation::Select,
                has_tenant_filter: true,
                tenant_filter_expression: Some("organizationId".into()),
                containing_function: Some("listOrders".into()),
                framework: "prisma".into(),
            }],
            framework: "prisma".into(),
            uses_supabase: false,
            has_rls_context_helper: false,
        };

        artifact.apply_post_pass();
        assert!(artifact.multi_tenant_tables[0].has_query_filtering);
        assert!(artifact.multi_tenant_tables[0].has_rls_policy);
    }
}
