//! The invariant catalog (§4.11): a static, consumer-facing table of
//! security invariant definitions. Orthogonal to the extractors — this
//! module is pure data plus two lookups, no extraction logic.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    P0,
    P1,
    P2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invariant {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub severity: Severity,
    pub category: &'static str,
    pub required_proof: &'static str,
}

/// `(id, name, description, severity, category, requiredProof)` — kept as
/// plain tuples so the catalog reads as a table, not a wall of struct
/// literals, matching the pattern-catalog data tables in `patterns.rs`.
type Row = (&'static str, &'static str, &'static str, Severity, &'static str, &'static str);

use Severity::{P0, P1, P2};

static ROWS: &[Row] = &[
    // --- authorization ---------------------------------------------------
    ("AUTHZ-001", "Missing route authorization", "A route handler performs a data mutation without any preceding authorization check in its call chain.", P0, "authorization", "hasAuthInCallChain(route.handlerFunction) == false"),
    ("AUTHZ-002", "Authorization check after mutation", "An authorization check exists but is reachable only after the mutating call, not before it.", P0, "authorization", "authCheck.line > mutatingCall.line"),
    ("AUTHZ-003", "Role check on client-supplied field", "A role/permission check reads a field sourced directly from request body or query rather than a server-resolved session.", P0, "authorization", "dataflow.flows.any(f => f.sink.description contains 'role' && f.source.kind in [RequestBody, RequestQuery])"),
    ("AUTHZ-004", "Admin route without admin guard", "A route under an admin-prefixed path has hasAuthMiddleware == false.", P0, "authorization", "route.path matches /^\\/(api\\/)?admin\\// && !route.hasAuthMiddleware"),
    ("AUTHZ-005", "Authorization call not in call chain of sensitive service", "A service tagged sensitive has no caller with an authorization call between the route and the service.", P1, "authorization", "hasAuthInCallChain(service.callers)"),
    ("AUTHZ-006", "Ownership check missing on resource mutation", "A mutation of a user-owned resource has no matching ownership comparison (e.g. `resource.userId === session.user.id`) in its function body.", P0, "authorization", "authzCall.kind == 'ownership' present in enclosing function"),
    ("AUTHZ-007", "Authorization bypass via internal flag", "A conditional short-circuits an authorization check when an internal/test flag is set, and that flag is not provably server-controlled.", P0, "authorization", "manual review of authCheck guard expression"),
    ("AUTHZ-008", "Public route exposing private data shape", "A route without hasAuthMiddleware returns a response shape containing fields tagged PII in the data model.", P1, "authorization", "route.hasAuthMiddleware == false && response shape intersects PII fields"),
    ("AUTHZ-009", "NestJS method missing guard despite class guard absent", "A NestJS controller class has no class-level guard decorator and at least one method also lacks one, on a mutating HTTP verb.", P0, "authorization", "!route.hasAuthMiddleware && route.method in [POST,PUT,PATCH,DELETE]"),
    ("AUTHZ-010", "Authorization check targets wrong entity", "The identity term compared in an authorization call does not match the entity type of the resource being mutated.", P1, "authorization", "manual review of authzCall.entityType vs resource type"),

    // --- webhooks ----------------------------------------------------------
    ("WEBHOOK-001", "Webhook signature not verified", "A webhook receiver has signatureVerification.method == 'none'.", P0, "webhooks", "webhook.signatureVerification.method == 'none'"),
    ("WEBHOOK-002", "Webhook handler not idempotent", "A webhook handler processes a mutating event type without hasIdempotencyCheck == true.", P0, "webhooks", "webhook.eventTypeIdempotency[eventType].hasIdempotencyCheck == false"),
    ("WEBHOOK-003", "Webhook event ID not extracted", "A webhook handler has eventIdExtraction.method == 'none', precluding deduplication.", P1, "webhooks", "webhook.eventIdExtraction.method == 'none'"),
    ("WEBHOOK-004", "Webhook persists to cache only", "A webhook that mutates billing state has persistenceMarker.kind == 'cache', risking loss on eviction.", P1, "webhooks", "webhook.persistenceMarker.kind == 'cache' && webhook.provider in ['stripe','paddle','lemonsqueezy']"),
    ("WEBHOOK-005", "Webhook management endpoint exposed without auth", "A file classified as webhook-management has a route with hasAuthMiddleware == false.", P0, "webhooks", "managementFile && !route.hasAuthMiddleware"),
    ("WEBHOOK-006", "Generic HMAC fallback used for named provider", "A webhook handler's detected provider has a dedicated verification method but signatureVerification.method == 'generic_hmac'.", P2, "webhooks", "webhook.provider != 'generic' && webhook.signatureVerification.method == 'generic_hmac'"),
    ("WEBHOOK-007", "Webhook handler name collides with internal sub-handler pattern", "A function matching the negative-catalog internal-sub-handler shape is nonetheless the sole handler for a route.", P2, "webhooks", "manual review"),
    ("WEBHOOK-008", "No persistence marker on webhook with side effects", "A webhook handler has side effects recorded but persistenceMarker.kind == 'none'.", P1, "webhooks", "webhook.persistenceMarker.kind == 'none' && webhook.sideEffectCount > 0"),

    // --- transactions -------------------------------------------------------
    ("TXN-001", "Non-idempotent external call inside transaction", "A TransactionScope contains a SideEffect of kind email, webhook, or external_api.", P1, "transactions", "transactionScope.sideEffects.any(s => s.kind in ['email','webhook','external_api'])"),
    ("TXN-002", "Transaction contains job enqueue", "A TransactionScope contains a SideEffect of kind queue; if the transaction rolls back the job may still run.", P1, "transactions", "transactionScope.sideEffects.any(s => s.kind == 'queue')"),
    ("TXN-003", "Transaction contains analytics call", "A TransactionScope contains a SideEffect of kind analytics, coupling observability to transactional commit.", P2, "transactions", "transactionScope.sideEffects.any(s => s.kind == 'analytics')"),
    ("TXN-004", "Transaction with no recorded ORM operations", "A TransactionScope's functionCalls list contains no call classified as a safe ORM operation, suggesting the transaction wraps nothing that needs atomicity.", P2, "transactions", "transactionScope.functionCalls.none(matches SAFE_ORM_CALL)"),
    ("TXN-005", "Unbounded transaction scope", "A TransactionScope spans more than 200 lines, increasing lock contention risk.", P2, "transactions", "transactionScope.endLine - transactionScope.line > 200"),

    // --- revocation / membership --------------------------------------------
    ("REVOKE-001", "Membership removal without cache invalidation", "A MembershipMutation with mutationType in [remove, revoke, downgrade] has hasCacheInvalidation == false.", P0, "revocation", "membership.mutationType in ['remove','revoke','downgrade'] && !membership.hasCacheInvalidation"),
    ("REVOKE-002", "Low-confidence revocation mutation", "A MembershipMutation has confidence == 'low', meaning the identity term or DB verb could not be confirmed.", P2, "revocation", "membership.confidence == 'low'"),
    ("REVOKE-003", "Session not invalidated on role downgrade", "A downgrade mutation has no corresponding session-invalidation call reachable in its call chain.", P0, "revocation", "!hasCallTo(membership.function, sessionInvalidationCatalog)"),
    ("REVOKE-004", "API key revocation missing cache bust", "A cache operation of kind delete is absent for the same entity key pattern as a credential-revocation mutation.", P1, "revocation", "membership.entityType == 'apiKey' && !membership.hasCacheInvalidation"),

    // --- RLS / multi-tenancy --------------------------------------------------
    ("RLS-001", "Multi-tenant table missing RLS policy", "A MultiTenantTable has hasRlsPolicy == false.", P0, "rls", "table.hasRlsPolicy == false"),
    ("RLS-002", "Query against multi-tenant table without tenant filter", "A Query on a table present in multiTenantTables has hasTenantFilter == false.", P0, "rls", "query.table in multiTenantTables && !query.hasTenantFilter"),
    ("RLS-003", "RLS policy present but query filtering absent", "A MultiTenantTable has hasRlsPolicy == true but hasQueryFiltering == false across all observed queries, suggesting the policy is untested by application code.", P2, "rls", "table.hasRlsPolicy && !table.hasQueryFiltering"),
    ("RLS-004", "RLS policy does not use session context", "An RlsPolicy has usesSessionContext == false, meaning the tenant boundary is hardcoded rather than derived from the authenticated session.", P1, "rls", "policy.usesSessionContext == false"),
    ("RLS-005", "Policy covers only a subset of CRUD operations", "An RlsPolicy's operations list omits DELETE or UPDATE while the table has queries of that operation.", P1, "rls", "policy.operations missing an operation present in table's observed queries"),
    ("RLS-006", "Supabase client call bypasses RLS via service role", "A query built from a Supabase client constructed with a service-role key appears outside an admin-protected context.", P0, "rls", "manual review of supabase client construction"),

    // --- dataflow ---------------------------------------------------------
    ("FLOW-001", "Untrusted input reaches raw SQL", "A Flow has sink.kind == 'sql_query' with isSanitized == false and isValidated == false.", P0, "dataflow", "flow.sink.kind == 'sql_query' && !flow.isSanitized && !flow.isValidated"),
    ("FLOW-002", "Untrusted input reaches command execution", "A Flow has sink.kind == 'command_exec' with isSanitized == false.", P0, "dataflow", "flow.sink.kind == 'command_exec' && !flow.isSanitized"),
    ("FLOW-003", "Untrusted input reaches eval", "A Flow has sink.kind == 'eval'.", P0, "dataflow", "flow.sink.kind == 'eval'"),
    ("FLOW-004", "Untrusted input reaches DOM innerHTML", "A Flow has sink.kind == 'html_response' or a DOM sink with isSanitized == false.", P1, "dataflow", "flow.sink.kind in ['html_response'] && !flow.isSanitized"),
    ("FLOW-005", "Untrusted input reaches file write", "A Flow has sink.kind == 'file_write' with isValidated == false.", P1, "dataflow", "flow.sink.kind == 'file_write' && !flow.isValidated"),
    ("FLOW-006", "Untrusted input reaches file read (path traversal)", "A Flow has sink.kind == 'file_read' where the source kind is request_body, request_query, or url_param and isValidated == false.", P0, "dataflow", "flow.sink.kind == 'file_read' && !flow.isValidated"),
    ("FLOW-007", "Untrusted input reaches redirect (open redirect)", "A Flow has sink.kind == 'redirect' with isValidated == false.", P1, "dataflow", "flow.sink.kind == 'redirect' && !flow.isValidated"),
    ("FLOW-008", "Untrusted input sets a cookie", "A Flow has sink.kind == 'cookie_set' with isSanitized == false.", P1, "dataflow", "flow.sink.kind == 'cookie_set' && !flow.isSanitized"),
    ("FLOW-009", "Untrusted input reaches response header", "A Flow has sink.kind == 'header_set' (response-splitting risk).", P2, "dataflow", "flow.sink.kind == 'header_set' && !flow.isSanitized"),
    ("FLOW-010", "NoSQL injection via unsanitized query object", "A Flow has sink.kind == 'nosql_query' with isSanitized == false.", P0, "dataflow", "flow.sink.kind == 'nosql_query' && !flow.isSanitized"),
    ("FLOW-011", "Unvalidated input reaches a database write", "A Flow has sink.kind == 'database_write' with isValidated == false and isAdminProtected == false.", P1, "dataflow", "flow.sink.kind == 'database_write' && !flow.isValidated && !flow.isAdminProtected"),
    ("FLOW-012", "Source file exceeded dataflow analysis limits", "A source file was skipped by the dataflow extractor because it exceeded maxFileBytes or maxFileLines.", P2, "dataflow", "file excluded from DataFlowGraph by size limit"),

    // --- config -------------------------------------------------------------
    ("CONFIG-001", "Secret referenced with a default fallback value", "A configuration read of a secret-shaped key (`SECRET`, `KEY`, `TOKEN`, `PASSWORD`) provides a non-empty literal default.", P0, "config", "env read matches /\\b(SECRET|KEY|TOKEN|PASSWORD)\\b/ && has literal fallback"),
    ("CONFIG-002", "Debug/permissive flag sourced from environment without a safe default", "A boolean feature flag gating an authz bypass defaults to enabled when its environment variable is unset.", P0, "config", "manual review of flag default"),
    ("CONFIG-003", "CORS origin configured as wildcard", "A CORS middleware configuration sets origin to '*' alongside credentials: true.", P0, "config", "cors config contains origin '*' && credentials == true"),
    ("CONFIG-004", "Service call configuration missing timeout", "A ServiceCall record has no bounded timeout configured for an outbound HTTP client.", P2, "config", "service.timeoutMs is absent"),
    ("CONFIG-005", "Hardcoded connection string in source", "A database connection string literal appears outside a recognized config-loading module.", P1, "config", "literal matches /^(postgres|mysql|mongodb):\\/\\//"),

    // --- crypto --------------------------------------------------------------
    ("CRYPTO-001", "Webhook signature compared with non-constant-time equality", "signatureVerification uses `==` or `.equals()` on the computed digest rather than a constant-time comparison.", P1, "crypto", "signature comparison matches /===|\\.equals\\(/ without timingSafeEqual"),
    ("CRYPTO-002", "Weak hash used for signature verification", "A signature or HMAC computation uses md5 or sha1.", P1, "crypto", "hash algorithm in ['md5','sha1']"),
    ("CRYPTO-003", "Hardcoded cryptographic key or IV", "A key/IV argument to an encryption call is a string literal rather than a config/secret read.", P0, "crypto", "crypto call argument is a string literal"),
    ("CRYPTO-004", "JWT verification accepts 'none' algorithm", "A JWT verify call's algorithms option includes 'none' or is unconstrained.", P0, "crypto", "jwt verify options.algorithms includes 'none' or absent"),
    ("CRYPTO-005", "Password hashed with a fast general-purpose hash", "A password-handling function calls sha256/md5 directly instead of a password-hashing KDF (bcrypt/argon2/scrypt).", P0, "crypto", "password path calls sha256|md5 instead of bcrypt|argon2|scrypt"),

    // --- session --------------------------------------------------------------
    ("SESSION-001", "Session cookie missing httpOnly", "A cookie_set sink's options object does not set httpOnly: true for a session/auth cookie.", P1, "session", "cookie name matches /session|auth|token/i && !options.httpOnly"),
    ("SESSION-002", "Session cookie missing secure flag", "A cookie_set sink's options object does not set secure: true for a session/auth cookie.", P1, "session", "cookie name matches /session|auth|token/i && !options.secure"),
    ("SESSION-003", "Session not rotated on privilege change", "A membership mutation that elevates privilege has no session-regeneration call reachable in its call chain.", P1, "session", "mutationType == 'elevate' && !hasCallTo(sessionRegenerateCatalog)"),
    ("SESSION-004", "Session fixation via pre-auth session ID reuse", "A login handler does not regenerate the session identifier after successful authentication.", P1, "session", "manual review of login handler call chain"),

    // --- auth ----------------------------------------------------------------
    ("AUTH-001", "Password comparison not constant-time", "A password verification path compares a hash with `===` rather than a dedicated compare function.", P1, "auth", "password compare matches /===/ without bcrypt.compare|argon2.verify"),
    ("AUTH-002", "Authentication bypass via query parameter", "An authentication check reads a bypass flag from request query rather than a server-side session.", P0, "auth", "dataflow.flows.any(f => f.sink.description contains 'auth' && f.source.kind == RequestQuery)"),
    ("AUTH-003", "Missing rate limiting on authentication route", "A route matching a login/signup/password-reset path has no rate-limiting middleware in its auth catalog hits.", P1, "auth", "route.path matches /login|signup|reset-password/ && !route.hasRateLimitMiddleware"),
    ("AUTH-004", "Multi-factor bypass via remembered-device cookie without expiry", "An MFA-skip cookie check has no expiry/age validation before trusting the device.", P1, "auth", "manual review of MFA bypass condition"),

    // --- business logic --------------------------------------------------------
    ("BIZ-001", "Price or quantity trusted from client request", "A checkout/order mutation reads a price or amount field directly from request body without a server-side catalog lookup.", P0, "business_logic", "dataflow.flows.any(f => f.sink.description contains 'price' && f.source.kind == RequestBody)"),
    ("BIZ-002", "Discount/coupon code applied without server-side validation", "A coupon-application call chain has no validation transform between the request body source and the order-total sink.", P1, "business_logic", "flow from RequestBody to order-total sink with isValidated == false"),
    ("BIZ-003", "Negative quantity not rejected", "An order-quantity field has no range/sign validation transform before reaching an inventory-decrement sink.", P1, "business_logic", "flow to inventory sink with isValidated == false"),
    ("BIZ-004", "Refund amount not bounded by original charge", "A refund mutation has no comparison against the original transaction amount in its function body.", P0, "business_logic", "manual review of refund handler"),
    ("BIZ-005", "Inventory decrement outside a transaction", "An inventory-decrement call is not contained within any TransactionScope, risking oversell under concurrency.", P1, "business_logic", "inventory call line not within any transactionScope range"),

    // --- authorization (continued) ------------------------------------------
    ("AUTHZ-011", "Shared secret used as bearer token for internal service auth", "An internal service-to-service call authenticates with a static shared secret rather than a scoped, rotatable credential.", P2, "authorization", "manual review of ServiceCall auth header construction"),
    ("AUTHZ-012", "Authorization catalog hit only in comment", "The sole match against the auth catalog for a route's function body falls inside a stripped comment span.", P1, "authorization", "authCatalog match offset falls within a comment range of the uncomment-stripped source"),
    ("AUTHZ-013", "Cross-tenant resource access via unchecked foreign key", "A mutation accepts a foreign-key ID from the request and uses it in a query without a tenant/ownership join filter.", P0, "authorization", "query.hasTenantFilter == false && request-sourced id used as lookup key"),
    ("AUTHZ-014", "Authorization short-circuited by feature flag default", "An authorization gate is wrapped in a feature-flag check whose flag has no explicit off-by-default configuration.", P1, "authorization", "manual review of feature-flag guarded authzCall"),
    ("AUTHZ-015", "GraphQL resolver missing field-level authorization", "A GraphQL resolver function for a sensitive field has no authorization call in its body or call chain.", P0, "authorization", "resolver function has no hasAuthInCallChain hit"),
    ("AUTHZ-016", "Batch endpoint authorizes only the first item", "A bulk-operation route authorizes against a single resource ID while iterating a list of IDs from the request body.", P0, "authorization", "manual review of loop body vs single authzCall placement"),
    ("AUTHZ-017", "Authorization relies on client-supplied role header", "An authorization decision reads a role/permission value from a request header rather than server session state.", P0, "authorization", "dataflow.flows.any(f => f.source.kind == RequestHeader && f.sink.description contains 'role')"),
    ("AUTHZ-018", "Impersonation endpoint without audit trail", "A user-impersonation route has no corresponding audit-log call in its function body.", P1, "authorization", "manual review of impersonation handler"),

    // --- webhooks (continued) -----------------------------------------------
    ("WEBHOOK-009", "Webhook replay window unbounded", "A webhook handler validates signature and timestamp freshness is never checked against a maximum skew.", P1, "webhooks", "webhook handler lacks a timestamp-skew comparison"),
    ("WEBHOOK-010", "Multiple providers detected in a single handler", "A single WebhookHandler matches detection rules for more than one provider, indicating a catalog collision.", P2, "webhooks", "detect_provider matches more than one ProviderRule for the same handler"),
    ("WEBHOOK-011", "Webhook secret read with a hardcoded fallback", "A webhook's signing-secret lookup provides a non-empty string literal as a fallback value.", P0, "webhooks", "secret env read matches CONFIG-001 shape within webhook handler"),
    ("WEBHOOK-012", "Unrecognized event type processed without a default-deny branch", "A webhook handler's event-type switch has no default/else branch that rejects unknown types.", P2, "webhooks", "eventTypes switch lacks a default case"),

    // --- transactions (continued) --------------------------------------------
    ("TXN-006", "Nested transaction scopes detected", "A TransactionScope's function body contains a call to another transaction-starting callee, risking driver-specific nested-transaction semantics.", P2, "transactions", "transactionScope.functionCalls intersects TRANSACTION_CALLEES"),
    ("TXN-007", "Transaction side effect has no description", "A recorded SideEffect has an empty description string, indicating the classifying regex matched zero-width.", P2, "transactions", "sideEffect.description.is_empty()"),
    ("TXN-008", "File-write side effect inside transaction", "A TransactionScope contains a SideEffect of kind file_write, coupling filesystem state to transactional commit.", P1, "transactions", "transactionScope.sideEffects.any(s => s.kind == 'file_write')"),

    // --- revocation (continued) ----------------------------------------------
    ("REVOKE-005", "Team removal leaves owner-less team", "A membership-remove mutation has no check preventing removal of a team's last owner.", P1, "revocation", "manual review of removeMember handler"),
    ("REVOKE-006", "Cache invalidation pattern matched in an unrelated comment", "The matched cache-invalidation snippet for a MembershipMutation falls inside a comment span after stripping.", P1, "revocation", "cacheInvalidation match offset falls within stripped-comment range"),

    // --- RLS (continued) -------------------------------------------------------
    ("RLS-007", "Tenant column present but never referenced in RLS policy body", "A MultiTenantTable's tenantColumn does not appear in the text of any RlsPolicy scoped to that table.", P1, "rls", "no RlsPolicy for table references table.tenantColumn"),
    ("RLS-008", "RLS helper function defined but never invoked in policies", "hasRlsContextHelper == true on the artifact but no RlsPolicy body references a session/context helper call.", P2, "rls", "artifact.hasRlsContextHelper && rls_policies.none(p => p body references context helper)"),
    ("RLS-009", "Multi-tenant table has queries from more than one ORM without consistent filtering", "A table has queries from both a Prisma/Drizzle-style client and a Supabase client, and only one framework's queries apply a tenant filter.", P1, "rls", "grouping queries by framework per table shows divergent hasTenantFilter rates"),

    // --- dataflow (continued) ---------------------------------------------------
    ("FLOW-013", "Source type marked untrusted but flow terminates at a safe sink", "A Flow exists where sink.kind is not in the sensitive sink set, informational only.", P2, "dataflow", "flow.sink.kind not in sensitive sink kinds"),
    ("FLOW-014", "Transform applied but not between source and sink", "A Transform record's line falls outside the [source.line, sink.line] range of the only Flow referencing that function context.", P2, "dataflow", "transform.line not within flow's source/sink line range"),
    ("FLOW-015", "Flow admin-protected marker relies on path convention only", "isAdminProtected is true solely because of an ADMIN_PATH match with no corresponding authorization call confirmed.", P2, "dataflow", "flow.isAdminProtected && no hasAuthInCallChain confirmation for the same function"),

    // --- config (continued) ------------------------------------------------------
    ("CONFIG-006", "Feature flag controls both UI and security behavior", "A single boolean flag gates both a cosmetic UI change and a security-relevant authorization branch.", P2, "config", "manual review of flag usage sites"),
    ("CONFIG-007", "Environment-specific branch disables TLS verification", "A branch keyed on NODE_ENV or similar disables TLS/certificate verification outside of a recognized test path.", P0, "config", "source matches /rejectUnauthorized\\s*:\\s*false/ outside test files"),
    ("CONFIG-008", "Logging configuration includes request body at info level or above", "A logging call logs the full request body/headers at a level other than debug/trace.", P1, "config", "log call arguments include req.body/req.headers at level info|warn|error"),

    // --- crypto (continued) --------------------------------------------------------
    ("CRYPTO-006", "Random token generated with a non-CSPRNG source", "A token/ID generator uses Math.random() rather than a cryptographically secure source.", P0, "crypto", "token generation calls Math.random"),
    ("CRYPTO-007", "Encryption mode omits authentication (ECB/CBC without HMAC)", "A symmetric encryption call uses ECB or CBC mode without a paired HMAC or AEAD construction.", P1, "crypto", "cipher mode in ['ecb','cbc'] without accompanying hmac call"),

    // --- session (continued) ------------------------------------------------------
    ("SESSION-005", "Session store has no expiry configured", "A session-store configuration object omits maxAge/expires, leaving sessions valid indefinitely.", P1, "session", "session config object lacks maxAge|expires field"),
    ("SESSION-006", "Logout does not invalidate server-side session record", "A logout route handler clears only the client cookie without a corresponding server-side session-deletion call.", P1, "session", "logout handler has cookie clear but no session store delete call"),

    // --- auth (continued) -----------------------------------------------------------
    ("AUTH-005", "Password reset token has no expiry check", "A password-reset verification path does not compare the token's issued time against a maximum age.", P0, "auth", "reset handler lacks an expiry comparison on the reset token"),
    ("AUTH-006", "Account enumeration via differing error messages", "A login or password-reset handler returns a distinguishable error for 'user not found' versus 'wrong password'.", P2, "auth", "manual review of error-branch messages"),
    ("AUTH-007", "OAuth state parameter not validated", "An OAuth callback handler does not compare the returned state parameter against the one issued at authorization start.", P1, "auth", "callback handler lacks a state-comparison check"),

    // --- business logic (continued) -----------------------------------------------
    ("BIZ-006", "Webhook-confirmed payment not reconciled against stored order total", "A payment-confirmation webhook updates order status without comparing the charged amount to the stored order total.", P0, "business_logic", "webhook handler updates order status without an amount-equality check"),
    ("BIZ-007", "Subscription tier change takes effect before payment confirmation", "A plan-upgrade mutation grants the new tier's entitlements before a corresponding successful-payment event is observed.", P1, "business_logic", "upgrade mutation not gated on payment-success event in call chain"),
    ("BIZ-008", "Idempotency key not enforced on payment-initiating route", "A route that creates a charge or payment intent has no idempotency-key parameter read from the request.", P1, "business_logic", "payment-creation route body lacks an idempotency key read"),
];

static CATALOG: Lazy<Vec<Invariant>> = Lazy::new(|| {
    ROWS.iter()
        .map(|(id, name, description, severity, category, required_proof)| Invariant {
            id,
            name,
            description,
            severity: *severity,
            category,
            required_proof,
        })
        .collect()
});

pub fn all() -> &'static [Invariant] {
    &CATALOG
}

pub fn by_id(id: &str) -> Option<&'static Invariant> {
    CATALOG.iter().find(|inv| inv.id == id)
}

pub fn by_category(category: &str) -> Vec<&'static Invariant> {
    CATALOG.iter().filter(|inv| inv.category == category).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_ids_are_unique() {
        let mut ids: Vec<&str> = CATALOG.iter().map(|i| i.id).collect();
        let before = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), before);
    }

    #[test]
    fn by_id_finds_known_entry() {
        let inv = by_id("RLS-002").expect("RLS-002 present");
        assert_eq!(inv.severity, Severity::P0);
    }

    #[test]
    fn by_category_returns_only_matching_rows() {
        let webhooks = by_category("webhooks");
        assert!(!webhooks.is_empty());
        assert!(webhooks.iter().all(|i| i.category == "webhooks"));
    }
}
