//! Common record shapes produced by the extractors (spec-equivalent of
//! `trace::types`'s `Symbol`/`Token`/`Reference`, generalized from a
//! compact mmap-friendly layout to plain owned JSON records — an Artifact
//! is serialized once and discarded, not persisted or mapped back in).

use serde::{Deserialize, Serialize};

/// HTTP method recognized by the routes extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    #[serde(rename = "GET")]
    Get,
    #[serde(rename = "POST")]
    Post,
    #[serde(rename = "PUT")]
    Put,
    #[serde(rename = "DELETE")]
    Delete,
    #[serde(rename = "PATCH")]
    Patch,
    #[serde(rename = "ALL")]
    All,
    #[serde(rename = "OPTIONS")]
    Options,
    #[serde(rename = "HEAD")]
    Head,
}

/// Confidence rises low -> medium -> high as weak signals converge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub file: String,
    pub line: u32,
    pub name: String,
    pub exports: Vec<String>,
    pub directives: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub file: String,
    pub line: u32,
    pub method: HttpMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler_name: Option<String>,
    pub has_auth_middleware: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_middleware: Option<Vec<String>>,
    pub service_calls: Vec<String>,
    pub framework: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthzCall {
    pub file: String,
    pub line: u32,
    pub function_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caller_function: Option<String>,
    pub arguments: Vec<String>,
}

/// Method used to extract a webhook's signature, event id, or persistence
/// marker — `None`/"none" is itself a meaningful, reportable result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionMethod {
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceKind {
    Database,
    Cache,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceMarker {
    #[serde(rename = "type")]
    pub kind: PersistenceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Per-branch idempotency coverage, keyed by the `case`/`if` condition that
/// introduced the branch (e.g. `event.type === 'checkout.completed'`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTypeIdempotency {
    pub event_type: String,
    pub has_idempotency_check: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookHandler {
    pub file: String,
    pub line: u32,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_types: Option<Vec<String>>,
    pub has_idempotency_check: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key_location: Option<String>,
    pub event_id_extraction: ExtractionMethod,
    pub signature_verification: ExtractionMethod,
    pub persistence_marker: PersistenceMarker,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type_idempotency: Option<Vec<EventTypeIdempotency>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffectType {
    Email,
    Webhook,
    ExternalApi,
    Analytics,
    Queue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideEffect {
    #[serde(rename = "type")]
    pub kind: SideEffectType,
    pub file: String,
    pub line: u32,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionScope {
    pub file: String,
    pub line: u32,
    pub end_line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    pub contains_side_effects: bool,
    pub side_effects: Vec<SideEffect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_calls: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheOpType {
    Get,
    Set,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheOperation {
    pub file: String,
    pub line: u32,
    #[serde(rename = "type")]
    pub kind: CacheOpType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caller_function: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationType {
    Remove,
    Update,
    Downgrade,
    Revoke,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationEntity {
    Member,
    Team,
    Role,
    Permission,
    #[serde(rename = "apiKey")]
    ApiKey,
    Session,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipMutation {
    pub file: String,
    pub line: u32,
    pub function_name: String,
    pub mutation_type: MutationType,
    pub entity: MutationEntity,
    pub has_cache_invalidation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalidation_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_cache_keys: Option<Vec<String>>,
    pub signals: Vec<String>,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobFramework {
    Trigger,
    Bullmq,
    Inngest,
    Custom,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobHandler {
    pub file: String,
    pub line: u32,
    pub name: String,
    pub has_idempotency_check: bool,
    pub framework: JobFramework,
}

/// Structural evidence of what a test asserts; downstream invariants check
/// "proof tests exist" against this, not the test body itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestFact {
    pub file: String,
    pub line: u32,
    pub name: String,
    pub framework: Option<String>,
    pub assertion_count: u32,
}
