//! Intra-function taint graph: sources, sinks, transforms and the flows
//! connecting them. Grounded in shape on the `kanren`-style taint facts in
//! the reference pack (`TaintSource`/`TaintSink`/`TaintFlow`), adapted to
//! the source/sink/transform/flow vocabulary this spec defines.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    RequestBody,
    RequestParams,
    RequestQuery,
    RequestHeaders,
    RequestCookies,
    FormData,
    UrlParam,
    UserInput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub file: String,
    pub line: u32,
    #[serde(rename = "type")]
    pub kind: SourceType,
    pub variable: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    DatabaseQuery,
    DatabaseWrite,
    SqlQuery,
    NosqlQuery,
    FileRead,
    FileWrite,
    CommandExec,
    Eval,
    Redirect,
    HtmlResponse,
    HeaderSet,
    CookieSet,
    DomSink,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sink {
    pub file: String,
    pub line: u32,
    #[serde(rename = "type")]
    pub kind: SinkType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_context: Option<String>,
    pub context: String,
    pub tainted_inputs: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformType {
    Validate,
    Sanitize,
    Encode,
    Parse,
    Slice,
    Filter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    pub file: String,
    pub line: u32,
    #[serde(rename = "type")]
    pub kind: TransformType,
    pub input_variable: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_variable: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_context: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    pub source: Source,
    pub sink: Sink,
    pub transforms: Vec<Transform>,
    pub is_sanitized: bool,
    pub is_validated: bool,
    pub is_admin_protected: bool,
    pub flow_path: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFlowGraph {
    pub sources: Vec<Source>,
    pub sinks: Vec<Sink>,
    pub transforms: Vec<Transform>,
    pub flows: Vec<Flow>,
}

/// The untrusted-source set used by connection strategy (c): an unresolved
/// `'input'` binding still counts as tainted when it comes from one of these.
pub const UNTRUSTED_SOURCE_TYPES: &[SourceType] = &[
    SourceType::RequestBody,
    SourceType::RequestParams,
    SourceType::RequestQuery,
    SourceType::RequestHeaders,
    SourceType::RequestCookies,
    SourceType::FormData,
    SourceType::UrlParam,
    SourceType::UserInput,
];
