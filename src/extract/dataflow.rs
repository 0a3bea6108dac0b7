//! Data-flow (taint) extractor: sources, sinks, transforms, and the
//! intra-function flows connecting them, per the three connection
//! strategies in §3.4/§4.9.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::config::DataflowLimits;
use crate::extract::ast::{call_sites, enclosing_function, function_spans, ParsedFile};
use crate::model::dataflow::{
    DataFlowGraph, Flow, Sink, SinkType, Source, SourceType, Transform, TransformType,
    UNTRUSTED_SOURCE_TYPES,
};

static SOURCE_BINDING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:const|let|var)\s+(?:\{([^}]+)\}|(\w+))\s*=\s*(req\.(?:body|params|query|headers|cookies)(?:\.[\w]+)*|request\.formData\(\)|\w+\.params\.\w+)").unwrap()
});

fn classify_source(rhs: &str) -> SourceType {
    if rhs.contains(".body") {
        SourceType::RequestBody
    } else if rhs.contains(".query") {
        SourceType::RequestQuery
    } else if rhs.contains(".headers") {
        SourceType::RequestHeaders
    } else if rhs.contains(".cookies") {
        SourceType::RequestCookies
    } else if rhs.contains("formData") {
        SourceType::FormData
    } else if rhs.contains(".params") {
        SourceType::RequestParams
    } else {
        SourceType::UrlParam
    }
}

fn binding_variable(destructure: Option<&str>, plain: Option<&str>) -> String {
    if let Some(d) = destructure {
        d.split(',')
            .map(|part| part.split(':').last().unwrap_or(part).trim())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(",")
    } else {
        plain.unwrap_or("input").to_string()
    }
}

struct SinkRule {
    regex: Regex,
    kind: SinkType,
}

static SINK_RULES: Lazy<Vec<SinkRule>> = Lazy::new(|| {
    vec![
        SinkRule { regex: Regex::new(r"\$queryRaw(Unsafe)?\(|\$executeRaw(Unsafe)?\(|knex\.raw\(").unwrap(), kind: SinkType::SqlQuery },
        SinkRule { regex: Regex::new(r"\b(exec|execSync|spawn)\s*\(").unwrap(), kind: SinkType::CommandExec },
        SinkRule { regex: Regex::new(r"\beval\s*\(").unwrap(), kind: SinkType::Eval },
        SinkRule { regex: Regex::new(r"fs\.(writeFile|appendFile)\w*\(").unwrap(), kind: SinkType::FileWrite },
        SinkRule { regex: Regex::new(r"fs\.readFile\w*\(").unwrap(), kind: SinkType::FileRead },
        SinkRule { regex: Regex::new(r"\.redirect\s*\(").unwrap(), kind: SinkType::Redirect },
        SinkRule { regex: Regex::new(r"\.cookie\s*\(").unwrap(), kind: SinkType::CookieSet },
        SinkRule { regex: Regex::new(r"\.setHeader\s*\(").unwrap(), kind: SinkType::HeaderSet },
        SinkRule { regex: Regex::new(r"\.(send|write)\s*\(").unwrap(), kind: SinkType::HtmlResponse },
        SinkRule { regex: Regex::new(r"\.aggregate\s*\(").unwrap(), kind: SinkType::NosqlQuery },
        SinkRule { regex: Regex::new(r"\.(create|update|delete|upsert)\s*\(").unwrap(), kind: SinkType::DatabaseWrite },
        SinkRule { regex: Regex::new(r"\.(find|findMany|findUnique|findFirst|select)\s*\(").unwrap(), kind: SinkType::DatabaseQuery },
    ]
});

static DOM_SINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.innerHTML\s*=").unwrap());
static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([a-zA-Z_$][\w$]*)\b").unwrap());
const IDENTIFIER_STOPLIST: &[&str] = &[
    "console", "JSON", "Math", "Object", "Array", "await", "async", "function", "const", "let",
    "var", "return", "if", "else", "true", "false", "null", "undefined", "this", "new",
];

fn tainted_inputs(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    IDENTIFIER
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .filter(|id| !IDENTIFIER_STOPLIST.contains(&id.as_str()))
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

struct TransformRule {
    regex: Regex,
    kind: TransformType,
}

static TRANSFORM_RULES: Lazy<Vec<TransformRule>> = Lazy::new(|| {
    vec![
        TransformRule { regex: Regex::new(r"\bvalidate\s*\(|\.parse\s*\(|zod\.|yup\.").unwrap(), kind: TransformType::Validate },
        TransformRule { regex: Regex::new(r"\bsanitize\s*\(|DOMPurify|\.escape\s*\(").unwrap(), kind: TransformType::Sanitize },
        TransformRule { regex: Regex::new(r"encodeURIComponent\s*\(|\bencode\s*\(").unwrap(), kind: TransformType::Encode },
        TransformRule { regex: Regex::new(r"JSON\.parse\s*\(|parseInt\s*\(|parseFloat\s*\(").unwrap(), kind: TransformType::Parse },
        TransformRule { regex: Regex::new(r"\.slice\s*\(|\.substring\s*\(").unwrap(), kind: TransformType::Slice },
        TransformRule { regex: Regex::new(r"\.filter\s*\(").unwrap(), kind: TransformType::Filter },
    ]
});

static ADMIN_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(/admin/|/dashboard/|/internal/|/backoffice/)").unwrap());
static ADMIN_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(^admin|Admin$|^internal|^superuser)").unwrap());

fn extract_sources(relative_path: &str, source_text: &str, spans: &[crate::extract::ast::FunctionSpan]) -> Vec<Source> {
    let mut out = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for cap in SOURCE_BINDING.captures_iter(source_text) {
        let line = source_text[..cap.get(0).unwrap().start()].lines().count() as u32 + 1;
        let rhs = cap[3].to_string();
        let kind = classify_source(&rhs);
        if !seen.insert((line, kind)) {
            continue;
        }
        let variable = binding_variable(cap.get(1).map(|m| m.as_str()), cap.get(2).map(|m| m.as_str()));
        out.push(Source {
            file: relative_path.to_string(),
            line,
            kind,
            variable,
            function_context: enclosing_function(spans, line).map(|f| f.name.clone()),
            access_path: Some(rhs),
        });
    }
    out.sort_by_key(|s| s.line);
    out
}

fn extract_sinks(relative_path: &str, parsed: &ParsedFile, spans: &[crate::extract::ast::FunctionSpan]) -> Vec<Sink> {
    let mut out = Vec::new();
    for call in call_sites(parsed) {
        let Some(rule) = SINK_RULES.iter().find(|r| r.regex.is_match(&call.text)) else {
            continue;
        };
        out.push(Sink {
            file: relative_path.to_string(),
            line: call.line,
            kind: rule.kind,
            function_context: enclosing_function(spans, call.line).map(|f| f.name.clone()),
            context: call.text.chars().take(160).collect(),
            tainted_inputs: tainted_inputs(&call.text),
        });
    }
    for m in DOM_SINK.find_iter(&parsed.source) {
        let line = parsed.source[..m.start()].lines().count() as u32 + 1;
        out.push(Sink {
            file: relative_path.to_string(),
            line,
            kind: SinkType::DomSink,
            function_context: enclosing_function(spans, line).map(|f| f.name.clone()),
            context: m.as_str().to_string(),
            tainted_inputs: Vec::new(),
        });
    }
    out.sort_by_key(|s| s.line);
    out
}

fn extract_transforms(relative_path: &str, parsed: &ParsedFile, spans: &[crate::extract::ast::FunctionSpan]) -> Vec<Transform> {
    let mut out = Vec::new();
    for call in call_sites(parsed) {
        let Some(rule) = TRANSFORM_RULES.iter().find(|r| r.regex.is_match(&call.text)) else {
            continue;
        };
        out.push(Transform {
            file: relative_path.to_string(),
            line: call.line,
            kind: rule.kind,
            input_variable: call.arguments.first().cloned().unwrap_or_default(),
            output_variable: None,
            function_context: enclosing_function(spans, call.line).map(|f| f.name.clone()),
            description: call.text.chars().take(80).collect(),
        });
    }
    out.sort_by_key(|t| t.line);
    out
}

fn is_admin_protected(relative_path: &str, function_name: &str) -> bool {
    ADMIN_PATH.is_match(relative_path) || ADMIN_NAME.is_match(function_name)
}

fn connects(source: &Source, tainted_inputs: &[String]) -> bool {
    let lower_inputs: Vec<String> = tainted_inputs.iter().map(|t| t.to_lowercase()).collect();
    let var_matches = source
        .variable
        .split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .any(|t| lower_inputs.iter().any(|i| i.contains(&t) || t.contains(i.as_str())));
    if var_matches {
        return true;
    }
    if let Some(path) = &source.access_path {
        if let Some(leaf) = path.rsplit('.').next() {
            let leaf = leaf.to_lowercase();
            if lower_inputs.iter().any(|i| i.contains(&leaf)) {
                return true;
            }
        }
    }
    source.variable == "input" && UNTRUSTED_SOURCE_TYPES.contains(&source.kind)
}

fn build_flows(sources: &[Source], sinks: &[Sink], transforms: &[Transform], relative_path: &str) -> Vec<Flow> {
    let mut flows = Vec::new();
    for source in sources {
        for sink in sinks {
            if source.function_context.is_none() || source.function_context != sink.function_context {
                continue;
            }
            if !connects(source, &sink.tainted_inputs) {
                continue;
            }
            let (lo, hi) = if source.line <= sink.line {
                (source.line, sink.line)
            } else {
                (sink.line, source.line)
            };
            let between: Vec<&Transform> = transforms
                .iter()
                .filter(|t| t.function_context == source.function_context && t.line >= lo && t.line <= hi)
                .collect();
            let is_sanitized = between.iter().any(|t| t.kind == TransformType::Sanitize);
            let is_validated = between.iter().any(|t| t.kind == TransformType::Validate);
            let function_name = source.function_context.clone().unwrap_or_default();

            let mut flow_path = vec![source.variable.clone()];
            flow_path.extend(between.iter().filter_map(|t| t.output_variable.clone()));
            if let Some(first) = sink.tainted_inputs.first() {
                flow_path.push(first.clone());
            }

            flows.push(Flow {
                source: source.clone(),
                sink: sink.clone(),
                transforms: between.into_iter().cloned().collect(),
                is_sanitized,
                is_validated,
                is_admin_protected: is_admin_protected(relative_path, &function_name),
                flow_path,
            });
        }
    }
    flows
}

/// Returns `None` when the file exceeds the configured byte/line caps —
/// the caller logs a `skip` event and moves on rather than treating it as
/// an error.
pub fn extract(relative_path: &str, parsed: &ParsedFile, limits: &DataflowLimits) -> Option<DataFlowGraph> {
    if parsed.source.len() as u64 > limits.max_file_bytes {
        return None;
    }
    if parsed.source.lines().count() as u64 > limits.max_file_lines {
        return None;
    }

    let spans = function_spans(parsed);
    let sources = extract_sources(relative_path, &parsed.source, &spans);
    let sinks = extract_sinks(relative_path, parsed, &spans);
    let transforms = extract_transforms(relative_path, parsed, &spans);
    let flows = build_flows(&sources, &sinks, &transforms, relative_path);

    Some(DataFlowGraph { sources, sinks, transforms, flows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ast::{parse_source, SourceLang};

    #[test]
    fn destructured_query_reaches_raw_sql() {
        let src = r#"
export async function handler(req){
  const {name} = req.query;
  await db.$queryRawUnsafe("SELECT * FROM u WHERE n='" + name + "'");
}
"#;
        let parsed = parse_source(src, SourceLang::TypeScript).unwrap();
        let graph = extract("src/handler.ts", &parsed, &DataflowLimits::default()).unwrap();
        assert_eq!(graph.flows.len(), 1);
        let flow = &graph.flows[0];
        assert_eq!(flow.source.kind, SourceType::RequestQuery);
        assert_eq!(flow.sink.kind, SinkType::SqlQuery);
        assert!(!flow.is_validated);
        assert!(!flow.is_sanitized);
    }

    #[test]
    fn oversized_file_is_skipped() {
        let limits = DataflowLimits { max_file_bytes: 10, max_file_lines: 20_000 };
        let parsed = parse_source("const {name} = req.query;", SourceLang::TypeScript).unwrap();
        assert!(extract("src/big.ts", &parsed, &limits).is_none());
    }
}
