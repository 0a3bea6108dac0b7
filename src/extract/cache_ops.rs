//! Cache-operation extractor: get/set/delete calls against a cache layer
//! (Redis, an in-process LRU, etc). Checked in priority order
//! delete -> set -> get, since a delete call's text can otherwise also
//! satisfy a looser get/set pattern.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::extract::ast::{call_sites, enclosing_function, function_spans, ParsedFile};
use crate::model::records::{CacheOperation, CacheOpType};

static DEFAULT_DELETE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(del|delete|invalidate|expire|flush)$").unwrap());
static DEFAULT_SET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(set|setex|put|write)$").unwrap());
static DEFAULT_GET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(get|fetch|read)$").unwrap());
static AUTH_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(session|token|auth|permission|role)").unwrap());

const CACHE_OBJECTS: &[&str] = &["cache", "redis", "kv", "store"];

fn matches_any(default: &Regex, extra: &[String], callee: &str) -> bool {
    default.is_match(callee) || extra.iter().any(|p| p == callee)
}

fn classify(callee: &str, cfg: &crate::core::config::CachePatterns) -> Option<CacheOpType> {
    if matches_any(&DEFAULT_DELETE, &cfg.delete, callee) {
        Some(CacheOpType::Delete)
    } else if matches_any(&DEFAULT_SET, &cfg.set, callee) {
        Some(CacheOpType::Set)
    } else if matches_any(&DEFAULT_GET, &cfg.get, callee) {
        Some(CacheOpType::Get)
    } else {
        None
    }
}

pub fn extract(
    relative_path: &str,
    parsed: &ParsedFile,
    cfg: &crate::core::config::CachePatterns,
) -> Vec<CacheOperation> {
    let spans = function_spans(parsed);
    let mut out = Vec::new();

    for call in call_sites(parsed) {
        let is_cache_object = call
            .object
            .as_deref()
            .map(|o| CACHE_OBJECTS.iter().any(|c| o.eq_ignore_ascii_case(c)))
            .unwrap_or(false);
        if !is_cache_object {
            continue;
        }
        let Some(kind) = classify(&call.callee, cfg) else {
            continue;
        };

        let caller_function = enclosing_function(&spans, call.line).map(|f| f.name.clone());
        let key = call.arguments.first().map(|raw| {
            let trimmed: String = raw.trim_matches(|c| c == '\'' || c == '"' || c == '`').to_string();
            let truncated: String = trimmed.chars().take(50).collect();
            let is_auth_key = AUTH_KEY.is_match(&truncated)
                || caller_function
                    .as_deref()
                    .map(|c| AUTH_KEY.is_match(c))
                    .unwrap_or(false);
            if is_auth_key {
                format!("[auth] {truncated}")
            } else {
                truncated
            }
        });

        out.push(CacheOperation {
            file: relative_path.to_string(),
            line: call.line,
            kind,
            key,
            caller_function,
        });
    }

    out.sort_by_key(|c| c.line);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::CachePatterns;
    use crate::extract::ast::{parse_source, SourceLang};

    #[test]
    fn delete_wins_over_looser_patterns() {
        let src = "async function f(){ await cache.del('session:123'); }";
        let parsed = parse_source(src, SourceLang::TypeScript).unwrap();
        let ops = extract("src/x.ts", &parsed, &CachePatterns::default());
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].kind, CacheOpType::Delete);
        assert_eq!(ops[0].key.as_deref(), Some("[auth] session:123"));
    }

    #[test]
    fn get_is_recorded_with_truncated_key() {
        let src = "async function f(){ await redis.get('user:42'); }";
        let parsed = parse_source(src, SourceLang::TypeScript).unwrap();
        let ops = extract("src/x.ts", &parsed, &CachePatterns::default());
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].kind, CacheOpType::Get);
    }

    #[test]
    fn non_cache_object_is_ignored() {
        let src = "async function f(){ await db.get('x'); }";
        let parsed = parse_source(src, SourceLang::TypeScript).unwrap();
        let ops = extract("src/x.ts", &parsed, &CachePatterns::default());
        assert!(ops.is_empty());
    }
}
