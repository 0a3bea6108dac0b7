//! Service layer extractor: files under a `services/` convention (or a
//! user-supplied `servicePatterns` override) contribute one `Service`
//! record per exported function, naming what it exports and any directive
//! pragmas (`'use server'`, `'use client'`) at the top of the file.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::extract::ast::{function_spans, parse_source, ParsedFile};
use crate::model::records::Service;

static DIRECTIVE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^['"]use [a-z]+['"];?\s*$"#).unwrap());

fn is_service_path(relative_path: &str, extra_patterns: &[glob::Pattern]) -> bool {
    relative_path.contains("/services/")
        || relative_path.contains("/service/")
        || relative_path.ends_with(".service.ts")
        || relative_path.ends_with(".service.js")
        || extra_patterns.iter().any(|p| p.matches(relative_path))
}

fn file_directives(source: &str) -> Vec<String> {
    source
        .lines()
        .take(5)
        .map(str::trim)
        .filter(|line| DIRECTIVE.is_match(line))
        .map(|line| line.trim_matches(|c| c == '\'' || c == '"' || c == ';').to_string())
        .collect()
}

pub fn extract(relative_path: &str, extra_patterns: &[glob::Pattern], parsed: &ParsedFile) -> Vec<Service> {
    if !is_service_path(relative_path, extra_patterns) {
        return Vec::new();
    }
    let directives = file_directives(&parsed.source);
    function_spans(parsed)
        .into_iter()
        .filter(|f| f.exported)
        .map(|f| Service {
            file: relative_path.to_string(),
            line: f.start_line,
            name: f.name.clone(),
            exports: vec![f.name],
            directives: directives.clone(),
        })
        .collect()
}

/// Convenience wrapper used by the pipeline driver: parses once and
/// extracts in the same call.
pub fn extract_from_source(
    relative_path: &str,
    source: &str,
    lang: crate::extract::ast::SourceLang,
    extra_patterns: &[glob::Pattern],
) -> Vec<Service> {
    match parse_source(source, lang) {
        Some(parsed) => extract(relative_path, extra_patterns, &parsed),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ast::SourceLang;

    #[test]
    fn emits_one_service_per_exported_function() {
        let src = "'use server';\nexport async function createUser(input){ return db.user.create(input); }\nfunction helper(){}\n";
        let services = extract_from_source("src/services/user.ts", src, SourceLang::TypeScript, &[]);
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].name, "createUser");
        assert_eq!(services[0].directives, vec!["use server".to_string()]);
    }

    #[test]
    fn non_service_path_yields_nothing() {
        let src = "export function createUser(){}";
        let services = extract_from_source("src/routes/user.ts", src, SourceLang::TypeScript, &[]);
        assert!(services.is_empty());
    }
}
