//! Shared tree-sitter plumbing: every extractor reads from the same parsed
//! tree and the same function/call enumeration, rather than re-walking the
//! syntax tree per extractor. Grounded on the teacher's
//! `trace::extract::treesitter` query tables, narrowed to the TypeScript and
//! JavaScript grammars this spec's extractors actually need.

use std::path::Path;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Parser, Query, QueryCursor, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLang {
    TypeScript,
    Javascript,
}

/// Picks the grammar from the file extension. Returns `None` for anything
/// outside this spec's JS/TS-only scope.
pub fn detect_language(path: &Path) -> Option<SourceLang> {
    match path.extension().and_then(|e| e.to_str())?.to_lowercase().as_str() {
        "ts" | "tsx" | "mts" | "cts" => Some(SourceLang::TypeScript),
        "js" | "jsx" | "mjs" | "cjs" => Some(SourceLang::Javascript),
        _ => None,
    }
}

fn ts_language(lang: SourceLang) -> Language {
    match lang {
        SourceLang::TypeScript => tree_sitter_typescript::LANGUAGE_TSX.into(),
        SourceLang::Javascript => tree_sitter_javascript::LANGUAGE.into(),
    }
}

/// A parsed file, owning both the tree and the text it was parsed from —
/// the tree borrows byte offsets into `source`, so the two travel together.
pub struct ParsedFile {
    pub tree: Tree,
    pub source: String,
    pub lang: SourceLang,
}

pub fn parse_source(source: &str, lang: SourceLang) -> Option<ParsedFile> {
    let mut parser = Parser::new();
    parser.set_language(&ts_language(lang)).ok()?;
    let tree = parser.parse(source, None)?;
    Some(ParsedFile {
        tree,
        source: source.to_string(),
        lang,
    })
}

/// A named function-shaped definition: function declaration, method
/// definition, or an arrow/function expression assigned to a named
/// variable or property (per §4.8 pass 2's naming rule).
#[derive(Debug, Clone)]
pub struct FunctionSpan {
    pub name: String,
    pub start_line: u32,
    pub end_line: u32,
    pub start_byte: usize,
    pub end_byte: usize,
    pub exported: bool,
    pub text: String,
}

const FUNCTION_QUERY: &str = r#"
(function_declaration name: (identifier) @name) @function
(export_statement declaration: (function_declaration name: (identifier) @name)) @exported_function
(variable_declarator name: (identifier) @name value: (arrow_function)) @arrow_function
(variable_declarator name: (identifier) @name value: (function_expression)) @arrow_function
(method_definition name: (property_identifier) @name) @method
(pair key: (property_identifier) @name value: (arrow_function)) @arrow_function
(pair key: (property_identifier) @name value: (function_expression)) @arrow_function
"#;

pub fn function_spans(parsed: &ParsedFile) -> Vec<FunctionSpan> {
    let lang = ts_language(parsed.lang);
    let Ok(query) = Query::new(&lang, FUNCTION_QUERY) else {
        return Vec::new();
    };
    let source = parsed.source.as_bytes();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&query, parsed.tree.root_node(), source);

    let mut out = Vec::new();
    while let Some(m) = matches.next() {
        let mut name = None;
        let mut span_node = None;
        let mut exported = false;
        for capture in m.captures {
            let capture_name = query.capture_names()[capture.index as usize];
            match capture_name {
                "name" => {
                    name = capture.node.utf8_text(source).ok().map(str::to_string);
                }
                "exported_function" => {
                    exported = true;
                    span_node = Some(capture.node);
                }
                "function" | "arrow_function" | "method" => {
                    span_node = Some(capture.node);
                }
                _ => {}
            }
        }
        let (Some(name), Some(node)) = (name, span_node) else {
            continue;
        };
        // An arrow/function expression's enclosing `export const` still
        // counts as exported even though it's not captured by the
        // `export_statement` branch above.
        let exported = exported || has_export_ancestor(node);
        out.push(FunctionSpan {
            name,
            start_line: node.start_position().row as u32 + 1,
            end_line: node.end_position().row as u32 + 1,
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            exported,
            text: node.utf8_text(source).unwrap_or("").to_string(),
        });
    }
    out.sort_by_key(|f| f.start_line);
    out
}

fn has_export_ancestor(node: tree_sitter::Node) -> bool {
    let mut current = node.parent();
    while let Some(n) = current {
        if n.kind() == "export_statement" {
            return true;
        }
        current = n.parent();
    }
    false
}

/// A call expression: `callee(...)` or `object.callee(...)`.
#[derive(Debug, Clone)]
pub struct CallSite {
    pub callee: String,
    pub object: Option<String>,
    pub line: u32,
    pub text: String,
    pub arguments: Vec<String>,
}

const CALL_QUERY: &str = r#"
(call_expression function: (identifier) @callee) @call
(call_expression function: (member_expression object: (_) @object property: (property_identifier) @callee)) @call
"#;

pub fn call_sites(parsed: &ParsedFile) -> Vec<CallSite> {
    let lang = ts_language(parsed.lang);
    let Ok(query) = Query::new(&lang, CALL_QUERY) else {
        return Vec::new();
    };
    let source = parsed.source.as_bytes();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&query, parsed.tree.root_node(), source);

    let mut out = Vec::new();
    while let Some(m) = matches.next() {
        let mut callee = None;
        let mut object = None;
        let mut call_node = None;
        for capture in m.captures {
            let capture_name = query.capture_names()[capture.index as usize];
            match capture_name {
                "callee" => callee = capture.node.utf8_text(source).ok().map(str::to_string),
                "object" => object = capture.node.utf8_text(source).ok().map(str::to_string),
                "call" => call_node = Some(capture.node),
                _ => {}
            }
        }
        let (Some(callee), Some(node)) = (callee, call_node) else {
            continue;
        };
        let arguments = node
            .child_by_field_name("arguments")
            .map(|args| {
                let mut cursor = args.walk();
                args.named_children(&mut cursor)
                    .filter_map(|c| c.utf8_text(source).ok().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        out.push(CallSite {
            callee,
            object,
            line: node.start_position().row as u32 + 1,
            text: node.utf8_text(source).unwrap_or("").to_string(),
            arguments,
        });
    }
    out.sort_by_key(|c| c.line);
    out
}

/// The innermost function span containing `line`, if any — used to compute
/// `functionContext`/`callerFunction` fields across every extractor.
pub fn enclosing_function(spans: &[FunctionSpan], line: u32) -> Option<&FunctionSpan> {
    spans
        .iter()
        .filter(|f| f.start_line <= line && line <= f.end_line)
        .min_by_key(|f| f.end_line - f.start_line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_named_function_declaration() {
        let src = "export async function handleStripeWebhook(req) { return 1; }";
        let parsed = parse_source(src, SourceLang::TypeScript).unwrap();
        let spans = function_spans(&parsed);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].name, "handleStripeWebhook");
        assert!(spans[0].exported);
    }

    #[test]
    fn finds_named_arrow_function() {
        let src = "export const removeTeamMember = async (userId, teamId) => { return db.teamMember.delete({}); };";
        let parsed = parse_source(src, SourceLang::TypeScript).unwrap();
        let spans = function_spans(&parsed);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].name, "removeTeamMember");
    }

    #[test]
    fn finds_call_sites_with_method_object() {
        let src = "async function f(){ await db.teamMember.delete({where:{}}); }";
        let parsed = parse_source(src, SourceLang::TypeScript).unwrap();
        let calls = call_sites(&parsed);
        assert!(calls.iter().any(|c| c.callee == "delete"));
    }

    #[test]
    fn enclosing_function_picks_innermost_span() {
        let src = "function outer(){ function inner(){ return 1; } return inner(); }";
        let parsed = parse_source(src, SourceLang::TypeScript).unwrap();
        let spans = function_spans(&parsed);
        let inner_line = spans.iter().find(|s| s.name == "inner").unwrap().start_line;
        let found = enclosing_function(&spans, inner_line).unwrap();
        assert_eq!(found.name, "inner");
    }
}
