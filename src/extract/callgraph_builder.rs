//! Call graph builder: the four-pass construction from §4.8 — import
//! graph, function table, outgoing edges, reverse edges — assembled on top
//! of the `model::callgraph::CallGraph` arena.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::extract::ast::{call_sites, enclosing_function, function_spans, ParsedFile};
use crate::model::callgraph::{CallEdge, CallGraph, NodeId};

const BUILTIN_OBJECTS: &[&str] = &["console", "Math", "JSON", "Object", "Array", "Promise", "Number", "String"];

static NAMED_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"import\s*\{([^}]+)\}\s*from\s*['"]([^'"]+)['"]"#).unwrap());
static DEFAULT_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"import\s+(\w+)\s+from\s*['"]([^'"]+)['"]"#).unwrap());
static NAMESPACE_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"import\s*\*\s*as\s+(\w+)\s+from\s*['"]([^'"]+)['"]"#).unwrap());

struct NamedImport {
    local_name: String,
    original_name: String,
    module_file: Option<String>,
}

struct ImportTable {
    named: HashMap<String, NamedImport>,
    namespaces: HashMap<String, Option<String>>,
}

fn parse_imports(source: &str, current_file: &str, known_files: &HashSet<String>) -> ImportTable {
    let mut named = HashMap::new();
    for cap in NAMED_IMPORT.captures_iter(source) {
        let module_file = resolve_relative(current_file, &cap[2], known_files);
        for part in cap[1].split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (original, local) = match part.split_once(" as ") {
                Some((o, l)) => (o.trim(), l.trim()),
                None => (part, part),
            };
            named.insert(
                local.to_string(),
                NamedImport {
                    local_name: local.to_string(),
                    original_name: original.to_string(),
                    module_file: module_file.clone(),
                },
            );
        }
    }
    for cap in DEFAULT_IMPORT.captures_iter(source) {
        let module_file = resolve_relative(current_file, &cap[2], known_files);
        named.insert(
            cap[1].to_string(),
            NamedImport {
                local_name: cap[1].to_string(),
                original_name: "default".to_string(),
                module_file,
            },
        );
    }
    let mut namespaces = HashMap::new();
    for cap in NAMESPACE_IMPORT.captures_iter(source) {
        let module_file = resolve_relative(current_file, &cap[2], known_files);
        namespaces.insert(cap[1].to_string(), module_file);
    }
    ImportTable { named, namespaces }
}

fn resolve_relative(current_file: &str, specifier: &str, known: &HashSet<String>) -> Option<String> {
    if !(specifier.starts_with("./") || specifier.starts_with("../")) {
        return None;
    }
    let dir_parts: Vec<&str> = current_file
        .rsplit_once('/')
        .map(|(dir, _)| dir)
        .unwrap_or("")
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    let mut stack: Vec<&str> = dir_parts;
    for part in specifier.split('/') {
        match part {
            "." | "" => {}
            ".." => {
                stack.pop();
            }
            p => stack.push(p),
        }
    }
    let base = stack.join("/");
    let candidates = [
        base.clone(),
        format!("{base}.ts"),
        format!("{base}.tsx"),
        format!("{base}.js"),
        format!("{base}.jsx"),
        format!("{base}/index.ts"),
        format!("{base}/index.js"),
    ];
    candidates.into_iter().find(|c| known.contains(c))
}

/// Assembles the full bidirectional call graph from a set of parsed files.
/// `files` must already be in the deterministic file-set-resolution order.
pub fn build(files: &[(String, ParsedFile)], max_nodes: usize) -> CallGraph {
    let known_files: HashSet<String> = files.iter().map(|(f, _)| f.clone()).collect();
    let import_tables: HashMap<&str, ImportTable> = files
        .iter()
        .map(|(file, parsed)| (file.as_str(), parse_imports(&parsed.source, file, &known_files)))
        .collect();

    let mut graph = CallGraph::new();
    let mut node_index: HashMap<(String, String), NodeId> = HashMap::new();

    for (file, parsed) in files {
        for span in function_spans(parsed) {
            if let Some(id) = graph.insert_node(file.clone(), span.name.clone(), span.start_line, max_nodes) {
                node_index.insert((file.clone(), span.name.clone()), id);
            }
        }
    }

    for (file, parsed) in files {
        let spans = function_spans(parsed);
        let calls = call_sites(parsed);
        let imports = &import_tables[file.as_str()];

        for call in &calls {
            let Some(caller_span) = enclosing_function(&spans, call.line) else {
                continue;
            };
            let Some(&from) = node_index.get(&(file.clone(), caller_span.name.clone())) else {
                continue;
            };

            let edge = match &call.object {
                None => imports.named.get(&call.callee).map(|imp| CallEdge {
                    target_function: imp.original_name.clone(),
                    target_file: imp.module_file.clone(),
                    original_name: if imp.original_name != imp.local_name {
                        Some(imp.original_name.clone())
                    } else {
                        None
                    },
                    line: call.line,
                }).or_else(|| {
                    Some(CallEdge {
                        target_function: call.callee.clone(),
                        target_file: None,
                        original_name: None,
                        line: call.line,
                    })
                }),
                Some(object) => {
                    if BUILTIN_OBJECTS.contains(&object.as_str()) {
                        None
                    } else if let Some(module_file) = imports.namespaces.get(object) {
                        Some(CallEdge {
                            target_function: call.callee.clone(),
                            target_file: module_file.clone(),
                            original_name: None,
                            line: call.line,
                        })
                    } else {
                        Some(CallEdge {
                            target_function: call.callee.clone(),
                            target_file: None,
                            original_name: None,
                            line: call.line,
                        })
                    }
                }
            };

            if let Some(edge) = edge {
                graph.add_edge(from, edge);
            }
        }
    }

    graph.fill_reverse_edges();
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ast::{parse_source, SourceLang};

    #[test]
    fn resolves_named_import_across_files() {
        let route_src = r#"
import { fetch } from './services/user';
export async function routeHandler(req){
  await requireAuth(req);
  return fetch(req.params.id);
}
"#;
        let service_src = r#"
export async function fetch(id){ return find(id); }
"#;
        let files = vec![
            ("src/routes/user.ts".to_string(), parse_source(route_src, SourceLang::TypeScript).unwrap()),
            ("src/services/user.ts".to_string(), parse_source(service_src, SourceLang::TypeScript).unwrap()),
        ];
        let graph = build(&files, 500_000);

        let route_node = &graph.nodes[graph.nodes_by_name("routeHandler")[0] as usize];
        let fetch_edge = route_node
            .edges
            .iter()
            .find(|e| e.target_function == "fetch")
            .expect("edge to fetch");
        assert_eq!(fetch_edge.target_file.as_deref(), Some("src/services/user.ts"));

        let fetch_node = &graph.nodes[graph.nodes_by_name("fetch")[0] as usize];
        assert_eq!(fetch_node.called_by.len(), 1);
        assert_eq!(fetch_node.called_by[0].function_name, "routeHandler");
    }

    #[test]
    fn unresolved_identifier_call_has_no_target_file() {
        let src = "export function f(){ helperNotImported(); }";
        let files = vec![("src/a.ts".to_string(), parse_source(src, SourceLang::TypeScript).unwrap())];
        let graph = build(&files, 500_000);
        let node = &graph.nodes[graph.nodes_by_name("f")[0] as usize];
        assert_eq!(node.edges[0].target_function, "helperNotImported");
        assert!(node.edges[0].target_file.is_none());
    }
}
