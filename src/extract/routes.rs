//! Route extractor: HTTP entry points across the Express/Koa/Fastify/Hono
//! chain-call family, Next.js (App Router and Pages API), Nuxt, SvelteKit,
//! and NestJS's decorator style. Framework is inferred from path and
//! textual markers, most specific first.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::extract::ast::{call_sites, function_spans, CallSite, FunctionSpan, ParsedFile};
use crate::model::records::{HttpMethod, Route};
use crate::patterns::strip_comments;

static AUTH_CATALOG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(requireAuth|isAuthenticated|getServerSession|withAuth|authMiddleware|checkAuth|ensureAuth|auth:\s*true|preHandler:\s*\[?\s*auth|onRequest:\s*\[?\s*auth)").unwrap()
});

static SERVICE_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"import\s*\{([^}]+)\}\s*from\s*['"]([^'"]*service[s]?[^'"]*)['"]"#).unwrap()
});

fn http_method_from_str(s: &str) -> Option<HttpMethod> {
    match s.to_uppercase().as_str() {
        "GET" => Some(HttpMethod::Get),
        "POST" => Some(HttpMethod::Post),
        "PUT" => Some(HttpMethod::Put),
        "DELETE" => Some(HttpMethod::Delete),
        "PATCH" => Some(HttpMethod::Patch),
        "ALL" => Some(HttpMethod::All),
        "OPTIONS" => Some(HttpMethod::Options),
        "HEAD" => Some(HttpMethod::Head),
        _ => None,
    }
}

fn service_call_names(source: &str) -> Vec<String> {
    let mut names = Vec::new();
    for cap in SERVICE_IMPORT.captures_iter(source) {
        for name in cap[1].split(',') {
            let name = name.trim().split(" as ").last().unwrap_or(name.trim()).trim();
            if !name.is_empty() {
                names.push(name.to_string());
            }
        }
    }
    names
}

fn collect_service_calls(calls: &[CallSite], service_names: &[String], start: u32, end: u32) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    calls
        .iter()
        .filter(|c| c.line >= start && c.line <= end)
        .filter(|c| service_names.iter().any(|s| s == &c.callee || c.object.as_deref() == Some(s.as_str())))
        .map(|c| c.callee.clone())
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

const CHAIN_ROUTER_OBJECTS: &[&str] = &["router", "app", "fastify", "server"];
const CHAIN_VERBS: &[&str] = &["get", "post", "put", "delete", "patch", "all", "options", "head"];

fn express_style(relative_path: &str, parsed: &ParsedFile, calls: &[CallSite], service_names: &[String]) -> Vec<Route> {
    let mut out = Vec::new();
    for call in calls {
        let Some(object) = &call.object else { continue };
        if !CHAIN_ROUTER_OBJECTS.iter().any(|o| object == o) {
            continue;
        }
        if !CHAIN_VERBS.contains(&call.callee.to_lowercase().as_str()) {
            continue;
        }
        let Some(method) = http_method_from_str(&call.callee) else { continue };
        let path = call.arguments.first().map(|a| a.trim_matches(|c| c == '\'' || c == '"' || c == '`').to_string());
        let has_auth = call.arguments.iter().any(|a| AUTH_CATALOG.is_match(a));

        out.push(Route {
            file: relative_path.to_string(),
            line: call.line,
            method,
            path,
            handler_name: call.arguments.last().map(|a| a.trim().to_string()),
            has_auth_middleware: has_auth,
            auth_middleware: None,
            service_calls: collect_service_calls(calls, service_names, call.line, call.line + 5),
            framework: "express".to_string(),
        });
    }
    let _ = parsed;
    out
}

static NEXT_APP_EXPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^export\s+async\s+function\s+(GET|POST|PUT|DELETE|PATCH|OPTIONS|HEAD)\s*\(").unwrap()
});

fn nextjs_app_router(relative_path: &str, source: &str, service_names: &[String], calls: &[CallSite]) -> Vec<Route> {
    if !relative_path.contains("/app/") || !relative_path.ends_with("route.ts") && !relative_path.ends_with("route.js") {
        return Vec::new();
    }
    let mut out = Vec::new();
    for cap in NEXT_APP_EXPORT.captures_iter(source) {
        let Some(method) = http_method_from_str(&cap[1]) else { continue };
        let line = source[..cap.get(0).unwrap().start()].lines().count() as u32 + 1;
        out.push(Route {
            file: relative_path.to_string(),
            line,
            method,
            path: None,
            handler_name: Some(cap[1].to_string()),
            has_auth_middleware: AUTH_CATALOG.is_match(source),
            auth_middleware: None,
            service_calls: collect_service_calls(calls, service_names, line, line + 200),
            framework: "nextjs-app".to_string(),
        });
    }
    out
}

fn nextjs_pages_api(relative_path: &str, spans: &[FunctionSpan], service_names: &[String], calls: &[CallSite]) -> Vec<Route> {
    if !relative_path.contains("/pages/api/") {
        return Vec::new();
    }
    spans
        .iter()
        .filter(|s| s.exported && (s.name == "default" || s.name == "handler"))
        .map(|s| Route {
            file: relative_path.to_string(),
            line: s.start_line,
            method: HttpMethod::All,
            path: None,
            handler_name: Some(s.name.clone()),
            has_auth_middleware: AUTH_CATALOG.is_match(&s.text),
            auth_middleware: None,
            service_calls: collect_service_calls(calls, service_names, s.start_line, s.end_line),
            framework: "nextjs-pages".to_string(),
        })
        .collect()
}

static NUXT_EVENT_HANDLER: Lazy<Regex> = Lazy::new(|| Regex::new(r"defineEventHandler\s*\(").unwrap());

fn nuxt(relative_path: &str, source: &str, service_names: &[String], calls: &[CallSite]) -> Vec<Route> {
    if !relative_path.contains("/server/") {
        return Vec::new();
    }
    NUXT_EVENT_HANDLER
        .find_iter(source)
        .map(|m| {
            let line = source[..m.start()].lines().count() as u32 + 1;
            Route {
                file: relative_path.to_string(),
                line,
                method: HttpMethod::All,
                path: None,
                handler_name: None,
                has_auth_middleware: AUTH_CATALOG.is_match(source),
                auth_middleware: None,
                service_calls: collect_service_calls(calls, service_names, line, line + 200),
                framework: "nuxt".to_string(),
            }
        })
        .collect()
}

static SVELTEKIT_EXPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^export\s+const\s+(GET|POST|PUT|DELETE|PATCH)\s*(?::\s*RequestHandler)?\s*=").unwrap()
});

fn sveltekit(relative_path: &str, source: &str, service_names: &[String], calls: &[CallSite]) -> Vec<Route> {
    if !relative_path.ends_with("+server.ts") && !relative_path.ends_with("+server.js") {
        return Vec::new();
    }
    SVELTEKIT_EXPORT
        .captures_iter(source)
        .filter_map(|cap| {
            let method = http_method_from_str(&cap[1])?;
            let line = source[..cap.get(0).unwrap().start()].lines().count() as u32 + 1;
            Some(Route {
                file: relative_path.to_string(),
                line,
                method,
                path: None,
                handler_name: Some(cap[1].to_string()),
                has_auth_middleware: AUTH_CATALOG.is_match(source),
                auth_middleware: None,
                service_calls: collect_service_calls(calls, service_names, line, line + 200),
                framework: "sveltekit".to_string(),
            })
        })
        .collect()
}

static NEST_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)((?:@\w+\([^\n]*\)\s*\n\s*)*)@Controller\(['\"]?([^'\")]*)['\"]?\)\s*\n?\s*(?:export\s+)?class\s+(\w+)").unwrap());
static NEST_METHOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"((?:@\w+\([^\n]*\)\s*\n\s*)*)@(Get|Post|Put|Delete|Patch|All)\(['\"]?([^'\")]*)['\"]?\)\s*\n?\s*(?:async\s+)?(\w+)\s*\(").unwrap()
});
static GUARD_DECORATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"@(UseGuards|Roles|Auth)\(").unwrap());

fn nestjs(relative_path: &str, source: &str, service_names: &[String], calls: &[CallSite]) -> Vec<Route> {
    if !source.contains("@Controller") {
        return Vec::new();
    }
    let mut class_positions: Vec<(usize, String, bool)> = NEST_CLASS
        .captures_iter(source)
        .map(|c| {
            let start = c.get(0).unwrap().start();
            let class_prefix = c[2].to_string();
            let has_guard = GUARD_DECORATOR.is_match(&c[1]);
            (start, class_prefix, has_guard)
        })
        .collect();
    class_positions.sort_by_key(|(pos, _, _)| *pos);

    let mut out = Vec::new();
    for cap in NEST_METHOD.captures_iter(source) {
        let Some(method) = http_method_from_str(&cap[2]) else { continue };
        let match_start = cap.get(0).unwrap().start();
        let (class_prefix, class_guarded) = class_positions
            .iter()
            .rev()
            .find(|(pos, _, _)| *pos < match_start)
            .map(|(_, prefix, guard)| (prefix.clone(), *guard))
            .unwrap_or_default();
        let method_guarded = GUARD_DECORATOR.is_match(&cap[1]);
        let line = source[..match_start].lines().count() as u32 + 1;
        let path = if class_prefix.is_empty() {
            cap[3].to_string()
        } else {
            format!("{}/{}", class_prefix.trim_end_matches('/'), cap[3].trim_start_matches('/'))
        };
        out.push(Route {
            file: relative_path.to_string(),
            line,
            method,
            path: Some(path),
            handler_name: Some(cap[4].to_string()),
            has_auth_middleware: class_guarded || method_guarded,
            auth_middleware: None,
            service_calls: collect_service_calls(calls, service_names, line, line + 30),
            framework: "nestjs".to_string(),
        });
    }
    out
}

pub fn extract(relative_path: &str, parsed: &ParsedFile) -> Vec<Route> {
    let stripped = strip_comments(&parsed.source);
    let spans = function_spans(parsed);
    let calls = call_sites(parsed);
    let service_names = service_call_names(&parsed.source);

    let mut out = nestjs(relative_path, &stripped, &service_names, &calls);
    if out.is_empty() {
        out = sveltekit(relative_path, &stripped, &service_names, &calls);
    }
    if out.is_empty() {
        out = nextjs_app_router(relative_path, &stripped, &service_names, &calls);
    }
    if out.is_empty() {
        out = nextjs_pages_api(relative_path, &spans, &service_names, &calls);
    }
    if out.is_empty() {
        out = nuxt(relative_path, &stripped, &service_names, &calls);
    }
    if out.is_empty() {
        out = express_style(relative_path, parsed, &calls, &service_names);
    }

    out.sort_by_key(|r| r.line);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ast::{parse_source, SourceLang};

    #[test]
    fn express_route_with_auth_middleware() {
        let src = "router.get('/users/:id', requireAuth, getUserHandler);";
        let parsed = parse_source(src, SourceLang::Javascript).unwrap();
        let routes = extract("src/routes/users.js", &parsed);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].method, HttpMethod::Get);
        assert!(routes[0].has_auth_middleware);
    }

    #[test]
    fn nextjs_app_router_get_handler() {
        let src = "export async function GET(request) { return Response.json({}); }";
        let parsed = parse_source(src, SourceLang::TypeScript).unwrap();
        let routes = extract("src/app/api/users/route.ts", &parsed);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].method, HttpMethod::Get);
        assert_eq!(routes[0].framework, "nextjs-app");
    }

    #[test]
    fn nestjs_class_guard_covers_method_without_its_own_decorator() {
        let src = r#"
@UseGuards(JwtAuthGuard)
@Controller('teams')
export class TeamsController {
  @Get(':id')
  async getTeam(id: string) {}
}
"#;
        let parsed = parse_source(src, SourceLang::TypeScript).unwrap();
        let routes = extract("src/teams/teams.controller.ts", &parsed);
        assert_eq!(routes.len(), 1);
        assert!(routes[0].has_auth_middleware);
        assert_eq!(routes[0].path.as_deref(), Some("teams/:id"));
    }
}
