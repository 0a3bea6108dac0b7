//! Authorization-call extractor: call sites that gate access, whether
//! invoked directly, mounted as middleware, or attached as a decorator.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::extract::ast::{call_sites, enclosing_function, function_spans, ParsedFile};
use crate::model::records::AuthzCall;

/// Canonical auth predicate names recognized regardless of configuration.
const CANONICAL_AUTH_FNS: &[&str] = &[
    "authorize",
    "requireAuth",
    "checkPermission",
    "hasPermission",
    "isAuthorized",
    "assertAuth",
    "guardAccess",
    "requirePermission",
    "can",
    "ability",
];

/// Framework-specific accessors/constructors that also count as auth calls:
/// session/user accessors and protected-procedure constructors.
const FRAMEWORK_AUTH_FNS: &[&str] = &[
    "getServerSession",
    "getSession",
    "currentUser",
    "protectedProcedure",
    "auth",
];

static DECORATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@(UseGuards|Roles|Auth)\s*\(([^)]*)\)").unwrap());

fn is_auth_callee(name: &str, allowlist: &[String]) -> bool {
    CANONICAL_AUTH_FNS.contains(&name)
        || FRAMEWORK_AUTH_FNS.contains(&name)
        || allowlist.iter().any(|a| a == name)
}

pub fn extract(relative_path: &str, parsed: &ParsedFile, extra_authz_functions: &[String]) -> Vec<AuthzCall> {
    let spans = function_spans(parsed);
    let mut out = Vec::new();

    for call in call_sites(parsed) {
        if !is_auth_callee(&call.callee, extra_authz_functions) {
            continue;
        }
        let caller_function = enclosing_function(&spans, call.line).map(|f| f.name.clone());
        out.push(AuthzCall {
            file: relative_path.to_string(),
            line: call.line,
            function_name: call.callee,
            caller_function,
            arguments: call.arguments,
        });
    }

    for capture in DECORATOR.captures_iter(&parsed.source) {
        let full_match = capture.get(0).unwrap();
        let line = parsed.source[..full_match.start()].lines().count() as u32 + 1;
        let name = format!("@{}", &capture[1]);
        let caller_function = enclosing_function(&spans, line).map(|f| f.name.clone());
        let arguments: Vec<String> = capture[2]
            .split(',')
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        out.push(AuthzCall {
            file: relative_path.to_string(),
            line,
            function_name: name,
            caller_function,
            arguments,
        });
    }

    out.sort_by_key(|a| a.line);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ast::{parse_source, SourceLang};

    #[test]
    fn canonical_predicate_is_recognized() {
        let src = "async function routeHandler(req){ requireAuth(req.user); return 1; }";
        let parsed = parse_source(src, SourceLang::TypeScript).unwrap();
        let calls = extract("src/routes/x.ts", &parsed, &[]);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function_name, "requireAuth");
        assert_eq!(calls[0].caller_function.as_deref(), Some("routeHandler"));
    }

    #[test]
    fn decorator_form_is_attached_to_decorated_method() {
        let src = "class C { @UseGuards(AuthGuard) method(){} }";
        let parsed = parse_source(src, SourceLang::TypeScript).unwrap();
        let calls = extract("src/x.ts", &parsed, &[]);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function_name, "@UseGuards");
    }

    #[test]
    fn user_configured_allowlist_extends_canonical_set() {
        let src = "function f(){ myCustomGuard(); }";
        let parsed = parse_source(src, SourceLang::TypeScript).unwrap();
        let calls = extract("src/x.ts", &parsed, &["myCustomGuard".to_string()]);
        assert_eq!(calls.len(), 1);
    }
}
