//! Transaction-scope extractor: identifies `$transaction`/`withTransaction`
//! blocks and classifies each call inside them as a side effect or an
//! ORM/SQL operation the transaction itself is responsible for.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::extract::ast::{call_sites, ParsedFile};
use crate::model::records::{SideEffect, SideEffectType, TransactionScope};

const TRANSACTION_CALLEES: &[&str] = &[
    "$transaction",
    "transaction",
    "beginTransaction",
    "startTransaction",
    "withTransaction",
    "runTransaction",
    "transacting",
    "tx",
];

/// §9 open question 2: ORM-type detection stays fail-closed — an ambiguous
/// call is treated as *not* a side effect rather than guessed at.
static SAFE_ORM_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(tx|db|prisma|client)\.\w+\.(create|createMany|update|updateMany|upsert|delete|deleteMany|connect|findUnique|findMany|findFirst)\b").unwrap());
static RAW_SQL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(select|insert|update|delete)\s").unwrap());

struct SideEffectRule {
    regex: Regex,
    kind: SideEffectType,
}

static SIDE_EFFECT_RULES: Lazy<Vec<SideEffectRule>> = Lazy::new(|| {
    vec![
        SideEffectRule {
            regex: Regex::new(r"(?i)(send\w*(email|mail)\b|mailer\.|resend\.|sendgrid\.|ses\.send)").unwrap(),
            kind: SideEffectType::Email,
        },
        SideEffectRule {
            regex: Regex::new(r"(?i)(sendWebhook|webhook\.(send|trigger)|dispatchWebhook)").unwrap(),
            kind: SideEffectType::Webhook,
        },
        SideEffectRule {
            regex: Regex::new(r"(?i)(analytics\.track|posthog\.capture|mixpanel\.track|segment\.track)").unwrap(),
            kind: SideEffectType::Analytics,
        },
        SideEffectRule {
            regex: Regex::new(r"(?i)(queue\.add|enqueue|publish\w*\()").unwrap(),
            kind: SideEffectType::Queue,
        },
        SideEffectRule {
            regex: Regex::new(r"(?i)(fetch\(|axios\.|http\.(get|post|request))").unwrap(),
            kind: SideEffectType::ExternalApi,
        },
    ]
});

static IDENTIFIER_CALL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([a-zA-Z_$][\w$]*)\s*\(").unwrap());
const BUILTIN_CALLEES: &[&str] = &[
    "if", "for", "while", "switch", "catch", "function", "async", "await",
];

fn classify_call(text: &str) -> Option<SideEffectType> {
    if SAFE_ORM_CALL.is_match(text) || RAW_SQL.is_match(text) {
        return None;
    }
    SIDE_EFFECT_RULES
        .iter()
        .find(|r| r.regex.is_match(text))
        .map(|r| r.kind)
}

fn block_function_calls(block_text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    IDENTIFIER_CALL
        .captures_iter(block_text)
        .map(|c| c[1].to_string())
        .filter(|name| !BUILTIN_CALLEES.contains(&name.as_str()))
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

pub fn extract(relative_path: &str, parsed: &ParsedFile) -> Vec<TransactionScope> {
    let all_calls = call_sites(parsed);
    let mut out = Vec::new();

    for call in &all_calls {
        if !TRANSACTION_CALLEES.contains(&call.callee.as_str()) {
            continue;
        }

        let block_text = call
            .arguments
            .iter()
            .find(|a| a.contains("=>") || a.trim_start().starts_with("function") || a.trim_start().starts_with("async"))
            .cloned()
            .unwrap_or_else(|| call.text.clone());

        let start_line = call.line;
        let end_line = start_line + block_text.matches('\n').count() as u32;

        let mut side_effects = Vec::new();
        for inner in &all_calls {
            if inner.line <= start_line || inner.line > end_line {
                continue;
            }
            let full_call_text: String = match &inner.object {
                Some(obj) => format!("{obj}.{}(", inner.callee),
                None => format!("{}(", inner.callee),
            };
            if let Some(kind) = classify_call(&full_call_text) {
                side_effects.push(SideEffect {
                    kind,
                    file: relative_path.to_string(),
                    line: inner.line,
                    description: full_call_text.trim_end_matches('(').to_string(),
                });
            }
        }

        out.push(TransactionScope {
            file: relative_path.to_string(),
            line: start_line,
            end_line,
            function_name: None,
            contains_side_effects: !side_effects.is_empty(),
            side_effects,
            function_calls: Some(block_function_calls(&block_text)),
        });
    }

    out.sort_by_key(|t| t.line);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ast::{parse_source, SourceLang};

    #[test]
    fn email_side_effect_is_recorded_and_orm_create_is_not() {
        let src = r#"
await prisma.$transaction(async tx => {
  await tx.order.create({data:{}});
  await sendOrderEmail(user.id);
});
"#;
        let parsed = parse_source(src, SourceLang::TypeScript).unwrap();
        let scopes = extract("src/orders.ts", &parsed);
        assert_eq!(scopes.len(), 1);
        let scope = &scopes[0];
        assert!(scope.contains_side_effects);
        assert_eq!(scope.side_effects.len(), 1);
        assert_eq!(scope.side_effects[0].kind, SideEffectType::Email);
        assert!(!scope
            .side_effects
            .iter()
            .any(|s| s.description.contains("order.create")));
    }

    #[test]
    fn pure_orm_transaction_has_no_side_effects() {
        let src = r#"
await prisma.$transaction(async tx => {
  await tx.order.create({data:{}});
  await tx.inventory.updateMany({data:{}});
});
"#;
        let parsed = parse_source(src, SourceLang::TypeScript).unwrap();
        let scopes = extract("src/orders.ts", &parsed);
        assert_eq!(scopes.len(), 1);
        assert!(!scopes[0].contains_side_effects);
    }
}
