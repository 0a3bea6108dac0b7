//! Webhook-receiver extractor: distinguishes a handler that *receives* an
//! external event from the CRUD endpoints that merely manage webhook
//! subscriptions, per provider.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::extract::ast::{function_spans, FunctionSpan, ParsedFile};
use crate::model::records::{
    EventTypeIdempotency, ExtractionMethod, PersistenceKind, PersistenceMarker, WebhookHandler,
};
use crate::patterns::strip_comments;

static NON_WEBHOOK_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(/hooks/|/__tests__/|\.test\.|\.spec\.|/client/|/design-system/|/components/)")
        .unwrap()
});

static MANAGEMENT_CATALOG: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)prisma\.webhook\.(create|update|delete|findMany|findUnique)").unwrap(),
        Regex::new(r"(?i)\.webhook\.create\(").unwrap(),
        Regex::new(r"(?i)\b(createWebhook|updateWebhook|deleteWebhook)\b").unwrap(),
        Regex::new(r"(?i)webhook\.findMany").unwrap(),
    ]
});

static RECEIVER_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(constructEvent|verifyWebhookSignature|x-hub-signature|x-slack-signature|svix|x-shopify-hmac|x-twilio-signature)")
        .unwrap()
});

static ROUTE_HINT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(/webhook/|/webhooks/|stripe/webhook)").unwrap());

static POSITIVE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(handle\w*webhook|process\w*webhook|on\w*webhook|POST|GET)$").unwrap()
});

static NEGATIVE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?xi)
        ^(create|update|delete|get|list|find)\w*webhook$
        | ^send|^trigger|^fire|^dispatch|^publish\w*webhook$
        | ^handle\w*(payment|subscription|checkout|invoice|customer)\w*$
        | ^(get|set|run|execute|call|invoke)$
        ",
    )
    .unwrap()
});

const HANDLER_PARAMS: &[&str] = &["req", "res", "ctx", "event", "request", "response", "context"];

struct ProviderRule {
    name: &'static str,
    detect: Regex,
}

static PROVIDER_RULES: Lazy<Vec<ProviderRule>> = Lazy::new(|| {
    vec![
        ProviderRule { name: "stripe", detect: Regex::new(r"(?i)(stripe\.webhooks\.constructEvent|stripe-signature)").unwrap() },
        ProviderRule { name: "github", detect: Regex::new(r"(?i)(x-hub-signature|x-github-event)").unwrap() },
        ProviderRule { name: "slack", detect: Regex::new(r"(?i)x-slack-signature").unwrap() },
        ProviderRule { name: "svix", detect: Regex::new(r"(?i)\bsvix\b").unwrap() },
        ProviderRule { name: "clerk", detect: Regex::new(r"(?i)clerk").unwrap() },
        ProviderRule { name: "resend", detect: Regex::new(r"(?i)resend").unwrap() },
        ProviderRule { name: "paddle", detect: Regex::new(r"(?i)paddle").unwrap() },
        ProviderRule { name: "lemonsqueezy", detect: Regex::new(r"(?i)lemon.?squeezy").unwrap() },
        ProviderRule { name: "twilio", detect: Regex::new(r"(?i)(twilio|x-twilio-signature)").unwrap() },
        ProviderRule { name: "sendgrid", detect: Regex::new(r"(?i)sendgrid").unwrap() },
        ProviderRule { name: "postmark", detect: Regex::new(r"(?i)postmark").unwrap() },
        ProviderRule { name: "shopify", detect: Regex::new(r"(?i)(shopify|x-shopify-hmac-sha256)").unwrap() },
        ProviderRule { name: "paypal", detect: Regex::new(r"(?i)paypal").unwrap() },
        ProviderRule { name: "plaid", detect: Regex::new(r"(?i)plaid").unwrap() },
    ]
});

static STRIPE_SIGNATURE: Lazy<Regex> = Lazy::new(|| Regex::new(r"stripe\.webhooks\.constructEvent").unwrap());
static GITHUB_SIGNATURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(x-hub-signature|verifyGitHubSignature)").unwrap());
static SLACK_SIGNATURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(x-slack-signature|verifySlackSignature)").unwrap());
static SVIX_VERIFY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bsvix\.verify\(|new Webhook\(").unwrap());
static PADDLE_SIGNATURE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)paddle.{0,20}(signature|verify)").unwrap());
static PAYPAL_SIGNATURE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)paypal.{0,20}(signature|verify)").unwrap());
static GENERIC_HMAC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(createHmac|timingSafeEqual|verifySignature)").unwrap());

static STRIPE_EVENT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bevent\.id\b").unwrap());
static GITHUB_DELIVERY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)x-github-delivery").unwrap());
static SVIX_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)svix-id").unwrap());
static HEADER_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)headers\[.{0,20}-id.{0,5}\]|headers\.get\(.{0,20}-id.{0,5}\)").unwrap());
static BODY_FIELD_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bbody\.id\b|\bpayload\.id\b").unwrap());

static IDEMPOTENCY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(processedEvents|findUnique\(\{where:\{id|withLock\(|acquireLock|mutex\.|if\s*\(existing\)|duplicate:\s*true)").unwrap()
});
static DB_PERSIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(processedWebhookEvent\.create|db\.\w+\.create|tryProcessWebhook|checkAndMarkProcessed|markAsProcessed|withLock\(|runWithLock)").unwrap()
});
static CACHE_PERSIST: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(redis\.set|cache\.set)").unwrap());

static EVENT_TYPE_CASE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"case\s*'([^']+)'\s*:"#).unwrap());
static EVENT_TYPE_EQ: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"event\.type\s*===?\s*'([^']+)'"#).unwrap());

fn file_is_excluded(relative_path: &str) -> bool {
    NON_WEBHOOK_PATH.is_match(relative_path)
}

fn file_is_management(stripped: &str) -> bool {
    let hits = MANAGEMENT_CATALOG.iter().filter(|r| r.is_match(stripped)).count();
    hits >= 2 && !RECEIVER_HINT.is_match(stripped)
}

fn file_passes_gate(relative_path: &str, stripped: &str) -> bool {
    ROUTE_HINT.is_match(relative_path) || POSITIVE_NAME.is_match(stripped) || RECEIVER_HINT.is_match(stripped)
}

fn looks_like_handler(span: &FunctionSpan) -> bool {
    let params = span
        .text
        .split_once('(')
        .and_then(|(_, rest)| rest.split_once(')'))
        .map(|(p, _)| p)
        .unwrap_or("");
    let has_handler_param = HANDLER_PARAMS.iter().any(|p| params.contains(p));
    has_handler_param
        || span.exported
        || span.name.starts_with("on") && span.name.chars().nth(2).is_some_and(|c| c.is_ascii_uppercase())
        || span.name == "POST"
        || span.name == "GET"
}

fn detect_provider(stripped: &str) -> &'static str {
    PROVIDER_RULES
        .iter()
        .find(|r| r.detect.is_match(stripped))
        .map(|r| r.name)
        .unwrap_or("generic")
}

fn signature_verification(stripped: &str) -> ExtractionMethod {
    let (method, regex): (&str, &Regex) = if STRIPE_SIGNATURE.is_match(stripped) {
        ("stripe_construct_event", &STRIPE_SIGNATURE)
    } else if GITHUB_SIGNATURE.is_match(stripped) {
        ("github_signature", &GITHUB_SIGNATURE)
    } else if SLACK_SIGNATURE.is_match(stripped) {
        ("slack_signature", &SLACK_SIGNATURE)
    } else if SVIX_VERIFY.is_match(stripped) {
        ("svix_verify", &SVIX_VERIFY)
    } else if PADDLE_SIGNATURE.is_match(stripped) {
        ("paddle_signature", &PADDLE_SIGNATURE)
    } else if PAYPAL_SIGNATURE.is_match(stripped) {
        ("paypal_signature", &PAYPAL_SIGNATURE)
    } else if GENERIC_HMAC.is_match(stripped) {
        ("generic_hmac", &GENERIC_HMAC)
    } else {
        return ExtractionMethod { method: "none".to_string(), location: None };
    };
    ExtractionMethod {
        method: method.to_string(),
        location: regex.find(stripped).map(|m| m.as_str().to_string()),
    }
}

fn event_id_extraction(stripped: &str) -> ExtractionMethod {
    let (method, regex): (&str, &Regex) = if STRIPE_EVENT_ID.is_match(stripped) {
        ("stripe_event_id", &STRIPE_EVENT_ID)
    } else if GITHUB_DELIVERY.is_match(stripped) {
        ("github_delivery", &GITHUB_DELIVERY)
    } else if SVIX_ID.is_match(stripped) {
        ("svix_id", &SVIX_ID)
    } else if HEADER_ID.is_match(stripped) {
        ("header", &HEADER_ID)
    } else if BODY_FIELD_ID.is_match(stripped) {
        ("body_field", &BODY_FIELD_ID)
    } else {
        return ExtractionMethod { method: "none".to_string(), location: None };
    };
    ExtractionMethod {
        method: method.to_string(),
        location: regex.find(stripped).map(|m| m.as_str().to_string()),
    }
}

fn persistence_marker(stripped: &str) -> PersistenceMarker {
    if let Some(m) = DB_PERSIST.find(stripped) {
        PersistenceMarker { kind: PersistenceKind::Database, location: Some(m.as_str().to_string()) }
    } else if let Some(m) = CACHE_PERSIST.find(stripped) {
        PersistenceMarker { kind: PersistenceKind::Cache, location: Some(m.as_str().to_string()) }
    } else {
        PersistenceMarker { kind: PersistenceKind::None, location: None }
    }
}

fn event_types(stripped: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    EVENT_TYPE_CASE
        .captures_iter(stripped)
        .chain(EVENT_TYPE_EQ.captures_iter(stripped))
        .map(|c| c[1].to_string())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Splits the function body at each `case 'x':`/`event.type === 'x'`
/// boundary and checks the following slice for an idempotency pattern,
/// so a handler that guards one event type but not another is flagged.
fn event_type_idempotency(stripped: &str, types: &[String]) -> Vec<EventTypeIdempotency> {
    let mut boundaries: Vec<(usize, String)> = Vec::new();
    for cap in EVENT_TYPE_CASE.captures_iter(stripped) {
        boundaries.push((cap.get(0).unwrap().end(), cap[1].to_string()));
    }
    for cap in EVENT_TYPE_EQ.captures_iter(stripped) {
        boundaries.push((cap.get(0).unwrap().end(), cap[1].to_string()));
    }
    boundaries.sort_by_key(|(pos, _)| *pos);

    let mut out = Vec::new();
    for (i, (start, event_type)) in boundaries.iter().enumerate() {
        if !types.contains(event_type) {
            continue;
        }
        let end = boundaries.get(i + 1).map(|(p, _)| *p).unwrap_or(stripped.len());
        let branch = &stripped[*start..end.max(*start)];
        out.push(EventTypeIdempotency {
            event_type: event_type.clone(),
            has_idempotency_check: IDEMPOTENCY.is_match(branch),
        });
    }
    out
}

pub fn extract(relative_path: &str, parsed: &ParsedFile) -> Vec<WebhookHandler> {
    if file_is_excluded(relative_path) {
        return Vec::new();
    }
    let stripped_file = strip_comments(&parsed.source);
    if file_is_management(&stripped_file) {
        return Vec::new();
    }
    if !file_passes_gate(relative_path, &stripped_file) {
        return Vec::new();
    }

    let mut out = Vec::new();
    for span in function_spans(parsed) {
        if !POSITIVE_NAME.is_match(&span.name) && !RECEIVER_HINT.is_match(&span.text) {
            continue;
        }
        if NEGATIVE_NAME.is_match(&span.name) {
            continue;
        }
        if !looks_like_handler(&span) {
            continue;
        }

        let stripped = strip_comments(&span.text);
        let provider = detect_provider(&stripped);
        let types = event_types(&stripped);
        let branch_idempotency = event_type_idempotency(&stripped, &types);
        let idempotency_match = IDEMPOTENCY.find(&stripped);

        out.push(WebhookHandler {
            file: relative_path.to_string(),
            line: span.start_line,
            provider: provider.to_string(),
            event_types: if types.is_empty() { None } else { Some(types) },
            has_idempotency_check: idempotency_match.is_some(),
            idempotency_key_location: idempotency_match.map(|m| m.as_str().to_string()),
            event_id_extraction: event_id_extraction(&stripped),
            signature_verification: signature_verification(&stripped),
            persistence_marker: persistence_marker(&stripped),
            handler_name: Some(span.name.clone()),
            event_type_idempotency: if branch_idempotency.is_empty() { None } else { Some(branch_idempotency) },
        });
    }

    out.sort_by_key(|w| w.line);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ast::{parse_source, SourceLang};

    #[test]
    fn stripe_receiver_is_recognized_as_idempotent() {
        let src = r#"
export async function handleStripeWebhook(req){
  const event = stripe.webhooks.constructEvent(body, sig, secret);
  if (await db.processedEvents.findUnique({where:{id:event.id}})) return {duplicate:true};
  await db.processedEvents.create({data:{id:event.id}});
}
"#;
        let parsed = parse_source(src, SourceLang::TypeScript).unwrap();
        let handlers = extract("src/webhooks/stripe.ts", &parsed);
        assert_eq!(handlers.len(), 1);
        let h = &handlers[0];
        assert_eq!(h.provider, "stripe");
        assert_eq!(h.signature_verification.method, "stripe_construct_event");
        assert_eq!(h.event_id_extraction.method, "stripe_event_id");
        assert!(h.has_idempotency_check);
        assert_eq!(h.persistence_marker.kind, PersistenceKind::Database);
    }

    #[test]
    fn management_file_yields_no_handlers() {
        let src = r#"
export async function createWebhook(req){ await prisma.webhook.create({data:{}}); }
export async function listWebhooks(req){ return prisma.webhook.findMany(); }
"#;
        let parsed = parse_source(src, SourceLang::TypeScript).unwrap();
        let handlers = extract("src/routes/webhooks.ts", &parsed);
        assert!(handlers.is_empty());
    }

    #[test]
    fn borderline_file_with_one_receiver_hint_is_surfaced_not_suppressed() {
        // Two management-shaped calls alongside a single real receiver —
        // a false negative here is worse than an occasional false positive.
        let src = r#"
export async function createWebhook(req){ await prisma.webhook.create({data:{}}); }
export async function updateWebhook(req){ await prisma.webhook.update({where:{id:req.params.id},data:{}}); }
export async function handleStripeWebhook(req){
  const event = stripe.webhooks.constructEvent(req.body, req.headers['stripe-signature'], secret);
  await db.order.update({ where: { id: event.data.object.id }, data: { status: 'paid' } });
}
"#;
        let parsed = parse_source(src, SourceLang::TypeScript).unwrap();
        let handlers = extract("src/routes/webhooks.ts", &parsed);
        assert_eq!(handlers.len(), 1);
        assert_eq!(handlers[0].provider, "stripe");
    }
}
