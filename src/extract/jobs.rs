//! Background-job handler extractor: Trigger.dev, BullMQ, Inngest, and
//! generic custom job entry points, restricted to files that look like job
//! definitions in the first place.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::extract::ast::{call_sites, function_spans, ParsedFile};
use crate::model::records::{JobFramework, JobHandler};
use crate::patterns::strip_comments;

static JOB_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(/jobs/|/workers/|\.job\.(ts|js))").unwrap());
static NON_JOB_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\.test\.|\.spec\.|/__mocks__/|\.d\.ts$|\.config\.)").unwrap());

static IDEMPOTENCY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(idempoten|dedup|upsert|acquireLock|withLock|mutex\.)").unwrap()
});

static CUSTOM_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(defineJob|process\w*Job)$").unwrap());

static DECORATOR_PROCESSOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@(Processor|Process)\s*\(([^)]*)\)\s*\n?\s*(?:\w+\s+)*(?:async\s+)?(\w+)\s*\(").unwrap());

static NEW_WORKER: Lazy<Regex> = Lazy::new(|| Regex::new(r#"new\s+Worker\s*\(\s*['"]([^'"]+)['"]"#).unwrap());

pub fn is_job_candidate(relative_path: &str) -> bool {
    JOB_PATH.is_match(relative_path) && !NON_JOB_PATH.is_match(relative_path)
}

pub fn extract(relative_path: &str, parsed: &ParsedFile) -> Vec<JobHandler> {
    if !is_job_candidate(relative_path) {
        return Vec::new();
    }

    let spans = function_spans(parsed);
    let mut out = Vec::new();

    for call in call_sites(parsed) {
        let framework = match call.callee.as_str() {
            "schemaTask" | "task" => Some(JobFramework::Trigger),
            "createFunction" => Some(JobFramework::Inngest),
            name if CUSTOM_NAME.is_match(name) => Some(JobFramework::Custom),
            _ => None,
        };
        let Some(framework) = framework else { continue };

        let name = call
            .arguments
            .first()
            .map(|a| a.trim_matches(|c| c == '\'' || c == '"').to_string())
            .unwrap_or_else(|| call.callee.clone());
        let body = strip_comments(&call.text);
        out.push(JobHandler {
            file: relative_path.to_string(),
            line: call.line,
            name,
            has_idempotency_check: IDEMPOTENCY.is_match(&body),
            framework,
        });
    }

    for capture in DECORATOR_PROCESSOR.captures_iter(&parsed.source) {
        let full_match = capture.get(0).unwrap();
        let line = parsed.source[..full_match.start()].lines().count() as u32 + 1;
        let name = capture[3].to_string();
        let body = spans
            .iter()
            .find(|s| s.name == name)
            .map(|s| strip_comments(&s.text))
            .unwrap_or_default();
        out.push(JobHandler {
            file: relative_path.to_string(),
            line,
            name,
            has_idempotency_check: IDEMPOTENCY.is_match(&body),
            framework: JobFramework::Bullmq,
        });
    }

    for capture in NEW_WORKER.captures_iter(&parsed.source) {
        let full_match = capture.get(0).unwrap();
        let line = parsed.source[..full_match.start()].lines().count() as u32 + 1;
        out.push(JobHandler {
            file: relative_path.to_string(),
            line,
            name: capture[1].to_string(),
            has_idempotency_check: IDEMPOTENCY.is_match(&parsed.source),
            framework: JobFramework::Bullmq,
        });
    }

    out.sort_by_key(|j| j.line);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ast::{parse_source, SourceLang};

    #[test]
    fn trigger_dev_task_is_recognized() {
        let src = r#"
export const sendEmail = schemaTask({
  id: "send-email",
  run: async (payload) => { await dedupCheck(payload.id); }
});
"#;
        let parsed = parse_source(src, SourceLang::TypeScript).unwrap();
        let jobs = extract("src/jobs/send-email.ts", &parsed);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].framework, JobFramework::Trigger);
    }

    #[test]
    fn non_job_path_is_ignored() {
        let src = "export const sendEmail = schemaTask({ id: 'x' });";
        let parsed = parse_source(src, SourceLang::TypeScript).unwrap();
        let jobs = extract("src/routes/send-email.ts", &parsed);
        assert!(jobs.is_empty());
    }

    #[test]
    fn test_file_under_jobs_dir_is_excluded() {
        let src = "export const sendEmail = schemaTask({ id: 'x' });";
        let parsed = parse_source(src, SourceLang::TypeScript).unwrap();
        let jobs = extract("src/jobs/send-email.test.ts", &parsed);
        assert!(jobs.is_empty());
    }
}
