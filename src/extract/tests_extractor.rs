//! Tests extractor: structural evidence of what a test file proves,
//! consumed downstream by invariants that check "a test covers this" rather
//! than re-deriving it from the assertion bodies themselves.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::extract::ast::{call_sites, ParsedFile};
use crate::model::records::TestFact;

static EXPECT_CALL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bexpect\s*\(").unwrap());
static ASSERT_CALL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bassert\.\w+\s*\(").unwrap());

fn detect_framework(source: &str) -> Option<String> {
    if source.contains("from 'vitest'") || source.contains("from \"vitest\"") {
        Some("vitest".to_string())
    } else if source.contains("from 'jest'") || source.contains("@jest/globals") {
        Some("jest".to_string())
    } else if source.contains("node:test") {
        Some("node:test".to_string())
    } else {
        None
    }
}

pub fn extract(relative_path: &str, parsed: &ParsedFile) -> Vec<TestFact> {
    let framework = detect_framework(&parsed.source);
    let mut out = Vec::new();

    for call in call_sites(parsed) {
        if !matches!(call.callee.as_str(), "test" | "it") {
            continue;
        }
        let Some(name_arg) = call.arguments.first() else {
            continue;
        };
        let name = name_arg
            .trim_matches(|c| c == '\'' || c == '"' || c == '`')
            .to_string();
        let assertion_count =
            EXPECT_CALL.find_iter(&call.text).count() + ASSERT_CALL.find_iter(&call.text).count();

        out.push(TestFact {
            file: relative_path.to_string(),
            line: call.line,
            name,
            framework: framework.clone(),
            assertion_count: assertion_count as u32,
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
    fn counts_expect_calls_inside_a_test_body() {
        let src = r#"
import { test, expect } from 'vitest';
test('removes a team member', async () => {
  const result = await removeTeamMember('u1', 't1');
  expect(result).toBeUndefined();
  expect(db.teamMember.delete).toHaveBeenCalled();
});
"#;
        let parsed = parse_source(src, SourceLang::TypeScript).unwrap();
        let facts = extract("src/members.test.ts", &parsed);
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].name, "removes a team member");
        assert_eq!(facts[0].assertion_count, 2);
        assert_eq!(facts[0].framework.as_deref(), Some("vitest"));
    }
}
