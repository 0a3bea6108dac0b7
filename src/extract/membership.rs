//! Membership-mutation extractor: functions that remove, downgrade, or
//! revoke a member/team/role/permission/apiKey/session, scored against
//! whether the mutation site also invalidates the cache it should.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::extract::ast::{function_spans, ParsedFile};
use crate::model::records::{CacheOperation, Confidence, MembershipMutation, MutationEntity, MutationType};
use crate::patterns::strip_comments;

struct TypeRule {
    regex: Regex,
    kind: MutationType,
}

static TYPE_RULES: Lazy<Vec<TypeRule>> = Lazy::new(|| {
    vec![
        TypeRule {
            regex: Regex::new(r"(?i)^(remove|delete)").unwrap(),
            kind: MutationType::Remove,
        },
        TypeRule {
            regex: Regex::new(r"(?i)^downgrade").unwrap(),
            kind: MutationType::Downgrade,
        },
        TypeRule {
            regex: Regex::new(r"(?i)^revoke").unwrap(),
            kind: MutationType::Revoke,
        },
        TypeRule {
            regex: Regex::new(r"(?i)^update").unwrap(),
            kind: MutationType::Update,
        },
    ]
});

struct EntityRule {
    regex: Regex,
    entity: MutationEntity,
}

static ENTITY_RULES: Lazy<Vec<EntityRule>> = Lazy::new(|| {
    vec![
        EntityRule {
            regex: Regex::new(r"(?i)member").unwrap(),
            entity: MutationEntity::Member,
        },
        EntityRule {
            regex: Regex::new(r"(?i)team").unwrap(),
            entity: MutationEntity::Team,
        },
        EntityRule {
            regex: Regex::new(r"(?i)role").unwrap(),
            entity: MutationEntity::Role,
        },
        EntityRule {
            regex: Regex::new(r"(?i)permission").unwrap(),
            entity: MutationEntity::Permission,
        },
        EntityRule {
            regex: Regex::new(r"(?i)api[_-]?key").unwrap(),
            entity: MutationEntity::ApiKey,
        },
        EntityRule {
            regex: Regex::new(r"(?i)session").unwrap(),
            entity: MutationEntity::Session,
        },
    ]
});

static IDENTITY_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(userId|teamId|memberId|roleId|sessionId|id)\s*:?").unwrap());
static DB_VERB: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.(delete|update|remove)\w*\(").unwrap());
static CACHE_INVALIDATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(cache\.(del|delete|invalidate)|redis\.del|invalidateCache)\w*\(").unwrap());

fn signature(text: &str) -> &str {
    text.split_once('(').map(|(_, rest)| rest).unwrap_or("")
        .split_once(')').map(|(params, _)| params).unwrap_or("")
}

pub fn extract(relative_path: &str, parsed: &ParsedFile) -> Vec<MembershipMutation> {
    let mut out = Vec::new();

    for span in function_spans(parsed) {
        let Some(type_rule) = TYPE_RULES.iter().find(|r| r.regex.is_match(&span.name)) else {
            continue;
        };
        let Some(entity_rule) = ENTITY_RULES.iter().find(|r| r.regex.is_match(&span.name)) else {
            continue;
        };

        let body = strip_comments(&span.text);
        let params = signature(&span.text);
        let has_identity_param = IDENTITY_PARAM.is_match(params);
        let has_db_verb = DB_VERB.is_match(&body);
        let invalidation_match = CACHE_INVALIDATION.find(&body);
        let has_cache_invalidation = invalidation_match.is_some();

        let mut signals = Vec::new();
        signals.push(format!("name:{}", span.name));
        if has_identity_param {
            signals.push("identity_param".to_string());
        }
        if has_db_verb {
            signals.push("db_verb".to_string());
        }

        let is_strong_type = matches!(
            type_rule.kind,
            MutationType::Remove | MutationType::Downgrade | MutationType::Revoke
        );
        let confidence = if is_strong_type && has_identity_param && has_db_verb {
            Confidence::High
        } else if has_identity_param || has_db_verb {
            Confidence::Medium
        } else {
            Confidence::Low
        };

        out.push(MembershipMutation {
            file: relative_path.to_string(),
            line: span.start_line,
            function_name: span.name.clone(),
            mutation_type: type_rule.kind,
            entity: entity_rule.entity,
            has_cache_invalidation,
            invalidation_location: invalidation_match.map(|m| m.as_str().to_string()),
            related_cache_keys: None,
            signals,
            confidence,
        });
    }

    out.sort_by_key(|m| m.line);
    out
}

/// §3.6 lifecycle step 2: cross-links cache-invalidation facts into
/// membership mutations. A cache operation whose `callerFunction` matches
/// a mutation's `functionName` in the same file contributes its key.
pub fn cross_link_cache_keys(
    mutations: &mut [MembershipMutation],
    cache_operations: &[CacheOperation],
) {
    for mutation in mutations {
        let keys: Vec<String> = cache_operations
            .iter()
            .filter(|op| {
                op.file == mutation.file
                    && op.caller_function.as_deref() == Some(mutation.function_name.as_str())
            })
            .filter_map(|op| op.key.clone())
            .collect();
        if !keys.is_empty() {
            mutation.related_cache_keys = Some(keys);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ast::{parse_source, SourceLang};

    #[test]
    fn remove_team_member_without_invalidation_is_high_confidence() {
        let src = r#"
export async function removeTeamMember(userId: string, teamId: string){
  await db.teamMember.delete({where:{userId_teamId:{userId,teamId}}});
}
"#;
        let parsed = parse_source(src, SourceLang::TypeScript).unwrap();
        let mutations = extract("src/members.ts", &parsed);
        assert_eq!(mutations.len(), 1);
        let m = &mutations[0];
        assert_eq!(m.mutation_type, MutationType::Remove);
        assert_eq!(m.entity, MutationEntity::Member);
        assert!(!m.has_cache_invalidation);
        assert_eq!(m.confidence, Confidence::High);
    }

    #[test]
    fn invalidation_is_detected_when_present() {
        let src = r#"
export async function revokeApiKey(apiKeyId: string){
  await db.apiKey.delete({where:{id:apiKeyId}});
  await cache.del(`apiKey:${apiKeyId}`);
}
"#;
        let parsed = parse_source(src, SourceLang::TypeScript).unwrap();
        let mutations = extract("src/keys.ts", &parsed);
        assert_eq!(mutations.len(), 1);
        assert!(mutations[0].has_cache_invalidation);
    }

    #[test]
    fn cross_link_attaches_keys_from_matching_caller_function() {
        let mut mutations = vec![MembershipMutation {
            file: "src/keys.ts".to_string(),
            line: 2,
            function_name: "revokeApiKey".to_string(),
            mutation_type: MutationType::Revoke,
            entity: MutationEntity::ApiKey,
            has_cache_invalidation: true,
            invalidation_location: None,
            related_cache_keys: None,
            signals: Vec::new(),
            confidence: Confidence::High,
        }];
        let cache_operations = vec![
            CacheOperation {
                file: "src/keys.ts".to_string(),
                line: 3,
                kind: crate::model::records::CacheOpType::Delete,
                key: Some("apiKey:${apiKeyId}".to_string()),
                caller_function: Some("revokeApiKey".to_string()),
            },
            CacheOperation {
                file: "src/keys.ts".to_string(),
                line: 10,
                kind: crate::model::records::CacheOpType::Get,
                key: Some("unrelated".to_string()),
                caller_function: Some("otherFunction".to_string()),
            },
        ];

        cross_link_cache_keys(&mut mutations, &cache_operations);

        assert_eq!(
            mutations[0].related_cache_keys,
            Some(vec!["apiKey:${apiKeyId}".to_string()])
        );
    }
}
