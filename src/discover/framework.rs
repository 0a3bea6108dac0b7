//! Framework detection: combines dependency-match, config-file-presence,
//! and source-grep signals into a confidence-scored list of frameworks a
//! partition uses.

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkSignal {
    pub framework: String,
    pub sources: Vec<String>,
    pub confidence: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkDetection {
    pub frameworks: Vec<String>,
    pub framework_versions: std::collections::HashMap<String, String>,
    pub signals: Vec<FrameworkSignal>,
}

struct FrameworkRule {
    name: &'static str,
    dependency_prefixes: &'static [&'static str],
    config_files: &'static [&'static str],
    source_markers: &'static [&'static str],
}

const RULES: &[FrameworkRule] = &[
    FrameworkRule {
        name: "nextjs",
        dependency_prefixes: &["next"],
        config_files: &["next.config.js", "next.config.mjs", "next.config.ts"],
        source_markers: &[],
    },
    FrameworkRule {
        name: "nuxt",
        dependency_prefixes: &["nuxt"],
        config_files: &["nuxt.config.js", "nuxt.config.ts"],
        source_markers: &[],
    },
    FrameworkRule {
        name: "astro",
        dependency_prefixes: &["astro"],
        config_files: &["astro.config.mjs", "astro.config.ts"],
        source_markers: &[],
    },
    FrameworkRule {
        name: "sveltekit",
        dependency_prefixes: &["@sveltejs/kit"],
        config_files: &["svelte.config.js"],
        source_markers: &[],
    },
    FrameworkRule {
        name: "nestjs",
        dependency_prefixes: &["@nestjs/core"],
        config_files: &["nest-cli.json"],
        source_markers: &[],
    },
    FrameworkRule {
        name: "keystone",
        dependency_prefixes: &["@keystone-6/core"],
        config_files: &["keystone.ts"],
        source_markers: &[],
    },
    FrameworkRule {
        name: "prisma",
        dependency_prefixes: &["@prisma/client", "prisma"],
        config_files: &["prisma/schema.prisma"],
        source_markers: &[],
    },
    FrameworkRule {
        name: "express",
        dependency_prefixes: &["express"],
        config_files: &[],
        source_markers: &[],
    },
    FrameworkRule {
        name: "fastify",
        dependency_prefixes: &["fastify"],
        config_files: &[],
        source_markers: &[],
    },
    FrameworkRule {
        name: "hono",
        dependency_prefixes: &["hono"],
        config_files: &[],
        source_markers: &[],
    },
    FrameworkRule {
        name: "supabase",
        dependency_prefixes: &["@supabase/supabase-js"],
        config_files: &["supabase/config.toml"],
        source_markers: &["@supabase/supabase-js"],
    },
    FrameworkRule {
        name: "drizzle",
        dependency_prefixes: &["drizzle-orm"],
        config_files: &["drizzle.config.ts"],
        source_markers: &["drizzle-orm"],
    },
    FrameworkRule {
        name: "typeorm",
        dependency_prefixes: &["typeorm"],
        config_files: &[],
        source_markers: &["typeorm"],
    },
    FrameworkRule {
        name: "sequelize",
        dependency_prefixes: &["sequelize"],
        config_files: &[],
        source_markers: &["sequelize"],
    },
];

/// `dependencies`/`devDependencies`/`peerDependencies`/`optionalDependencies`
/// merged into one name->version map, the shape framework detection
/// actually needs (a `package.json`'s four dependency tables, flattened).
fn merged_dependencies(package_json: &serde_json::Value) -> std::collections::HashMap<String, String> {
    let mut out = std::collections::HashMap::new();
    for key in [
        "dependencies",
        "devDependencies",
        "peerDependencies",
        "optionalDependencies",
    ] {
        if let Some(obj) = package_json.get(key).and_then(|v| v.as_object()) {
            for (name, version) in obj {
                out.entry(name.clone())
                    .or_insert_with(|| version.as_str().unwrap_or("").to_string());
            }
        }
    }
    out
}

pub fn detect_frameworks(
    partition_root: &Path,
    package_json: Option<&serde_json::Value>,
    source_samples: &[String],
) -> FrameworkDetection {
    let deps = package_json.map(merged_dependencies).unwrap_or_default();
    let mut detection = FrameworkDetection::default();

    for rule in RULES {
        let mut sources = Vec::new();
        let mut confidence: f32 = 0.0;

        if let Some((dep_name, version)) = rule
            .dependency_prefixes
            .iter()
            .find_map(|prefix| deps.get_key_value(*prefix))
        {
            sources.push(format!("dependency:{dep_name}"));
            confidence += 0.5;
            detection
                .framework_versions
                .insert(rule.name.to_string(), version.clone());
        }

        for config_file in rule.config_files {
            if partition_root.join(config_file).exists() {
                sources.push(format!("config:{config_file}"));
                confidence += 0.3;
            }
        }

        for marker in rule.source_markers {
            if source_samples.iter().any(|s| s.contains(marker)) {
                sources.push(format!("source:{marker}"));
                confidence += 0.2;
            }
        }

        if confidence > 0.0 {
            detection.frameworks.push(rule.name.to_string());
            detection.signals.push(FrameworkSignal {
                framework: rule.name.to_string(),
                sources,
                confidence: confidence.min(1.0),
            });
        }
    }

    detection
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn dependency_and_config_signals_accumulate_confidence() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("next.config.js"), "module.exports = {};").unwrap();
        let pkg = serde_json::json!({ "dependencies": { "next": "14.0.0" } });

        let detection = detect_frameworks(temp.path(), Some(&pkg), &[]);
        assert!(detection.frameworks.contains(&"nextjs".to_string()));
        let signal = detection
            .signals
            .iter()
            .find(|s| s.framework == "nextjs")
            .unwrap();
        assert_eq!(signal.sources.len(), 2);
        assert!(signal.confidence > 0.5);
    }

    #[test]
    fn source_grep_detects_supabase_without_config_file() {
        let temp = TempDir::new().unwrap();
        let samples = vec!["import { createClient } from '@supabase/supabase-js'".to_string()];
        let detection = detect_frameworks(temp.path(), None, &samples);
        assert!(detection.frameworks.contains(&"supabase".to_string()));
    }

    #[test]
    fn no_signals_means_no_frameworks() {
        let temp = TempDir::new().unwrap();
        let detection = detect_frameworks(temp.path(), None, &[]);
        assert!(detection.frameworks.is_empty());
    }
}
