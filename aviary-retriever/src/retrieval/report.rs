//! Deterministic context-report formatting.
//!
//! Downstream consumers match on the headings and ordering, so the layout is
//! part of the external contract: keep it byte-stable.

use aviary_context::Skeleton;

/// Everything the report renders for one relevant file.
#[derive(Debug, Clone)]
pub struct FileSection {
    pub path: String,
    /// Highest hit similarity within the file, in [0, 1] for normal corpora.
    pub relevance: f32,
    /// Outbound import targets.
    pub imports: Vec<String>,
    pub skeleton: Option<Skeleton>,
    pub snippets: Vec<Snippet>,
}

#[derive(Debug, Clone)]
pub struct Snippet {
    /// Method name, or "Class Structure" for parent and file chunks.
    pub label: String,
    pub content: String,
}

const SHOWN_IMPORTS: usize = 5;

fn rule() -> String {
    "=".repeat(65)
}

/// Render the full report: query echo, file count, then one block per file
/// in descending relevance.
pub fn format_context_report(query: &str, sections: &[FileSection]) -> String {
    let mut out = String::new();
    out.push_str(&format!("🔍 **QUERY:** {query}\n"));
    out.push_str(&format!("Found {} relevant files.\n", sections.len()));

    for section in sections {
        out.push('\n');
        out.push_str(&rule());
        out.push('\n');
        out.push_str(&format!("📂 **FILE:** {}\n", section.path));
        out.push_str(&format!(
            "📊 **RELEVANCE:** {:.1}%\n",
            section.relevance * 100.0
        ));

        out.push_str("🔗 **DEPENDENCIES (Imports):**\n");
        for target in section.imports.iter().take(SHOWN_IMPORTS) {
            out.push_str(&format!("   - {target}\n"));
        }
        if section.imports.len() > SHOWN_IMPORTS {
            out.push_str(&format!(
                "   - (…and {} more)\n",
                section.imports.len() - SHOWN_IMPORTS
            ));
        }

        out.push_str("🏗️ **FILE SKELETON (MAP):**\n");
        match &section.skeleton {
            Some(skeleton) => {
                out.push_str(skeleton.to_string().trim_end());
                out.push('\n');
            }
            None => out.push_str("no skeleton\n"),
        }
        out.push('\n');

        out.push_str("📝 **CODE SNIPPETS:**\n");
        for snippet in &section.snippets {
            out.push_str(&format!("   --- [{}] ---\n", snippet.label));
            out.push_str(snippet.content.trim());
            out.push_str("\n\n");
        }

        out.push_str(&format!(
            "💡 **AGENT HINT:** To edit this file or see full imports, run: read_file(\"{}\")\n",
            section.path
        ));
        out.push_str(&rule());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use aviary_context::{ClassOutline, FileOutline};

    fn section() -> FileSection {
        FileSection {
            path: "src/users/users.service.ts".to_string(),
            relevance: 0.8734,
            imports: (1..=7).map(|i| format!("src/dep{i}.ts")).collect(),
            skeleton: Some(Skeleton::Outline(FileOutline {
                imports: vec!["import { Injectable } from '@nestjs/common';".to_string()],
                classes: vec![ClassOutline {
                    name: "UsersService".to_string(),
                    methods: vec!["create(dto: CreateUserDto): Promise<User>;".to_string()],
                }],
            })),
            snippets: vec![Snippet {
                label: "create".to_string(),
                content: "create(dto: CreateUserDto) {\n  return this.repo.save(dto);\n}"
                    .to_string(),
            }],
        }
    }

    #[test]
    fn report_contains_stable_headings() {
        let report = format_context_report("user creation", &[section()]);

        assert!(report.starts_with("🔍 **QUERY:** user creation\n"));
        assert!(report.contains("Found 1 relevant files.\n"));
        assert!(report.contains("📂 **FILE:** src/users/users.service.ts\n"));
        assert!(report.contains("📊 **RELEVANCE:** 87.3%\n"));
        assert!(report.contains("🔗 **DEPENDENCIES (Imports):**\n"));
        assert!(report.contains("🏗️ **FILE SKELETON (MAP):**\n"));
        assert!(report.contains("📝 **CODE SNIPPETS:**\n"));
        assert!(report.contains("   --- [create] ---\n"));
        assert!(report.contains(
            "💡 **AGENT HINT:** To edit this file or see full imports, run: read_file(\"src/users/users.service.ts\")\n"
        ));
        assert!(report.contains(&"=".repeat(65)));
    }

    #[test]
    fn imports_beyond_five_are_summarized() {
        let report = format_context_report("q", &[section()]);
        assert!(report.contains("   - src/dep5.ts\n"));
        assert!(!report.contains("   - src/dep6.ts\n"));
        assert!(report.contains("   - (…and 2 more)\n"));
    }

    #[test]
    fn empty_result_reports_zero_files() {
        let report = format_context_report("anything", &[]);
        assert!(report.contains("Found 0 relevant files.\n"));
        assert!(!report.contains("📂"));
    }
}
