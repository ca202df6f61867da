//! File classification and the parent-child chunking strategy.
//!
//! Atomic data-shape files (`.dto`, `.entity`, `.interface`, `.enum`, `.type`)
//! are kept whole: splitting them would strip the validation metadata that
//! gives them meaning. Logic files are partitioned into one `class_signature`
//! parent per class plus one `method` child per method, linked by id, so that
//! retrieval can land on a single method while the parent preserves the class
//! shape (imports, decorators, properties, constructor).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::parser;
use crate::skeleton::{ClassOutline, FileOutline, Skeleton};

/// Classification of a source file by its path suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFileKind {
    /// Data-shape files indexed as a single chunk.
    Atomic,
    /// Class-bearing files processed with the parent-child strategy.
    Logic,
    /// Module/bootstrap files; chunked as logic, edges are the main value.
    Config,
}

const ATOMIC_SUFFIXES: [&str; 5] = [".dto", ".entity", ".interface", ".enum", ".type"];

impl SourceFileKind {
    pub fn classify(path: &str) -> Self {
        let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
        let stem = file_name.strip_suffix(".ts").unwrap_or(file_name);

        if ATOMIC_SUFFIXES.iter().any(|s| stem.ends_with(s)) {
            SourceFileKind::Atomic
        } else if stem.ends_with(".module") || stem == "main" {
            SourceFileKind::Config
        } else {
            SourceFileKind::Logic
        }
    }
}

/// Kind of a stored chunk. `Config` is reserved in the schema; the chunker
/// currently emits `File`, `ClassSignature` and `Method` only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    File,
    ClassSignature,
    Method,
    Config,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkKind::File => "file",
            ChunkKind::ClassSignature => "class_signature",
            ChunkKind::Method => "method",
            ChunkKind::Config => "config",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "file" => Some(ChunkKind::File),
            "class_signature" => Some(ChunkKind::ClassSignature),
            "method" => Some(ChunkKind::Method),
            "config" => Some(ChunkKind::Config),
            _ => None,
        }
    }
}

/// Positional and structural metadata attached to every chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    /// 1-based first line of the chunk in its file.
    pub start_line: u32,
    /// 1-based last line, inclusive.
    pub end_line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decorators: Option<Vec<String>>,
}

/// One embeddable unit produced by the chunker. Identifiers are random per
/// analysis run; callers must not rely on their stability across runs.
#[derive(Debug, Clone)]
pub struct ProcessedChunk {
    pub id: Uuid,
    pub kind: ChunkKind,
    pub content: String,
    pub parent_id: Option<Uuid>,
    pub metadata: ChunkMetadata,
}

/// Everything the analyzer learns about one file.
#[derive(Debug, Clone)]
pub struct SourceAnalysis {
    pub kind: SourceFileKind,
    pub chunks: Vec<ProcessedChunk>,
    pub skeleton: Skeleton,
    /// Raw module specifiers of every import, unresolved and unfiltered.
    pub import_specifiers: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to parse {path}")]
    Parse { path: String },
}

const METHODS_SENTINEL: &str = "// NOTE: methods are indexed as separate child chunks";

/// Analyze one source file: classify, chunk, outline, collect imports.
pub fn analyze_source(path: &str, content: &str) -> Result<SourceAnalysis, ParseError> {
    let tree = parser::parse(content).ok_or_else(|| ParseError::Parse {
        path: path.to_string(),
    })?;
    let root = tree.root_node();

    let import_nodes = parser::import_statements(root);
    let raw_imports: Vec<String> = import_nodes
        .iter()
        .map(|n| parser::text(*n, content).to_string())
        .collect();
    let import_specifiers: Vec<String> = import_nodes
        .iter()
        .filter_map(|n| parser::import_specifier(*n, content))
        .map(str::to_string)
        .collect();

    let kind = SourceFileKind::classify(path);
    if kind == SourceFileKind::Atomic {
        return Ok(SourceAnalysis {
            kind,
            chunks: vec![atomic_chunk(root, content)],
            skeleton: Skeleton::full(),
            import_specifiers,
        });
    }

    let mut chunks = Vec::new();
    let mut outlines = Vec::new();
    for class in parser::top_level_classes(root) {
        let Some(name) = class.name(content) else {
            continue;
        };
        let members = parser::class_members(class.node, content);

        let decorator_names: Vec<String> = class
            .decorators
            .iter()
            .map(|d| parser::decorator_name(*d, content))
            .collect();
        let parent = ProcessedChunk {
            id: Uuid::new_v4(),
            kind: ChunkKind::ClassSignature,
            content: class_signature_content(&raw_imports, &class, &members, name, content),
            parent_id: None,
            metadata: ChunkMetadata {
                start_line: class.start_row() as u32 + 1,
                end_line: class.node.end_position().row as u32 + 1,
                class_name: Some(name.to_string()),
                method_name: None,
                decorators: some_if_nonempty(decorator_names),
            },
        };
        let parent_id = parent.id;
        chunks.push(parent);

        let mut signatures = Vec::new();
        for method in &members.methods {
            signatures.push(parser::method_signature(method, content));
            let decorators: Vec<String> = method
                .decorators
                .iter()
                .map(|d| parser::decorator_name(*d, content))
                .collect();
            chunks.push(ProcessedChunk {
                id: Uuid::new_v4(),
                kind: ChunkKind::Method,
                content: content[method.full_range()].to_string(),
                parent_id: Some(parent_id),
                metadata: ChunkMetadata {
                    start_line: method.start_row() as u32 + 1,
                    end_line: method.node.end_position().row as u32 + 1,
                    class_name: Some(name.to_string()),
                    method_name: Some(method.name.clone()),
                    decorators: some_if_nonempty(decorators),
                },
            });
        }

        outlines.push(ClassOutline {
            name: name.to_string(),
            methods: signatures,
        });
    }

    Ok(SourceAnalysis {
        kind,
        chunks,
        skeleton: Skeleton::Outline(FileOutline {
            imports: raw_imports,
            classes: outlines,
        }),
        import_specifiers,
    })
}

fn atomic_chunk(root: tree_sitter::Node<'_>, content: &str) -> ProcessedChunk {
    let line_count = content.lines().count().max(1) as u32;
    ProcessedChunk {
        id: Uuid::new_v4(),
        kind: ChunkKind::File,
        content: content.to_string(),
        parent_id: None,
        metadata: ChunkMetadata {
            start_line: 1,
            end_line: line_count,
            class_name: parser::first_class_name(root, content),
            method_name: None,
            decorators: None,
        },
    }
}

/// Deterministic reconstruction of the class shape: import block, decorators,
/// header, properties, first constructor, sentinel, closing brace.
fn class_signature_content(
    raw_imports: &[String],
    class: &parser::ClassDecl<'_>,
    members: &parser::ClassMembers<'_>,
    name: &str,
    source: &str,
) -> String {
    let mut out = String::new();
    if !raw_imports.is_empty() {
        out.push_str(&raw_imports.join("\n"));
        out.push_str("\n\n");
    }
    for decorator in &class.decorators {
        out.push_str(parser::text(*decorator, source));
        out.push('\n');
    }
    out.push_str("class ");
    out.push_str(name);
    out.push_str(" {\n");
    for property in &members.properties {
        let raw = parser::text(*property, source).trim_end();
        out.push_str("  ");
        out.push_str(raw);
        if !raw.ends_with(';') {
            out.push(';');
        }
        out.push('\n');
    }
    if let Some(ctor) = members.constructor {
        out.push('\n');
        out.push_str("  ");
        out.push_str(parser::text(ctor, source));
        out.push('\n');
    }
    out.push('\n');
    out.push_str("  ");
    out.push_str(METHODS_SENTINEL);
    out.push_str("\n}");
    out
}

fn some_if_nonempty(values: Vec<String>) -> Option<Vec<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}
