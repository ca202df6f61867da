//! aviary-context: AST-level analysis for decorator-based TypeScript sources.
//!
//! This crate is the pure half of the indexing pipeline: given a file name and
//! its content, it classifies the file, partitions it into embeddable chunks
//! (one chunk per atomic file, class-signature parents with method children
//! for logic files), and extracts a skeleton document plus the raw relative
//! import specifiers. It performs no I/O; resolving specifiers against the
//! filesystem is the caller's concern.

pub mod chunker;
pub mod parser;
pub mod skeleton;

pub use chunker::{
    analyze_source, ChunkKind, ChunkMetadata, ParseError, ProcessedChunk, SourceAnalysis,
    SourceFileKind,
};
pub use skeleton::{ClassOutline, FileOutline, Skeleton};
