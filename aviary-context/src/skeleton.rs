//! Skeleton documents: a file's imports and class/method-signature outline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker stored for atomic files, whose full text is their own skeleton.
pub const FULL_MARKER: &str = "full";

/// Outline of a single class: its name and the signature of every method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassOutline {
    pub name: String,
    pub methods: Vec<String>,
}

/// Structured skeleton of a logic file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOutline {
    pub imports: Vec<String>,
    pub classes: Vec<ClassOutline>,
}

/// Skeleton of a source file as persisted in the registry.
///
/// Atomic data-shape files store the fixed `"full"` marker; logic files store
/// a [`FileOutline`]. The untagged representation keeps the stored JSON either
/// a bare string or the outline object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Skeleton {
    Outline(FileOutline),
    Marker(String),
}

impl Skeleton {
    /// The skeleton for an atomic file.
    pub fn full() -> Self {
        Skeleton::Marker(FULL_MARKER.to_string())
    }

    pub fn is_full(&self) -> bool {
        matches!(self, Skeleton::Marker(m) if m == FULL_MARKER)
    }
}

impl fmt::Display for Skeleton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Skeleton::Marker(m) => write!(f, "{m}"),
            Skeleton::Outline(outline) => {
                if !outline.imports.is_empty() {
                    writeln!(f, "Imports:")?;
                    for import in &outline.imports {
                        writeln!(f, "  {import}")?;
                    }
                }
                for class in &outline.classes {
                    writeln!(f, "Class {}:", class.name)?;
                    for method in &class.methods {
                        writeln!(f, "  {method}")?;
                    }
                }
                Ok(())
            }
        }
    }
}
