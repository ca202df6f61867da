//! Tree-sitter access layer for TypeScript sources.
//!
//! Wraps grammar setup and the node-walking helpers the chunker needs:
//! top-level class discovery (including classes wrapped in export statements,
//! where the grammar attaches decorators to the wrapper), class member
//! partitioning, and import statement extraction.

use tree_sitter::{Language, Node, Parser, Tree};

/// The TypeScript grammar (not TSX; the target framework is plain `.ts`).
pub fn language() -> Language {
    tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
}

/// Parse a source file. `None` means the grammar could not produce a tree.
pub fn parse(source: &str) -> Option<Tree> {
    let mut parser = Parser::new();
    parser.set_language(&language()).ok()?;
    parser.parse(source, None)
}

/// Raw text of a node.
pub fn text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    &source[node.byte_range()]
}

const CLASS_KINDS: [&str; 2] = ["class_declaration", "abstract_class_declaration"];

/// A top-level class together with every decorator attached to it, in source
/// order, whether the grammar hung them on the class node, the wrapping
/// export statement, or as preceding siblings.
pub struct ClassDecl<'t> {
    pub node: Node<'t>,
    pub decorators: Vec<Node<'t>>,
}

impl<'t> ClassDecl<'t> {
    pub fn name<'s>(&self, source: &'s str) -> Option<&'s str> {
        self.node.child_by_field_name("name").map(|n| text(n, source))
    }

    /// Start byte of the declaration including its decorators.
    pub fn start_byte(&self) -> usize {
        self.decorators
            .first()
            .map(|d| d.start_byte())
            .unwrap_or_else(|| self.node.start_byte())
    }

    /// Start row of the declaration including its decorators (0-based).
    pub fn start_row(&self) -> usize {
        self.decorators
            .first()
            .map(|d| d.start_position().row)
            .unwrap_or_else(|| self.node.start_position().row)
    }
}

/// All top-level class declarations of a file.
pub fn top_level_classes<'t>(root: Node<'t>) -> Vec<ClassDecl<'t>> {
    let mut classes = Vec::new();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if CLASS_KINDS.contains(&child.kind()) {
            classes.push(ClassDecl {
                decorators: decorators_around(child),
                node: child,
            });
        } else if child.kind() == "export_statement" {
            if let Some(decl) = exported_class(child) {
                let mut decorators = decorators_around(child);
                for d in decorators_around(decl) {
                    if !decorators.iter().any(|o| o.byte_range() == d.byte_range()) {
                        decorators.push(d);
                    }
                }
                decorators.sort_by_key(|d| d.start_byte());
                classes.push(ClassDecl {
                    node: decl,
                    decorators,
                });
            }
        }
    }
    classes
}

fn exported_class(export: Node<'_>) -> Option<Node<'_>> {
    if let Some(decl) = export.child_by_field_name("declaration") {
        if CLASS_KINDS.contains(&decl.kind()) {
            return Some(decl);
        }
    }
    let mut cursor = export.walk();
    let result = export
        .named_children(&mut cursor)
        .find(|c| CLASS_KINDS.contains(&c.kind()));
    result
}

/// Decorators attached to a node: direct `decorator` children plus the
/// contiguous run of preceding `decorator` siblings. Returned in source order.
pub fn decorators_around(node: Node<'_>) -> Vec<Node<'_>> {
    let mut decorators = Vec::new();

    let mut prev = node.prev_named_sibling();
    while let Some(p) = prev {
        if p.kind() != "decorator" {
            break;
        }
        decorators.push(p);
        prev = p.prev_named_sibling();
    }
    decorators.reverse();

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "decorator" {
            decorators.push(child);
        }
    }
    decorators
}

/// A method of a class, with its decorators.
pub struct MethodDecl<'t> {
    pub node: Node<'t>,
    pub decorators: Vec<Node<'t>>,
    pub name: String,
}

impl<'t> MethodDecl<'t> {
    /// Byte range covering the decorators and the method body.
    pub fn full_range(&self) -> std::ops::Range<usize> {
        let start = self
            .decorators
            .first()
            .map(|d| d.start_byte())
            .unwrap_or_else(|| self.node.start_byte());
        start..self.node.end_byte()
    }

    pub fn start_row(&self) -> usize {
        self.decorators
            .first()
            .map(|d| d.start_position().row)
            .unwrap_or_else(|| self.node.start_position().row)
    }
}

/// The members of a class body split the way the chunker consumes them.
pub struct ClassMembers<'t> {
    pub properties: Vec<Node<'t>>,
    pub constructor: Option<Node<'t>>,
    pub methods: Vec<MethodDecl<'t>>,
}

pub fn class_members<'t>(class: Node<'t>, source: &str) -> ClassMembers<'t> {
    let mut members = ClassMembers {
        properties: Vec::new(),
        constructor: None,
        methods: Vec::new(),
    };
    let Some(body) = class.child_by_field_name("body") else {
        return members;
    };

    let mut cursor = body.walk();
    for child in body.named_children(&mut cursor) {
        match child.kind() {
            "method_definition" => {
                let name = child
                    .child_by_field_name("name")
                    .map(|n| text(n, source).to_string())
                    .unwrap_or_default();
                if name == "constructor" {
                    if members.constructor.is_none() {
                        members.constructor = Some(child);
                    }
                } else {
                    members.methods.push(MethodDecl {
                        decorators: decorators_around(child),
                        node: child,
                        name,
                    });
                }
            }
            "public_field_definition" => members.properties.push(child),
            _ => {}
        }
    }
    members
}

/// `name(param-text): return-type-text;` for a method node, cut at the body.
pub fn method_signature(method: &MethodDecl<'_>, source: &str) -> String {
    let params = method
        .node
        .child_by_field_name("parameters")
        .map(|n| text(n, source))
        .unwrap_or("()");
    let return_type = method
        .node
        .child_by_field_name("return_type")
        .map(|n| text(n, source).trim_start_matches(':').trim())
        .unwrap_or("void");
    format!("{}{}: {};", method.name, params, return_type)
}

/// All top-level import statements of the file.
pub fn import_statements<'t>(root: Node<'t>) -> Vec<Node<'t>> {
    let mut imports = Vec::new();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if child.kind() == "import_statement" {
            imports.push(child);
        }
    }
    imports
}

/// Module specifier of an import statement, without quotes.
pub fn import_specifier<'s>(import: Node<'_>, source: &'s str) -> Option<&'s str> {
    let node = import.child_by_field_name("source")?;
    Some(text(node, source).trim_matches(|c| c == '\'' || c == '"'))
}

/// `@Name(...)` → `Name`.
pub fn decorator_name(decorator: Node<'_>, source: &str) -> String {
    let raw = text(decorator, source).trim_start_matches('@');
    raw.split(|c: char| c == '(' || c.is_whitespace())
        .next()
        .unwrap_or(raw)
        .to_string()
}

/// Name of the first class declared anywhere in the file, if any.
pub fn first_class_name(root: Node<'_>, source: &str) -> Option<String> {
    if CLASS_KINDS.contains(&root.kind()) {
        if let Some(name) = root.child_by_field_name("name") {
            return Some(text(name, source).to_string());
        }
    }
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if let Some(name) = first_class_name(child, source) {
            return Some(name);
        }
    }
    None
}
