//! Path normalization, root containment and import resolution.
//!
//! Every path persisted by the store is project-root-relative in
//! forward-slash form. Callers may hand in native-separator paths; lookups
//! normalize first. Paths that escape the project root are refused.

use anyhow::{bail, Context, Result};
use std::path::{Component, Path, PathBuf};

/// OS-native separators → forward slashes.
pub fn to_forward_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

/// Canonical store form of a root-relative path.
pub fn normalize_relative(path: &str) -> String {
    let forward = to_forward_slashes(path);
    forward.trim_start_matches("./").to_string()
}

/// Lexically resolve `path` against `root`, refusing anything that escapes
/// the root. Returns the cleaned absolute path.
pub fn resolve_within_root(root: &Path, path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };
    let cleaned = lexical_clean(&joined)
        .with_context(|| format!("path {} escapes the project root", path.display()))?;
    let root_cleaned = lexical_clean(root)
        .with_context(|| format!("invalid project root {}", root.display()))?;
    if !cleaned.starts_with(&root_cleaned) {
        bail!("path {} escapes the project root", path.display());
    }
    Ok(cleaned)
}

/// Root-relative forward-slash form of an absolute path under `root`.
pub fn relative_to_root(root: &Path, absolute: &Path) -> Result<String> {
    let relative = absolute
        .strip_prefix(root)
        .with_context(|| format!("{} is not under the project root", absolute.display()))?;
    Ok(to_forward_slashes(&relative.to_string_lossy()))
}

/// Resolve a relative import specifier against the importing file.
///
/// Resolution policy, in order: the specifier as a file, the specifier with
/// the source extension appended, the barrel form `<specifier>/index.<ext>`.
/// Non-relative specifiers and failed resolutions yield `None`.
pub fn resolve_import(
    root: &Path,
    importer_relative: &str,
    specifier: &str,
    extension: &str,
) -> Option<String> {
    if !specifier.starts_with('.') {
        return None;
    }
    let importer_dir = Path::new(importer_relative)
        .parent()
        .unwrap_or_else(|| Path::new(""));
    let base = resolve_within_root(root, &importer_dir.join(specifier)).ok()?;

    let candidates = [
        base.clone(),
        PathBuf::from(format!("{}.{extension}", base.display())),
        base.join(format!("index.{extension}")),
    ];
    for candidate in &candidates {
        if candidate.is_file() {
            return relative_to_root(root, candidate).ok();
        }
    }
    None
}

/// Remove `.` and `..` components without touching the filesystem. Errors if
/// `..` would climb past the start of the path.
fn lexical_clean(path: &Path) -> Result<PathBuf> {
    let mut cleaned = PathBuf::new();
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => cleaned.push(component),
            Component::CurDir => {}
            Component::Normal(part) => {
                cleaned.push(part);
                depth += 1;
            }
            Component::ParentDir => {
                if depth == 0 {
                    bail!("path escapes its base");
                }
                cleaned.pop();
                depth -= 1;
            }
        }
    }
    Ok(cleaned)
}
