//! Mapping of URL segments onto paths below the catalog root.
//!
//! Every lookup goes through [`resolve_within_root`] before the filesystem is
//! touched. Segments are validated one by one, the joined path is normalized
//! lexically and must stay strictly below the root. Once the path is known to
//! exist it is canonicalized again so a symlink cannot point outside the tree.

use std::path::{Component, Path, PathBuf};

use tracing::warn;

use crate::error::GalleryError;

/// Validate a single user-supplied name (category or item).
///
/// A valid name is exactly one normal path component: no separators, no `.`
/// or `..`, no root or drive prefix and no NUL bytes.
pub fn validate_segment(name: &str) -> Result<&str, GalleryError> {
    if name.is_empty() {
        return Err(GalleryError::InvalidPath(String::from("(empty)")));
    }

    if name.contains('\0') {
        warn!("Path segment contains null byte: {:?}", name);
        return Err(GalleryError::InvalidPath(name.escape_debug().to_string()));
    }

    if name.contains('/') || name.contains('\\') {
        warn!("Path traversal attempt detected: separator in segment {:?}", name);
        return Err(GalleryError::InvalidPath(name.to_string()));
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == name => Ok(name),
        (Some(Component::ParentDir), _) => {
            warn!("Path traversal attempt detected: parent directory (..) in segment");
            Err(GalleryError::InvalidPath(name.to_string()))
        }
        (Some(Component::RootDir | Component::Prefix(_)), _) => {
            warn!("Absolute path component in segment {:?}", name);
            Err(GalleryError::InvalidPath(name.to_string()))
        }
        _ => Err(GalleryError::InvalidPath(name.to_string())),
    }
}

/// Resolve `.`/`..` and redundant separators without consulting the filesystem.
///
/// `..` never climbs above a root or prefix component.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    parts.iter().collect()
}

/// Join `segments` onto `root` and verify the result stays below `root`.
///
/// The returned path is canonical when it exists on disk, otherwise it is the
/// lexically normalized join.
pub fn resolve_within_root(root: &Path, segments: &[&str]) -> Result<PathBuf, GalleryError> {
    for segment in segments {
        validate_segment(segment)?;
    }

    let normalized_root = normalize_lexically(root);
    let mut joined = normalized_root.clone();
    for segment in segments {
        joined.push(segment);
    }
    let normalized = normalize_lexically(&joined);

    if normalized == normalized_root || !normalized.starts_with(&normalized_root) {
        warn!(
            "Path resolution resulted in path outside root: {:?}",
            normalized
        );
        return Err(GalleryError::InvalidPath(segments.join("/")));
    }

    verify_existing(root, normalized, segments)
}

/// Canonicalize an existing path and re-check it against the canonical root.
fn verify_existing(
    root: &Path,
    path: PathBuf,
    segments: &[&str],
) -> Result<PathBuf, GalleryError> {
    if !path.exists() {
        return Ok(path);
    }

    let canonical_root = root
        .canonicalize()
        .map_err(|err| GalleryError::storage("catalog", err))?;
    let canonical_path = path
        .canonicalize()
        .map_err(|err| GalleryError::storage(segments.join("/"), err))?;

    if !is_strict_descendant(&canonical_root, &canonical_path) {
        warn!(
            "Symlink escape attempt: {:?} resolved to {:?} which is outside {:?}",
            path, canonical_path, canonical_root
        );
        return Err(GalleryError::InvalidPath(segments.join("/")));
    }

    Ok(canonical_path)
}

/// Whether the existing `path` resolves strictly below `canonical_root`.
///
/// Symlinks are followed. A path that cannot be canonicalized is treated as
/// outside the root.
pub fn resolves_within(canonical_root: &Path, path: &Path) -> bool {
    match path.canonicalize() {
        Ok(canonical_path) => is_strict_descendant(canonical_root, &canonical_path),
        Err(_) => false,
    }
}

fn is_strict_descendant(root: &Path, path: &Path) -> bool {
    path.starts_with(root) && path != root
}
