//! Read-only view of the catalog directory tree.
//!
//! The tree has two levels: `root/<category>/<item>/<files>`. Every call reads
//! the filesystem afresh; nothing is cached between requests.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::GalleryError;
use crate::safe_path::{resolve_within_root, resolves_within};

/// Reserved for thumbnails, never listed as an image.
pub const THUMBNAIL_FILE: &str = "thumbnail.jpg";
/// Free-text description of an item, never listed as an image.
pub const DESCRIPTION_FILE: &str = "description.txt";
/// Returned when an item has no readable description.
pub const DEFAULT_DESCRIPTION: &str = "No description available.";

/// Everything needed to render a single item page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemDetail {
    pub category: String,
    pub item: String,
    pub description: String,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Directory,
    File,
}

/// Resolves category and item names against a fixed catalog root.
///
/// Holds no mutable state; clones share the root and can be used from any
/// number of threads at once.
#[derive(Debug, Clone)]
pub struct CatalogResolver {
    root: Arc<PathBuf>,
    show_hidden: bool,
}

impl CatalogResolver {
    /// Create a resolver for `root`.
    ///
    /// The root is canonicalized when possible so later containment checks
    /// compare like with like.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = root.canonicalize().unwrap_or(root);
        Self {
            root: Arc::new(root),
            show_hidden: false,
        }
    }

    /// Include dot-prefixed entries in listings and lookups.
    pub fn with_show_hidden(mut self, show_hidden: bool) -> Self {
        self.show_hidden = show_hidden;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List category names: the directories directly under the root.
    pub fn list_categories(&self) -> Result<Vec<String>, GalleryError> {
        self.list_entries(&self.root, "catalog", EntryKind::Directory)
    }

    /// List item names: the directories directly under `root/<category>`.
    pub fn list_items(&self, category: &str) -> Result<Vec<String>, GalleryError> {
        self.check_visible(category)?;
        let path = resolve_within_root(&self.root, &[category])?;
        self.list_entries(&path, category, EntryKind::Directory)
    }

    /// Load the image list and description of `root/<category>/<item>`.
    pub fn get_item(&self, category: &str, item: &str) -> Result<ItemDetail, GalleryError> {
        self.check_visible(category)?;
        self.check_visible(item)?;
        let path = resolve_within_root(&self.root, &[category, item])?;
        let target = format!("{category}/{item}");

        let images = self
            .list_entries(&path, &target, EntryKind::File)?
            .into_iter()
            .filter(|name| name != THUMBNAIL_FILE && name != DESCRIPTION_FILE)
            .collect();

        Ok(ItemDetail {
            category: category.to_string(),
            item: item.to_string(),
            description: self.read_description(&path, &target),
            images,
        })
    }

    fn check_visible(&self, name: &str) -> Result<(), GalleryError> {
        if !self.show_hidden && name.starts_with('.') {
            debug!("Rejecting hidden catalog entry {:?}", name);
            return Err(GalleryError::InvalidPath(name.to_string()));
        }
        Ok(())
    }

    /// Names of the entries of `dir` matching `kind`, sorted by name.
    fn list_entries(
        &self,
        dir: &Path,
        target: &str,
        kind: EntryKind,
    ) -> Result<Vec<String>, GalleryError> {
        let entries = fs::read_dir(dir).map_err(|err| GalleryError::storage(target, err))?;
        let mut names = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|err| GalleryError::storage(target, err))?;

            let Ok(name) = entry.file_name().into_string() else {
                debug!("Skipping non UTF-8 entry in {}: {:?}", target, entry.file_name());
                continue;
            };

            if !self.show_hidden && name.starts_with('.') {
                continue;
            }

            // Follows symlinks, so a linked directory counts as a directory.
            let metadata = match fs::metadata(entry.path()) {
                Ok(metadata) => metadata,
                Err(err) => {
                    debug!("Skipping unreadable entry {}/{}: {}", target, name, err);
                    continue;
                }
            };

            if !resolves_within(&self.root, &entry.path()) {
                debug!("Skipping {}/{}: resolves outside the catalog root", target, name);
                continue;
            }

            let matches = match kind {
                EntryKind::Directory => metadata.is_dir(),
                EntryKind::File => metadata.is_file(),
            };
            if matches {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    fn read_description(&self, item_dir: &Path, target: &str) -> String {
        let path = item_dir.join(DESCRIPTION_FILE);
        if path.exists() && !resolves_within(&self.root, &path) {
            warn!(
                "Ignoring {} for {}: resolves outside the catalog root",
                DESCRIPTION_FILE, target
            );
            return DEFAULT_DESCRIPTION.to_string();
        }

        match fs::read_to_string(&path) {
            Ok(description) => description,
            Err(err) => {
                warn!(
                    "Unable to read {} for {}: {}",
                    DESCRIPTION_FILE, target, err
                );
                DEFAULT_DESCRIPTION.to_string()
            }
        }
    }
}
