//! Image gallery server backed by a directory tree.
//!
//! Directories under the catalog root are categories, their subdirectories are
//! items, and the files inside an item are its images. This crate provides the
//! catalog resolver, the HTML views and the axum routes; the `gallery` binary
//! wires them to a listener.

pub mod catalog;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod safe_path;
pub mod views;

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::info;

pub use catalog::{CatalogResolver, ItemDetail};
pub use config::Config;
pub use error::GalleryError;
pub use views::{SiteGlobals, ViewRenderer};

/// URL prefix used when the catalog root is not inside the static directory.
pub const MEDIA_PREFIX: &str = "/media";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Catalog lookups
    pub catalog: CatalogResolver,
    /// HTML views
    pub views: Arc<ViewRenderer>,
    /// Configuration
    pub config: Arc<Config>,
    /// Where catalog files are served from
    pub media: MediaMount,
}

/// How raw catalog files reach the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaMount {
    /// URL prefix for `<category>/<item>/<file>`
    pub base_url: String,
    /// The catalog root needs its own file service at [`MEDIA_PREFIX`]
    pub separate: bool,
}

impl AppState {
    /// Build the state from a loaded configuration.
    pub fn new(config: Config) -> Result<Self, GalleryError> {
        let catalog = CatalogResolver::new(&config.catalog.root)
            .with_show_hidden(config.catalog.show_hidden);
        let media = media_mount(&config.server.static_dir, catalog.root());
        let globals = SiteGlobals {
            title: config.site.title.clone(),
            media_base: media.base_url.clone(),
        };

        let views = match &config.server.templates_dir {
            Some(dir) => {
                info!("Using templates from {}", dir.display());
                ViewRenderer::from_dir(dir, globals)
            }
            None => ViewRenderer::embedded(globals)?,
        };

        Ok(Self {
            catalog,
            views: Arc::new(views),
            config: Arc::new(config),
            media,
        })
    }
}

/// Work out the public URL of the catalog root.
///
/// When the root lives inside the static directory its files are already
/// reachable under `/static/<relative root>`.
pub fn media_mount(static_dir: &Path, catalog_root: &Path) -> MediaMount {
    let static_dir = static_dir
        .canonicalize()
        .unwrap_or_else(|_| static_dir.to_path_buf());
    let catalog_root = catalog_root
        .canonicalize()
        .unwrap_or_else(|_| catalog_root.to_path_buf());

    match catalog_root.strip_prefix(&static_dir) {
        Ok(relative) => {
            let mut base_url = String::from("/static");
            for part in url_components(relative) {
                base_url.push('/');
                base_url.push_str(&part);
            }
            MediaMount {
                base_url,
                separate: false,
            }
        }
        Err(_) => MediaMount {
            base_url: MEDIA_PREFIX.to_string(),
            separate: true,
        },
    }
}

fn url_components(relative: &Path) -> Vec<String> {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => {
                Some(urlencoding::encode(&part.to_string_lossy()).into_owned())
            }
            _ => None,
        })
        .collect()
}

/// Root directory for `ServeDir`, resolved against the working directory.
pub fn absolute_dir(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
