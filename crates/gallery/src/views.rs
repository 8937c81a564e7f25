//! HTML rendering of catalog data with minijinja.
//!
//! The three views are compiled into the binary. When a templates directory is
//! configured, `<dir>/<view>.html` is loaded from disk on every render instead,
//! so edits show up without a restart.

use std::path::PathBuf;

use minijinja::{Environment, UndefinedBehavior, Value};
use serde::Serialize;
use tracing::debug;

use crate::error::GalleryError;

pub const INDEX_VIEW: &str = "index";
pub const CATEGORY_VIEW: &str = "category";
pub const ITEM_VIEW: &str = "item";

/// Client-side hover zoom used by the item view.
pub const ZOOM_SCRIPT: &str = include_str!("../assets/zoom.js");

const EMBEDDED_TEMPLATES: &[(&str, &str)] = &[
    ("layout.html", include_str!("../templates/layout.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("category.html", include_str!("../templates/category.html")),
    ("item.html", include_str!("../templates/item.html")),
];

/// Values available to every template.
#[derive(Debug, Clone, Serialize)]
pub struct SiteGlobals {
    /// Page title
    pub title: String,
    /// URL prefix under which the catalog root is served
    pub media_base: String,
}

/// Data for the index view.
#[derive(Debug, Serialize)]
pub struct IndexView<'a> {
    pub categories: &'a [String],
}

/// Data for the category view.
#[derive(Debug, Serialize)]
pub struct CategoryView<'a> {
    pub category: &'a str,
    pub items: &'a [String],
}

enum TemplateSource {
    Embedded(Environment<'static>),
    Directory(PathBuf),
}

/// Renders named views to HTML.
pub struct ViewRenderer {
    source: TemplateSource,
    globals: SiteGlobals,
}

impl ViewRenderer {
    /// Renderer backed by the built-in templates.
    pub fn embedded(globals: SiteGlobals) -> Result<Self, GalleryError> {
        let mut env = base_environment(&globals);
        for &(name, source) in EMBEDDED_TEMPLATES {
            env.add_template(name, source)
                .map_err(|err| GalleryError::TemplateFailure {
                    view: name.to_string(),
                    source: err,
                })?;
        }

        Ok(Self {
            source: TemplateSource::Embedded(env),
            globals,
        })
    }

    /// Renderer that reads templates from `dir` on every call.
    pub fn from_dir(dir: impl Into<PathBuf>, globals: SiteGlobals) -> Self {
        Self {
            source: TemplateSource::Directory(dir.into()),
            globals,
        }
    }

    pub fn globals(&self) -> &SiteGlobals {
        &self.globals
    }

    /// Render `view` (without extension) with `data` as the template context.
    pub fn render<S: Serialize>(&self, view: &str, data: S) -> Result<String, GalleryError> {
        let name = format!("{view}.html");
        let failure = |source| GalleryError::TemplateFailure {
            view: name.clone(),
            source,
        };

        match &self.source {
            TemplateSource::Embedded(env) => {
                let template = env.get_template(&name).map_err(failure)?;
                template.render(data).map_err(failure)
            }
            TemplateSource::Directory(dir) => {
                debug!("Loading template {} from {}", name, dir.display());
                let mut env = base_environment(&self.globals);
                env.set_loader(minijinja::path_loader(dir));
                let template = env.get_template(&name).map_err(failure)?;
                template.render(data).map_err(failure)
            }
        }
    }
}

fn base_environment(globals: &SiteGlobals) -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.add_global("title", globals.title.clone());
    // Built from path components at startup, not from request data.
    env.add_global(
        "media_base",
        Value::from_safe_string(globals.media_base.clone()),
    );
    env
}
