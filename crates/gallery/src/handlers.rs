use axum::{
    Json,
    extract::{Path, State},
    http::header,
    response::{Html, IntoResponse},
};
use serde::Serialize;
use tracing::debug;

use crate::AppState;
use crate::error::GalleryError;
use crate::views::{CATEGORY_VIEW, CategoryView, INDEX_VIEW, ITEM_VIEW, IndexView, ZOOM_SCRIPT};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// URL prefix the catalog files are served under
    pub media: String,
}

// ============================================================================
// Helper functions
// ============================================================================

/// Run directory reads and template loading off the async executor.
async fn run_blocking<T, F>(work: F) -> Result<T, GalleryError>
where
    F: FnOnce() -> Result<T, GalleryError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| GalleryError::Internal(err.to_string()))?
}

/// Split the tail of `/item/<category>/<item>` into its two names.
///
/// Segments after the item are ignored.
fn parse_item_path(path: &str) -> Result<(String, String), GalleryError> {
    let mut parts = path.trim_start_matches('/').split('/');
    match (parts.next(), parts.next()) {
        (Some(category), Some(item)) if !category.is_empty() && !item.is_empty() => {
            Ok((category.to_string(), item.to_string()))
        }
        _ => Err(GalleryError::InvalidRequest("Invalid path".to_string())),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        media: state.media.base_url.clone(),
    })
}

/// GET / - Category index
pub async fn index(State(state): State<AppState>) -> Result<Html<String>, GalleryError> {
    let html = run_blocking(move || {
        let categories = state.catalog.list_categories()?;
        debug!("Rendering index with {} categories", categories.len());
        state.views.render(
            INDEX_VIEW,
            IndexView {
                categories: &categories,
            },
        )
    })
    .await?;

    Ok(Html(html))
}

/// GET /category/{category} - Items of one category
pub async fn category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Html<String>, GalleryError> {
    let html = run_blocking(move || {
        let items = state.catalog.list_items(&category)?;
        debug!("Rendering category {} with {} items", category, items.len());
        state.views.render(
            CATEGORY_VIEW,
            CategoryView {
                category: &category,
                items: &items,
            },
        )
    })
    .await?;

    Ok(Html(html))
}

/// GET /item/{category}/{item} - Images and description of one item
pub async fn item(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Html<String>, GalleryError> {
    let (category, item) = parse_item_path(&path)?;

    let html = run_blocking(move || {
        let detail = state.catalog.get_item(&category, &item)?;
        debug!(
            "Rendering item {}/{} with {} images",
            category,
            item,
            detail.images.len()
        );
        state.views.render(ITEM_VIEW, &detail)
    })
    .await?;

    Ok(Html(html))
}

/// GET /item - No category or item given
pub async fn item_missing() -> GalleryError {
    GalleryError::InvalidRequest("Invalid path".to_string())
}

/// GET /assets/zoom.js - Hover zoom script for item pages
pub async fn zoom_script() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        ZOOM_SCRIPT,
    )
}
