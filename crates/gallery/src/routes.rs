use axum::{
    Router,
    http::{HeaderValue, header},
    routing::get,
};
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::{AppState, MEDIA_PREFIX, absolute_dir};

/// Create gallery page routes
pub fn gallery_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Pages
        .route("/", get(handlers::index))
        .route("/category/{category}", get(handlers::category))
        .route("/item", get(handlers::item_missing))
        .route("/item/{*path}", get(handlers::item))
        // Front-end assets
        .route("/assets/zoom.js", get(handlers::zoom_script))
}

/// Build the full application: pages, static files and request tracing.
pub fn build_router(state: AppState) -> Router {
    let static_dir = absolute_dir(&state.config.server.static_dir);
    let mut router = gallery_routes().nest_service("/static", ServeDir::new(static_dir));

    if state.media.separate {
        router = router.nest_service(MEDIA_PREFIX, ServeDir::new(state.catalog.root()));
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                )),
        )
        .with_state(state)
}
