//! Test utilities and common setup.

use std::fs;
use std::path::Path;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
};
use gallery::{AppState, Config, routes};
use tempfile::TempDir;
use tower::ServiceExt;

/// Build the classic layout:
///
/// ```text
/// static/style.css
/// static/images/cats/tom/{description.txt, a.jpg, thumbnail.jpg}
/// static/images/dogs/rex/b.png
/// static/images/notes.txt
/// ```
pub fn fixture_tree(base: &Path) {
    let images = base.join("static").join("images");
    let tom = images.join("cats").join("tom");
    let rex = images.join("dogs").join("rex");
    fs::create_dir_all(&tom).unwrap();
    fs::create_dir_all(&rex).unwrap();

    fs::write(base.join("static").join("style.css"), "body {}").unwrap();
    fs::write(images.join("notes.txt"), "not a category").unwrap();
    fs::write(tom.join("description.txt"), "A cat.").unwrap();
    fs::write(tom.join("a.jpg"), "jpeg-bytes").unwrap();
    fs::write(tom.join("thumbnail.jpg"), "thumb").unwrap();
    fs::write(rex.join("b.png"), "png-bytes").unwrap();
}

/// Config pointing at the fixture tree inside `base`.
pub fn fixture_config(base: &Path) -> Config {
    let mut config = Config::default();
    config.server.static_dir = base.join("static");
    config.catalog.root = base.join("static").join("images");
    config.site.title = "Test Gallery".to_string();
    config
}

/// Create a test application over a fresh fixture tree.
pub fn test_app() -> (TempDir, Router) {
    test_app_with(|_, _| {})
}

/// Create a test application, letting the caller adjust tree and config.
pub fn test_app_with(customize: impl FnOnce(&Path, &mut Config)) -> (TempDir, Router) {
    let temp = TempDir::new().unwrap();
    fixture_tree(temp.path());

    let mut config = fixture_config(temp.path());
    customize(temp.path(), &mut config);

    let state = AppState::new(config).unwrap();
    (temp, routes::build_router(state))
}

/// Issue a GET request and return status, headers and body text.
pub async fn get(app: Router, uri: &str) -> (StatusCode, HeaderMap, String) {
    let response = app
        .oneshot(
            Request::builder()
                .uri(uri)
                .method(Method::GET)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();

    (status, headers, String::from_utf8_lossy(&body).into_owned())
}
