use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Unable to read {target} directory")]
    StorageUnavailable {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Template error in {view}: {source}")]
    TemplateFailure {
        view: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GalleryError {
    pub(crate) fn storage(target: impl Into<String>, source: std::io::Error) -> Self {
        GalleryError::StorageUnavailable {
            target: target.into(),
            source,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GalleryError::InvalidPath(_) | GalleryError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            GalleryError::StorageUnavailable { .. }
            | GalleryError::TemplateFailure { .. }
            | GalleryError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GalleryError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(error = ?self, "request failed: {}", self);
        } else {
            warn!("request rejected: {}", self);
        }

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}
