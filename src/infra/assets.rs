//! Static file serving from the configured content directory.

use std::io::ErrorKind;
use std::path::{Component, Path as FsPath, PathBuf};

use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use mime_guess::{Mime, MimeGuess};
use tracing::error;

use crate::application::error::ErrorReport;

const SOURCE: &str = "infra::assets::StaticFiles";

/// Files under one directory, addressed by their relative path.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

struct Asset {
    contents: Bytes,
    mime: MimeGuess,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &FsPath {
        &self.root
    }

    /// Serve `path` relative to the root, or a 404 for anything missing or outside it.
    pub async fn serve(&self, path: &str) -> Response {
        let Some(relative) = sanitize(path) else {
            return rejected_response(StatusCode::NOT_FOUND);
        };

        match tokio::fs::read(self.root.join(&relative)).await {
            Ok(contents) => Asset {
                contents: Bytes::from(contents),
                mime: mime_guess::from_path(&relative),
            }
            .into_response(),
            Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::IsADirectory) => {
                not_found_response()
            }
            Err(err) => {
                error!(
                    target = SOURCE,
                    path = %relative.display(),
                    error = %err,
                    "failed to read static file"
                );
                let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
                ErrorReport::from_error(SOURCE, StatusCode::INTERNAL_SERVER_ERROR, &err)
                    .attach(&mut response);
                response
            }
        }
    }
}

/// Relative path made only of normal components; rejects traversal and directory requests.
fn sanitize(path: &str) -> Option<PathBuf> {
    let candidate = path.trim_start_matches('/');
    if candidate.is_empty() || candidate.ends_with('/') {
        return None;
    }

    let mut relative = PathBuf::new();
    for component in FsPath::new(candidate).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            _ => return None,
        }
    }
    Some(relative)
}

fn not_found_response() -> Response {
    let mut response = StatusCode::NOT_FOUND.into_response();
    ErrorReport::from_message(SOURCE, StatusCode::NOT_FOUND, "Static asset not found")
        .attach(&mut response);
    response
}

fn rejected_response(status: StatusCode) -> Response {
    let mut response = status.into_response();
    ErrorReport::from_message(SOURCE, status, "Static asset request rejected")
        .attach(&mut response);
    response
}

impl IntoResponse for Asset {
    fn into_response(self) -> Response {
        build_response(self.contents, self.mime.first_or_octet_stream())
    }
}

fn build_response(bytes: Bytes, mime: Mime) -> Response {
    let len = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
        headers.insert(header::CONTENT_LENGTH, value);
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=86400"),
    );

    response
}
