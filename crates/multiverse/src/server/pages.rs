use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::Response;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::server::error::PageError;
use crate::server::ServerState;

/// Clean routes served from `pages/<route>.html`.
pub const PAGE_ROUTES: [&str; 6] = [
    "characters",
    "locations",
    "episodes",
    "character-detail",
    "episode-detail",
    "location-detail",
];

pub(crate) async fn serve_page(state: &ServerState, page: &str) -> Result<Response<Body>, PageError> {
    let relative = Path::new("pages").join(format!("{page}.html"));
    let resolved = resolve_within(&state.static_root, &relative).map_err(|error| {
        if error.status() == StatusCode::NOT_FOUND {
            PageError::not_found(format!("page not found: {page}"))
        } else {
            error
        }
    })?;
    tracing::debug!(page, path = %resolved.display(), "serving page");
    serve_file(&resolved).await
}

/// Fallback for every path without a route: a file under the static root,
/// or the directory's `index.html`.
pub(crate) async fn serve_static(
    State(state): State<Arc<ServerState>>,
    uri: Uri,
) -> Result<Response<Body>, PageError> {
    let decoded = urlencoding::decode(uri.path())
        .map_err(|_| PageError::not_found("file not found"))?;
    let relative = decoded.trim_start_matches('/');
    let mut resolved = resolve_within(&state.static_root, Path::new(relative))?;
    if resolved.is_dir() {
        resolved = resolve_within(&resolved, Path::new("index.html"))?;
    }
    serve_file(&resolved).await
}

/// Resolves `relative` against `root`, refusing anything that ends up
/// outside of it. `root` must already be canonical.
pub(crate) fn resolve_within(root: &Path, relative: &Path) -> Result<PathBuf, PageError> {
    let resolved = root
        .join(relative)
        .canonicalize()
        .map_err(|_| PageError::not_found("file not found"))?;

    if !resolved.starts_with(root) {
        tracing::warn!(path = %relative.display(), "refused path outside static root");
        return Err(PageError::forbidden("path traversal denied"));
    }
    Ok(resolved)
}

async fn serve_file(path: &Path) -> Result<Response<Body>, PageError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|_| PageError::not_found("file not found"))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type(path))
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from(bytes))
        .map_err(|e| PageError::internal(e.to_string()))
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "html" | "htm" => "text/html; charset=utf-8",
        "js" | "mjs" => "application/javascript",
        "css" => "text/css",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "woff2" => "font/woff2",
        "woff" => "font/woff",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn resolve_within_refuses_parent_escape() {
        let dir = tempdir().expect("tempdir");
        let root = dir.path().join("site");
        std::fs::create_dir_all(&root).expect("root");
        std::fs::write(dir.path().join("secret.txt"), "nope").expect("secret");
        std::fs::write(root.join("index.html"), "<h1>home</h1>").expect("index");
        let root = root.canonicalize().expect("canonical");

        let error = resolve_within(&root, Path::new("../secret.txt")).expect_err("escape");
        assert_eq!(error.status(), StatusCode::FORBIDDEN);

        let inside = resolve_within(&root, Path::new("./index.html")).expect("inside");
        assert!(inside.starts_with(&root));

        let missing = resolve_within(&root, Path::new("absent.html")).expect_err("missing");
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(content_type(Path::new("pages/characters.html")), "text/html; charset=utf-8");
        assert_eq!(content_type(Path::new("js/app.mjs")), "application/javascript");
        assert_eq!(content_type(Path::new("LICENSE")), "application/octet-stream");
    }
}
